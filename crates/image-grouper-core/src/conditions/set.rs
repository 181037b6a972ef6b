use super::{
    CameraCriterion, Condition, ConditionModule, HashCriterion, ShapeCriterion, TimeCriterion,
};

/// The five condition modules, all inactive with default parameters
pub struct ConditionSet {
    pub gradients: ConditionModule<HashCriterion>,
    pub color: ConditionModule<HashCriterion>,
    pub time: ConditionModule<TimeCriterion>,
    pub camera: ConditionModule<CameraCriterion>,
    pub shape: ConditionModule<ShapeCriterion>,
}

impl Default for ConditionSet {
    fn default() -> Self {
        Self {
            gradients: ConditionModule::new(HashCriterion::gradients()),
            color: ConditionModule::new(HashCriterion::color()),
            time: ConditionModule::new(TimeCriterion::default()),
            camera: ConditionModule::new(CameraCriterion::default()),
            shape: ConditionModule::new(ShapeCriterion::default()),
        }
    }
}

impl ConditionSet {
    /// Machine names in evaluation order
    pub const NAMES: [&'static str; 5] = [
        "gradients",
        "colordistance",
        "closeintime",
        "cameramodel",
        "pictureshape",
    ];

    pub fn iter(&self) -> impl Iterator<Item = &dyn Condition> + '_ {
        [
            &self.gradients as &dyn Condition,
            &self.color,
            &self.time,
            &self.camera,
            &self.shape,
        ]
        .into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn Condition> + '_ {
        [
            &mut self.gradients as &mut dyn Condition,
            &mut self.color,
            &mut self.time,
            &mut self.camera,
            &mut self.shape,
        ]
        .into_iter()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Condition> {
        self.iter().find(|condition| condition.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut dyn Condition> {
        self.iter_mut().find(|condition| condition.name() == name)
    }

    pub fn any_active(&self) -> bool {
        self.iter().any(|condition| condition.is_active())
    }
}
