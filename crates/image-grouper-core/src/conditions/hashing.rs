use std::ops::RangeInclusive;

use super::{Criterion, Judgement};
use crate::attributes::AttributeProvider;
use crate::error::{Error, Result};
use crate::processing::HashMethod;
use crate::types::Identity;

/// Accepted values for a hash distance limit
pub const LIMIT_RANGE: RangeInclusive<u32> = 1..=50;

/// Which hash methods a hash condition may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashFamily {
    /// Gradient (dHash) bit hashes
    Gradients,
    /// Colour median/spread vectors
    Color,
}

impl HashFamily {
    pub fn methods(self) -> &'static [HashMethod] {
        match self {
            HashFamily::Gradients => &[HashMethod::Horizontal, HashMethod::Vertical],
            HashFamily::Color => &[
                HashMethod::Hsv,
                HashMethod::Hsv5,
                HashMethod::Rgb,
                HashMethod::Rgb5,
                HashMethod::Luminosity,
                HashMethod::Luminosity5,
            ],
        }
    }

    fn condition_name(self) -> &'static str {
        match self {
            HashFamily::Gradients => "gradients",
            HashFamily::Color => "colordistance",
        }
    }
}

/// Distance between two perceptual hashes at most `limit`
#[derive(Debug, Clone)]
pub struct HashCriterion {
    family: HashFamily,
    method: HashMethod,
    limit: u32,
}

impl HashCriterion {
    /// Horizontal gradients, limit 14
    pub fn gradients() -> Self {
        Self {
            family: HashFamily::Gradients,
            method: HashMethod::Horizontal,
            limit: 14,
        }
    }

    /// HSV over five regions, limit 10
    pub fn color() -> Self {
        Self {
            family: HashFamily::Color,
            method: HashMethod::Hsv5,
            limit: 10,
        }
    }

    pub fn family(&self) -> HashFamily {
        self.family
    }

    pub fn method(&self) -> HashMethod {
        self.method
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn set_method(&mut self, method: HashMethod) -> Result<()> {
        if !self.family.methods().contains(&method) {
            return Err(Error::InvalidParameter {
                condition: self.family.condition_name(),
                reason: format!("method '{}' is not available here", method),
            });
        }
        self.method = method;
        Ok(())
    }

    pub fn set_method_by_name(&mut self, name: &str) -> Result<()> {
        let method = name.parse::<HashMethod>().map_err(|reason| Error::InvalidParameter {
            condition: self.family.condition_name(),
            reason,
        })?;
        self.set_method(method)
    }

    pub fn set_limit(&mut self, limit: u32) -> Result<()> {
        if !LIMIT_RANGE.contains(&limit) {
            return Err(Error::InvalidParameter {
                condition: self.family.condition_name(),
                reason: format!(
                    "limit {} outside {}..={}",
                    limit,
                    LIMIT_RANGE.start(),
                    LIMIT_RANGE.end()
                ),
            });
        }
        self.limit = limit;
        Ok(())
    }
}

impl Criterion for HashCriterion {
    type Params = (HashMethod, u32);

    fn name(&self) -> &'static str {
        self.family.condition_name()
    }

    fn label(&self) -> String {
        format!("{} ({}, limit {})", self.name(), self.method, self.limit)
    }

    fn params(&self) -> Self::Params {
        (self.method, self.limit)
    }

    fn prepare(&self, provider: &mut AttributeProvider) -> Result<()> {
        provider.ensure_hashes(self.method);
        Ok(())
    }

    fn judge(&self, provider: &AttributeProvider, a: &Identity, b: &Identity) -> Judgement {
        match (
            provider.hash_value(a, self.method),
            provider.hash_value(b, self.method),
        ) {
            (Some(hash_a), Some(hash_b)) => {
                Judgement::within(self.method.distance(hash_a, hash_b), self.limit as f64)
            }
            _ => Judgement::no_match(),
        }
    }
}
