mod common;

use common::{flat, ramp, save, test_config};
use image_grouper_core::conditions::{Condition, ShapeTolerance, TimeWindow};
use image_grouper_core::{Error, FinalGroups, Grouping, Identity, ImageGrouper};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn groups(grouping: Grouping) -> FinalGroups {
    match grouping {
        Grouping::Groups(groups) => groups,
        Grouping::Unfiltered(_) => panic!("expected grouped output"),
    }
}

fn identity_of(grouper: &ImageGrouper, path: &Path) -> Identity {
    grouper
        .active_identities()
        .into_iter()
        .find(|id| grouper.paths(id).iter().any(|p| p == path))
        .unwrap()
}

fn loaded(dir: &Path) -> ImageGrouper {
    let mut grouper = ImageGrouper::new(test_config()).unwrap();
    grouper.load(&[dir]).unwrap();
    grouper
}

#[test]
fn test_unfiltered_listing_when_no_condition_is_active() {
    let dir = tempdir().unwrap();
    let b = save(dir.path(), "b.png", &ramp(64, 48, false));
    let a = save(dir.path(), "a.png", &flat(32, 32, [10, 200, 30]));
    std::fs::write(dir.path().join("notes.txt"), b"not an image").unwrap();

    let mut grouper = ImageGrouper::new(test_config()).unwrap();
    let report = grouper.load(&[dir.path()]).unwrap();
    assert_eq!(report.files, 3);
    assert_eq!(report.images, 2);
    assert_eq!(report.skipped, 1);

    match grouper.recompute().unwrap() {
        Grouping::Unfiltered(ids) => {
            assert_eq!(ids.len(), 2);
            assert_eq!(grouper.paths(&ids[0]), vec![a]);
            assert_eq!(grouper.paths(&ids[1]), vec![b]);
        }
        Grouping::Groups(_) => panic!("no condition is active"),
    }
}

#[test]
fn test_exact_copies_share_identity() {
    let dir = tempdir().unwrap();
    let image = ramp(64, 48, false);
    let a = save(dir.path(), "a.png", &image);
    let b = save(dir.path(), "b.png", &image);

    save(dir.path(), "c.png", &ramp(64, 48, true));
    let mut grouper = ImageGrouper::new(test_config()).unwrap();
    let report = grouper.load(&[dir.path()]).unwrap();
    assert_eq!(report.images, 3);
    assert_eq!(report.duplicates, 1);

    grouper.hide(&identity_of(&grouper, &dir.path().join("c.png"))).unwrap();
    let active = grouper.active_identities();
    assert_eq!(active.len(), 1);
    let id = active.into_iter().next().unwrap();
    assert_eq!(grouper.paths(&id), vec![a, b]);
}

#[test]
fn test_gradients_group_resized_copies() {
    let dir = tempdir().unwrap();
    let small = save(dir.path(), "small.png", &ramp(64, 48, false));
    let large = save(dir.path(), "large.png", &ramp(128, 96, false));
    save(dir.path(), "reversed.png", &ramp(64, 48, true));

    let mut grouper = loaded(dir.path());
    grouper.conditions_mut().gradients.set_active(true);
    let result = groups(grouper.recompute().unwrap());

    assert_eq!(grouper.group_paths(&result), vec![vec![large, small]]);
    let summary = grouper.conditions().gradients.summary().unwrap();
    assert_eq!(summary.pairs, 3);
    assert_eq!(summary.minimum, 0.0);
}

#[test]
fn test_must_match_shape_narrows_groups() {
    let dir = tempdir().unwrap();
    let landscape = save(dir.path(), "landscape.png", &ramp(64, 48, false));
    let landscape_big = save(dir.path(), "landscape_big.png", &ramp(128, 96, false));
    let portrait = save(dir.path(), "portrait.png", &ramp(48, 64, false));

    let mut grouper = loaded(dir.path());
    grouper.conditions_mut().gradients.set_active(true);
    let result = groups(grouper.recompute().unwrap());
    assert_eq!(
        grouper.group_paths(&result),
        vec![vec![landscape.clone(), landscape_big.clone(), portrait]]
    );

    let conditions = grouper.conditions_mut();
    conditions
        .shape
        .criterion_mut()
        .set_tolerance(ShapeTolerance::Orientation)
        .unwrap();
    conditions.shape.set_active(true);
    grouper
        .condition_mut("pictureshape")
        .unwrap()
        .set_must_match(true);

    let result = groups(grouper.recompute().unwrap());
    assert_eq!(
        grouper.group_paths(&result),
        vec![vec![landscape, landscape_big]]
    );
}

#[test]
fn test_color_distance_wraps_hue() {
    let dir = tempdir().unwrap();
    // Hues land on either side of zero: 254 and 2
    let red_a = save(dir.path(), "red_a.png", &flat(40, 30, [200, 10, 20]));
    let red_b = save(dir.path(), "red_b.png", &flat(40, 30, [200, 20, 10]));
    save(dir.path(), "blue.png", &flat(40, 30, [20, 10, 200]));

    let mut grouper = loaded(dir.path());
    grouper.conditions_mut().color.set_active(true);
    let result = groups(grouper.recompute().unwrap());

    assert_eq!(grouper.group_paths(&result), vec![vec![red_a, red_b]]);
}

#[test]
fn test_hidden_and_removed_images_leave_groups() {
    let dir = tempdir().unwrap();
    let a = save(dir.path(), "a.png", &ramp(64, 48, false));
    let b = save(dir.path(), "b.png", &ramp(80, 60, false));
    let c = save(dir.path(), "c.png", &ramp(96, 72, false));

    let mut grouper = loaded(dir.path());
    grouper.conditions_mut().gradients.set_active(true);
    let result = groups(grouper.recompute().unwrap());
    assert_eq!(
        grouper.group_paths(&result),
        vec![vec![a.clone(), b.clone(), c.clone()]]
    );

    let hidden = identity_of(&grouper, &b);
    grouper.hide(&hidden).unwrap();
    assert_eq!(grouper.active_identities().len(), 2);
    let result = groups(grouper.recompute().unwrap());
    assert_eq!(grouper.group_paths(&result), vec![vec![a, c.clone()]]);

    assert!(grouper.remove_path(&c).is_some());
    let result = groups(grouper.recompute().unwrap());
    assert!(result.is_empty());
}

#[test]
fn test_hide_unknown_identity_fails() {
    let dir = tempdir().unwrap();
    save(dir.path(), "a.png", &ramp(64, 48, false));

    let mut grouper = loaded(dir.path());
    let result = grouper.hide(&Identity::of_bytes(b"never loaded"));
    assert!(matches!(result, Err(Error::UnknownIdentity(_))));
}

#[test]
fn test_images_without_exif_never_match_on_metadata() {
    let dir = tempdir().unwrap();
    save(dir.path(), "a.png", &ramp(64, 48, false));
    save(dir.path(), "b.png", &ramp(64, 48, true));

    let mut grouper = loaded(dir.path());
    let conditions = grouper.conditions_mut();
    conditions.camera.criterion_mut().set_include_missing(true);
    conditions.camera.set_active(true);
    conditions.time.criterion_mut().set_window(TimeWindow::OneYear);
    conditions.time.criterion_mut().set_include_missing(true);
    conditions.time.set_active(true);

    let result = groups(grouper.recompute().unwrap());
    assert!(result.is_empty());
}

#[test]
fn test_add_keeps_existing_images() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let a = save(first.path(), "a.png", &ramp(64, 48, false));
    let b = save(second.path(), "b.png", &ramp(128, 96, false));

    let mut grouper = loaded(first.path());
    let report = grouper.add(&[second.path()]).unwrap();
    assert_eq!(report.images, 1);
    assert_eq!(grouper.active_identities().len(), 2);

    grouper.conditions_mut().gradients.set_active(true);
    let result = groups(grouper.recompute().unwrap());
    let listed: Vec<Vec<PathBuf>> = grouper.group_paths(&result);
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(listed, vec![expected]);

    // Loading again replaces everything
    let report = grouper.load(&[second.path()]).unwrap();
    assert_eq!(report.images, 1);
    assert_eq!(grouper.active_identities().len(), 1);
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let mut grouper = ImageGrouper::new(test_config()).unwrap();
    let gradients = grouper.conditions_mut().gradients.criterion_mut();

    assert!(matches!(
        gradients.set_limit(0),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(gradients.set_method_by_name("hsv").is_err());
    assert_eq!(gradients.limit(), 14);
}
