//! Landmark registry and field geometry.
//!
//! Loaded once at startup and read-only afterwards, so estimators on
//! several cameras can share one registry behind an `Arc` without locking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{Pose2d, Translation2d};

/// Field extent: the legal region is `[0, length_x] × [0, width_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldDimensions {
    pub length_x: f64,
    pub width_y: f64,
}

impl FieldDimensions {
    pub fn new(length_x: f64, width_y: f64) -> Self {
        Self { length_x, width_y }
    }

    /// Inclusive containment test.  NaN coordinates are never contained.
    pub fn contains(&self, t: Translation2d) -> bool {
        (0.0..=self.length_x).contains(&t.x) && (0.0..=self.width_y).contains(&t.y)
    }

    pub fn center(&self) -> Translation2d {
        Translation2d::new(self.length_x / 2.0, self.width_y / 2.0)
    }
}

impl Default for FieldDimensions {
    /// 54 ft × 27 ft.
    fn default() -> Self {
        Self::new(16.4592, 8.2296)
    }
}

/// The single, unidentified field landmark used by the colored pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldLandmark {
    /// Centre of the landmark on the field.
    pub pose: Pose2d,
    /// Distance from the visible target ring to the landmark centre.
    pub radius_meters: f64,
}

impl Default for FieldLandmark {
    /// Hub at field centre.
    fn default() -> Self {
        Self {
            pose: Pose2d::from_xy_degrees(8.2296, 4.1148, 0.0),
            radius_meters: 0.6778,
        }
    }
}

/// One fiducial entry as it appears in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TagEntry {
    pub id: u32,
    pub pose: Pose2d,
}

/// Known field poses keyed by fiducial identity, plus the colored landmark.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RegistryRepr", into = "RegistryRepr")]
pub struct LandmarkRegistry {
    tags: BTreeMap<u32, Pose2d>,
    landmark: FieldLandmark,
}

impl LandmarkRegistry {
    pub fn new(landmark: FieldLandmark) -> Self {
        Self {
            tags: BTreeMap::new(),
            landmark,
        }
    }

    /// Builder-style tag registration.  A repeated `id` replaces the
    /// previous pose.
    pub fn with_tag(mut self, id: u32, pose: Pose2d) -> Self {
        self.tags.insert(id, pose);
        self
    }

    /// Field pose of fiducial `id`, or `None` when it is not registered.
    pub fn tag_pose(&self, id: u32) -> Option<Pose2d> {
        self.tags.get(&id).copied()
    }

    pub fn landmark(&self) -> FieldLandmark {
        self.landmark
    }

    /// Registered tags in ascending id order.
    pub fn tags(&self) -> impl Iterator<Item = (u32, Pose2d)> + '_ {
        self.tags.iter().map(|(id, pose)| (*id, *pose))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct RegistryRepr {
    #[serde(default)]
    tags: Vec<TagEntry>,
    #[serde(default)]
    landmark: FieldLandmark,
}

impl From<RegistryRepr> for LandmarkRegistry {
    fn from(repr: RegistryRepr) -> Self {
        repr.tags
            .into_iter()
            .fold(LandmarkRegistry::new(repr.landmark), |reg, e| {
                reg.with_tag(e.id, e.pose)
            })
    }
}

impl From<LandmarkRegistry> for RegistryRepr {
    fn from(reg: LandmarkRegistry) -> Self {
        RegistryRepr {
            tags: reg.tags().map(|(id, pose)| TagEntry { id, pose }).collect(),
            landmark: reg.landmark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_contains_is_inclusive_at_edges() {
        let field = FieldDimensions::new(10.0, 5.0);
        assert!(field.contains(Translation2d::new(0.0, 0.0)));
        assert!(field.contains(Translation2d::new(10.0, 5.0)));
        assert!(field.contains(Translation2d::new(3.0, 2.0)));
    }

    #[test]
    fn field_rejects_outside_and_nan() {
        let field = FieldDimensions::new(10.0, 5.0);
        assert!(!field.contains(Translation2d::new(-0.01, 2.0)));
        assert!(!field.contains(Translation2d::new(10.01, 2.0)));
        assert!(!field.contains(Translation2d::new(3.0, -1.0)));
        assert!(!field.contains(Translation2d::new(3.0, 5.5)));
        assert!(!field.contains(Translation2d::new(f64::NAN, 2.0)));
    }

    #[test]
    fn unknown_tag_lookup_is_none() {
        let reg = LandmarkRegistry::default().with_tag(7, Pose2d::from_xy_degrees(5.0, 3.0, 0.0));
        assert!(reg.tag_pose(7).is_some());
        assert!(reg.tag_pose(8).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn registry_deserializes_from_tag_list() {
        let json = r#"{
            "tags": [
                {"id": 1, "pose": {"translation": {"x": 1.0, "y": 2.0}, "rotation": 180.0}},
                {"id": 4, "pose": {"translation": {"x": 15.0, "y": 6.0}, "rotation": 0.0}}
            ]
        }"#;
        let reg: LandmarkRegistry = serde_json::from_str(json).unwrap();
        assert_eq!(reg.len(), 2);
        let p = reg.tag_pose(1).unwrap();
        assert!((p.rotation.degrees() - 180.0).abs() < 1e-9);
        // Landmark falls back to the default hub.
        assert!((reg.landmark().radius_meters - 0.6778).abs() < 1e-12);
    }
}
