//! Batch domain model
//!
//! A batch is one production run of a recipe. Its volume may sit in a single
//! stage (legacy batches recorded before volume-split tracking) or be spread
//! across several stages at once (`stage_volumes`). The two shapes are kept
//! as an explicit tagged variant so the fallback path is a visible branch,
//! not an implicit null-chain.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BatchId, RecipeId};
use super::pipeline::Pipeline;
use super::stage::Stage;
use super::units::Unit;
use super::vessel::VOLUME_EPSILON;

/// Where a batch's volume currently sits
///
/// Old format: `{"current_stage": "Fermenting", "batch_size": 100.0}`
/// New format: `{"stage_volumes": {"Fermenting": 60.0, "Distilling": 40.0}}`
///
/// An empty or absent `stage_volumes` map deserializes as `Legacy`, so
/// records written before split tracking keep their original semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VolumeModelWire", into = "VolumeModelWire")]
pub enum BatchVolumeModel {
    /// Whole batch occupies one stage
    Legacy { current_stage: Stage, batch_size: f64 },
    /// Volume split across stages; a stage is active iff its volume > 0
    PerStage { stage_volumes: BTreeMap<Stage, f64> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VolumeModelWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_size: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    stage_volumes: BTreeMap<Stage, f64>,
}

impl From<VolumeModelWire> for BatchVolumeModel {
    fn from(wire: VolumeModelWire) -> Self {
        if wire.stage_volumes.is_empty() {
            BatchVolumeModel::Legacy {
                current_stage: wire.current_stage.unwrap_or(Stage::Upcoming),
                batch_size: wire.batch_size.unwrap_or(0.0),
            }
        } else {
            BatchVolumeModel::PerStage {
                stage_volumes: wire.stage_volumes,
            }
        }
    }
}

impl From<BatchVolumeModel> for VolumeModelWire {
    fn from(model: BatchVolumeModel) -> Self {
        match model {
            BatchVolumeModel::Legacy {
                current_stage,
                batch_size,
            } => VolumeModelWire {
                current_stage: Some(current_stage),
                batch_size: Some(batch_size),
                stage_volumes: BTreeMap::new(),
            },
            BatchVolumeModel::PerStage { stage_volumes } => VolumeModelWire {
                current_stage: None,
                batch_size: None,
                stage_volumes,
            },
        }
    }
}

impl BatchVolumeModel {
    /// Volume present at a stage. Legacy batches report their full size at
    /// their single current stage and zero everywhere else.
    pub fn volume_at(&self, stage: Stage) -> f64 {
        match self {
            BatchVolumeModel::Legacy {
                current_stage,
                batch_size,
            } => {
                if *current_stage == stage {
                    *batch_size
                } else {
                    0.0
                }
            }
            BatchVolumeModel::PerStage { stage_volumes } => {
                stage_volumes.get(&stage).copied().unwrap_or(0.0)
            }
        }
    }

    /// Total volume across all stages
    pub fn total_volume(&self) -> f64 {
        match self {
            BatchVolumeModel::Legacy { batch_size, .. } => *batch_size,
            BatchVolumeModel::PerStage { stage_volumes } => stage_volumes.values().sum(),
        }
    }

    /// Stages holding volume. Legacy batches always report their current
    /// stage, matching the original single-stage semantics.
    pub fn active_stages(&self) -> Vec<Stage> {
        match self {
            BatchVolumeModel::Legacy { current_stage, .. } => vec![*current_stage],
            BatchVolumeModel::PerStage { stage_volumes } => stage_volumes
                .iter()
                .filter(|(_, v)| **v > 0.0)
                .map(|(s, _)| *s)
                .collect(),
        }
    }

    pub fn is_active(&self, stage: Stage) -> bool {
        self.volume_at(stage) > 0.0
    }
}

/// A production run of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Unique identifier
    pub id: BatchId,

    /// Human-readable name (e.g. "Bourbon #12")
    pub name: String,

    /// The recipe this batch was started from
    pub recipe: RecipeId,

    /// Stage-volume state
    #[serde(flatten)]
    pub volume: BatchVolumeModel,

    /// Unit the stage volumes are expressed in
    pub volume_unit: Unit,

    /// Estimated alcohol-by-volume of the batch spirit (0-100)
    pub abv: f64,

    /// Monetary value attributed to the batch
    pub value: f64,

    /// When the batch was started
    pub created_at: DateTime<Utc>,

    /// When the batch was last updated
    pub updated_at: DateTime<Utc>,

    /// When the last of the batch reached the bottled marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottled_at: Option<DateTime<Utc>>,
}

impl Batch {
    /// Creates a new batch with its full volume waiting at "Upcoming"
    pub fn new(
        id: BatchId,
        name: impl Into<String>,
        recipe: RecipeId,
        size: f64,
        volume_unit: Unit,
        abv: f64,
        value: f64,
    ) -> Self {
        let now = Utc::now();
        let mut stage_volumes = BTreeMap::new();
        if size > 0.0 {
            stage_volumes.insert(Stage::Upcoming, size);
        }
        Self {
            id,
            name: name.into(),
            recipe,
            volume: BatchVolumeModel::PerStage { stage_volumes },
            volume_unit,
            abv,
            value,
            created_at: now,
            updated_at: now,
            bottled_at: None,
        }
    }

    pub fn volume_at(&self, stage: Stage) -> f64 {
        self.volume.volume_at(stage)
    }

    pub fn total_volume(&self) -> f64 {
        self.volume.total_volume()
    }

    pub fn active_stages(&self) -> Vec<Stage> {
        self.volume.active_stages()
    }

    pub fn is_active(&self, stage: Stage) -> bool {
        self.volume.is_active(stage)
    }

    /// The furthest-along active stage per the given pipeline. "Upcoming" is
    /// reported only when nothing has entered the pipeline yet.
    pub fn furthest_stage(&self, pipeline: &Pipeline) -> Option<Stage> {
        let active = self.active_stages();
        active
            .iter()
            .filter_map(|s| pipeline.position(*s).map(|pos| (pos, *s)))
            .max_by_key(|(pos, _)| *pos)
            .map(|(_, s)| s)
            .or_else(|| active.first().copied())
    }

    /// True once every drop of the batch sits at the bottled marker
    pub fn is_bottled(&self) -> bool {
        let total = self.total_volume();
        total > 0.0 && (self.volume_at(Stage::Bottled) - total).abs() < VOLUME_EPSILON
    }

    /// Rewrites a legacy batch into the per-stage model so it can be split.
    /// Per-stage batches are left untouched.
    pub fn ensure_per_stage(&mut self) {
        if let BatchVolumeModel::Legacy {
            current_stage,
            batch_size,
        } = self.volume
        {
            let mut stage_volumes = BTreeMap::new();
            if batch_size > 0.0 {
                stage_volumes.insert(current_stage, batch_size);
            }
            self.volume = BatchVolumeModel::PerStage { stage_volumes };
            self.updated_at = Utc::now();
        }
    }

    /// Sets the volume recorded at a stage, pruning the entry when it drops
    /// to effectively zero. Upgrades legacy batches first.
    pub fn set_stage_volume(&mut self, stage: Stage, volume: f64) {
        self.ensure_per_stage();
        if let BatchVolumeModel::PerStage { stage_volumes } = &mut self.volume {
            if volume > VOLUME_EPSILON {
                stage_volumes.insert(stage, volume);
            } else {
                stage_volumes.remove(&stage);
            }
        }
        self.updated_at = Utc::now();
    }

    /// Moves up to `volume` from one stage to another, clamped at what the
    /// source stage holds. Returns the volume actually moved.
    pub fn move_volume(&mut self, from: Stage, to: Stage, volume: f64) -> f64 {
        if volume <= 0.0 {
            return 0.0;
        }
        let available = self.volume_at(from);
        if available <= 0.0 {
            return 0.0;
        }
        let moved = volume.min(available);
        self.set_stage_volume(from, available - moved);
        let at_dest = self.volume_at(to);
        self.set_stage_volume(to, at_dest + moved);
        if to == Stage::Bottled && self.is_bottled() {
            self.bottled_at = Some(Utc::now());
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_batch(stage: Stage, size: f64) -> Batch {
        let mut batch = make_batch(size);
        batch.volume = BatchVolumeModel::Legacy {
            current_stage: stage,
            batch_size: size,
        };
        batch
    }

    fn make_batch(size: f64) -> Batch {
        let recipe = RecipeId::new("Test Recipe", Utc::now());
        let id = BatchId::new("Test Batch", Utc::now());
        Batch::new(id, "Test Batch", recipe, size, Unit::from("gal"), 40.0, 500.0)
    }

    #[test]
    fn new_batch_waits_at_upcoming() {
        let batch = make_batch(100.0);
        assert_eq!(batch.volume_at(Stage::Upcoming), 100.0);
        assert_eq!(batch.total_volume(), 100.0);
        assert_eq!(batch.active_stages(), vec![Stage::Upcoming]);
    }

    #[test]
    fn legacy_volume_at_reports_full_size_at_current_stage() {
        let batch = legacy_batch(Stage::Fermenting, 100.0);
        assert_eq!(batch.volume_at(Stage::Fermenting), 100.0);
        assert_eq!(batch.volume_at(Stage::Distilling), 0.0);
        assert_eq!(batch.total_volume(), 100.0);
        assert!(batch.is_active(Stage::Fermenting));
        assert!(!batch.is_active(Stage::Distilling));
    }

    #[test]
    fn legacy_active_stages_is_always_current_stage() {
        let batch = legacy_batch(Stage::Distilling, 0.0);
        assert_eq!(batch.active_stages(), vec![Stage::Distilling]);
    }

    #[test]
    fn per_stage_volume_queries() {
        let mut batch = make_batch(100.0);
        batch.set_stage_volume(Stage::Upcoming, 0.0);
        batch.set_stage_volume(Stage::Fermenting, 60.0);
        batch.set_stage_volume(Stage::Distilling, 40.0);

        assert_eq!(batch.volume_at(Stage::Fermenting), 60.0);
        assert_eq!(batch.volume_at(Stage::Distilling), 40.0);
        assert_eq!(batch.volume_at(Stage::Storage), 0.0);
        assert_eq!(batch.total_volume(), 100.0);
        assert_eq!(
            batch.active_stages(),
            vec![Stage::Fermenting, Stage::Distilling]
        );
    }

    #[test]
    fn move_volume_splits_across_stages() {
        let mut batch = make_batch(100.0);
        let moved = batch.move_volume(Stage::Upcoming, Stage::Mashing, 100.0);
        assert_eq!(moved, 100.0);

        let moved = batch.move_volume(Stage::Mashing, Stage::Fermenting, 40.0);
        assert_eq!(moved, 40.0);
        assert_eq!(batch.volume_at(Stage::Mashing), 60.0);
        assert_eq!(batch.volume_at(Stage::Fermenting), 40.0);
        assert_eq!(batch.total_volume(), 100.0);
    }

    #[test]
    fn move_volume_clamps_at_available() {
        let mut batch = make_batch(50.0);
        let moved = batch.move_volume(Stage::Upcoming, Stage::Fermenting, 80.0);
        assert_eq!(moved, 50.0);
        assert_eq!(batch.volume_at(Stage::Upcoming), 0.0);
        assert_eq!(batch.volume_at(Stage::Fermenting), 50.0);
    }

    #[test]
    fn move_volume_from_empty_stage_is_a_no_op() {
        let mut batch = make_batch(50.0);
        let moved = batch.move_volume(Stage::Distilling, Stage::Storage, 10.0);
        assert_eq!(moved, 0.0);
        assert_eq!(batch.total_volume(), 50.0);
    }

    #[test]
    fn drained_stage_is_pruned() {
        let mut batch = make_batch(50.0);
        batch.move_volume(Stage::Upcoming, Stage::Fermenting, 50.0);
        assert!(!batch.active_stages().contains(&Stage::Upcoming));
    }

    #[test]
    fn ensure_per_stage_upgrades_legacy() {
        let mut batch = legacy_batch(Stage::Fermenting, 100.0);
        batch.ensure_per_stage();
        match &batch.volume {
            BatchVolumeModel::PerStage { stage_volumes } => {
                assert_eq!(stage_volumes.get(&Stage::Fermenting), Some(&100.0));
                assert_eq!(stage_volumes.len(), 1);
            }
            BatchVolumeModel::Legacy { .. } => panic!("expected per-stage model"),
        }
        assert_eq!(batch.total_volume(), 100.0);
    }

    #[test]
    fn bottled_when_all_volume_reaches_marker() {
        let mut batch = make_batch(50.0);
        batch.move_volume(Stage::Upcoming, Stage::Proofing, 50.0);
        assert!(!batch.is_bottled());

        batch.move_volume(Stage::Proofing, Stage::Bottled, 50.0);
        assert!(batch.is_bottled());
        assert!(batch.bottled_at.is_some());
    }

    #[test]
    fn furthest_stage_follows_pipeline_order() {
        use crate::domain::pipeline::PipelineTemplate;
        let pipeline = PipelineTemplate::GrainBarreled.stages();

        let mut batch = make_batch(100.0);
        batch.set_stage_volume(Stage::Upcoming, 0.0);
        batch.set_stage_volume(Stage::Fermenting, 60.0);
        batch.set_stage_volume(Stage::BarrelAging, 40.0);

        assert_eq!(batch.furthest_stage(&pipeline), Some(Stage::BarrelAging));
    }

    #[test]
    fn legacy_deserialization() {
        let recipe = RecipeId::new("Test Recipe", Utc::now());
        let id = BatchId::new("Old Batch", Utc::now());
        let json = format!(
            r#"{{"id":"{}","name":"Old Batch","recipe":"{}","current_stage":"Fermenting","batch_size":100.0,"volume_unit":"gal","abv":8.0,"value":300.0,"created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}}"#,
            id, recipe
        );

        let batch: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(
            batch.volume,
            BatchVolumeModel::Legacy {
                current_stage: Stage::Fermenting,
                batch_size: 100.0
            }
        );
        assert_eq!(batch.volume_at(Stage::Fermenting), 100.0);
    }

    #[test]
    fn legacy_deserialization_without_stage_defaults_to_upcoming() {
        let recipe = RecipeId::new("Test Recipe", Utc::now());
        let id = BatchId::new("Bare Batch", Utc::now());
        let json = format!(
            r#"{{"id":"{}","name":"Bare Batch","recipe":"{}","volume_unit":"gal","abv":0.0,"value":0.0,"created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}}"#,
            id, recipe
        );

        let batch: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(
            batch.volume,
            BatchVolumeModel::Legacy {
                current_stage: Stage::Upcoming,
                batch_size: 0.0
            }
        );
    }

    #[test]
    fn per_stage_serde_roundtrip() {
        let mut batch = make_batch(100.0);
        batch.move_volume(Stage::Upcoming, Stage::Fermenting, 60.0);

        let json = serde_json::to_string(&batch).unwrap();
        assert!(json.contains("stage_volumes"));
        assert!(!json.contains("batch_size"));

        let parsed: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.volume, batch.volume);
        assert_eq!(parsed.volume_at(Stage::Fermenting), 60.0);
        assert_eq!(parsed.volume_at(Stage::Upcoming), 40.0);
    }

    #[test]
    fn legacy_serde_roundtrip() {
        let batch = legacy_batch(Stage::BarrelAging, 53.0);

        let json = serde_json::to_string(&batch).unwrap();
        assert!(json.contains("current_stage"));
        assert!(!json.contains("stage_volumes"));

        let parsed: Batch = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.volume, batch.volume);
    }

    #[test]
    fn stage_volume_map_uses_display_names() {
        let mut batch = make_batch(50.0);
        batch.set_stage_volume(Stage::Upcoming, 0.0);
        batch.set_stage_volume(Stage::BarrelAging, 50.0);

        let json = serde_json::to_string(&batch).unwrap();
        assert!(json.contains("\"Barrel Aging\":50.0"));
    }
}
