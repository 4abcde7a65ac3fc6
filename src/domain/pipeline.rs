//! Pipeline definitions and stage-ordering queries
//!
//! A pipeline is the ordered stage sequence a recipe's batches progress
//! through. Six built-in templates cover the common spirit styles; "Custom"
//! starts empty and is assembled stage by stage at recipe creation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stage::Stage;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown stage: {0}")]
    UnknownStage(String),
    #[error("Stage '{0}' cannot be placed mid-pipeline")]
    BoundaryStage(Stage),
    #[error("Stage '{0}' appears more than once")]
    DuplicateStage(Stage),
}

/// An ordered sequence of production stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline(Vec<Stage>);

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Pipeline(stages)
    }

    /// Builds a pipeline from user-supplied stage names, appending the
    /// terminal "Bottled" marker. Rejects unknown names, boundary markers,
    /// and duplicates.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, PipelineError> {
        let mut stages = Vec::with_capacity(names.len() + 1);
        for name in names {
            let stage: Stage = name
                .as_ref()
                .parse()
                .map_err(|_| PipelineError::UnknownStage(name.as_ref().to_string()))?;
            if stage.is_boundary() {
                return Err(PipelineError::BoundaryStage(stage));
            }
            if stages.contains(&stage) {
                return Err(PipelineError::DuplicateStage(stage));
            }
            stages.push(stage);
        }
        stages.push(Stage::Bottled);
        Ok(Pipeline(stages))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.0.contains(&stage)
    }

    /// Position of a stage within this pipeline
    pub fn position(&self, stage: Stage) -> Option<usize> {
        self.0.iter().position(|s| *s == stage)
    }

    /// The first stage a new batch enters
    pub fn first_stage(&self) -> Option<Stage> {
        self.0.first().copied()
    }

    /// The stage immediately after `stage`, or None if last or absent
    pub fn next_stage(&self, stage: Stage) -> Option<Stage> {
        let idx = self.position(stage)?;
        self.0.get(idx + 1).copied()
    }

    /// The stage immediately before `stage`, or None if first or absent
    pub fn previous_stage(&self, stage: Stage) -> Option<Stage> {
        let idx = self.position(stage)?;
        if idx == 0 {
            return None;
        }
        self.0.get(idx - 1).copied()
    }

    /// True iff both stages are in the pipeline and `current` is at or past
    /// `target`. Absent stages are never "reached"; no ordering is assumed
    /// outside the pipeline itself.
    pub fn has_reached(&self, current: Stage, target: Stage) -> bool {
        match (self.position(current), self.position(target)) {
            (Some(c), Some(t)) => c >= t,
            _ => false,
        }
    }

    /// Vocabulary stages not yet in this pipeline, boundary markers excluded
    pub fn available_to_add(&self) -> Vec<Stage> {
        Stage::all()
            .iter()
            .copied()
            .filter(|s| !s.is_boundary() && !self.contains(*s))
            .collect()
    }
}

/// Built-in pipeline templates offered at recipe creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineTemplate {
    #[serde(rename = "Grain Spirit (Barreled)")]
    GrainBarreled,
    #[serde(rename = "Grain Spirit (Unbarreled)")]
    GrainUnbarreled,
    #[serde(rename = "Sugar Spirit (Barreled)")]
    SugarBarreled,
    #[serde(rename = "Sugar Spirit (Unbarreled)")]
    SugarUnbarreled,
    #[serde(rename = "Botanical Spirit")]
    Botanical,
    Liqueur,
    Custom,
}

impl PipelineTemplate {
    pub fn all() -> &'static [PipelineTemplate] {
        &[
            PipelineTemplate::GrainBarreled,
            PipelineTemplate::GrainUnbarreled,
            PipelineTemplate::SugarBarreled,
            PipelineTemplate::SugarUnbarreled,
            PipelineTemplate::Botanical,
            PipelineTemplate::Liqueur,
            PipelineTemplate::Custom,
        ]
    }

    /// The stage sequence this template expands to. "Custom" expands to an
    /// empty pipeline the caller fills in.
    pub fn stages(&self) -> Pipeline {
        let stages = match self {
            PipelineTemplate::GrainBarreled => vec![
                Stage::Mashing,
                Stage::Fermenting,
                Stage::Distilling,
                Stage::BarrelAging,
                Stage::Storage,
                Stage::Proofing,
                Stage::Bottled,
            ],
            PipelineTemplate::GrainUnbarreled => vec![
                Stage::Mashing,
                Stage::Fermenting,
                Stage::Distilling,
                Stage::Storage,
                Stage::Proofing,
                Stage::Bottled,
            ],
            PipelineTemplate::SugarBarreled => vec![
                Stage::Fermenting,
                Stage::Distilling,
                Stage::BarrelAging,
                Stage::Storage,
                Stage::Proofing,
                Stage::Bottled,
            ],
            PipelineTemplate::SugarUnbarreled => vec![
                Stage::Fermenting,
                Stage::Distilling,
                Stage::Storage,
                Stage::Proofing,
                Stage::Bottled,
            ],
            PipelineTemplate::Botanical => vec![
                Stage::Distilling,
                Stage::Infusing,
                Stage::Storage,
                Stage::Proofing,
                Stage::Bottled,
            ],
            PipelineTemplate::Liqueur => vec![
                Stage::Infusing,
                Stage::Blending,
                Stage::Storage,
                Stage::Proofing,
                Stage::Bottled,
            ],
            PipelineTemplate::Custom => vec![],
        };
        Pipeline::new(stages)
    }
}

impl std::fmt::Display for PipelineTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineTemplate::GrainBarreled => write!(f, "Grain Spirit (Barreled)"),
            PipelineTemplate::GrainUnbarreled => write!(f, "Grain Spirit (Unbarreled)"),
            PipelineTemplate::SugarBarreled => write!(f, "Sugar Spirit (Barreled)"),
            PipelineTemplate::SugarUnbarreled => write!(f, "Sugar Spirit (Unbarreled)"),
            PipelineTemplate::Botanical => write!(f, "Botanical Spirit"),
            PipelineTemplate::Liqueur => write!(f, "Liqueur"),
            PipelineTemplate::Custom => write!(f, "Custom"),
        }
    }
}

impl std::str::FromStr for PipelineTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "grain spirit (barreled)" | "grain-barreled" | "grain" => {
                Ok(PipelineTemplate::GrainBarreled)
            }
            "grain spirit (unbarreled)" | "grain-unbarreled" => {
                Ok(PipelineTemplate::GrainUnbarreled)
            }
            "sugar spirit (barreled)" | "sugar-barreled" | "sugar" => {
                Ok(PipelineTemplate::SugarBarreled)
            }
            "sugar spirit (unbarreled)" | "sugar-unbarreled" => {
                Ok(PipelineTemplate::SugarUnbarreled)
            }
            "botanical spirit" | "botanical" => Ok(PipelineTemplate::Botanical),
            "liqueur" => Ok(PipelineTemplate::Liqueur),
            "custom" => Ok(PipelineTemplate::Custom),
            _ => Err(format!("Unknown pipeline template: {}", s)),
        }
    }
}
