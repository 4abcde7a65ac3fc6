//! Production stage vocabulary
//!
//! The eleven canonical stages a batch can occupy. "Upcoming" and "Bottled"
//! are boundary markers: "Upcoming" is where a batch sits before its first
//! real stage, "Bottled" terminates every pipeline. Neither is offered as an
//! insertable mid-pipeline stage.

use serde::{Deserialize, Serialize};

use super::vessel::VesselKind;

/// A production stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Upcoming,
    Mashing,
    Fermenting,
    Distilling,
    Infusing,
    Blending,
    #[serde(rename = "Barrel Aging")]
    BarrelAging,
    Storage,
    Proofing,
    Bottling,
    Bottled,
}

impl Stage {
    /// Returns all eleven canonical stages in conventional order
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Upcoming,
            Stage::Mashing,
            Stage::Fermenting,
            Stage::Distilling,
            Stage::Infusing,
            Stage::Blending,
            Stage::BarrelAging,
            Stage::Storage,
            Stage::Proofing,
            Stage::Bottling,
            Stage::Bottled,
        ]
    }

    /// Returns true for the two pipeline-boundary markers
    pub fn is_boundary(&self) -> bool {
        matches!(self, Stage::Upcoming | Stage::Bottled)
    }

    /// The vessel kind this stage runs in, or None for stages that do not
    /// occupy a vessel (boundary markers and bottling)
    pub fn required_vessel(&self) -> Option<VesselKind> {
        match self {
            Stage::Mashing => Some(VesselKind::MashTun),
            Stage::Fermenting => Some(VesselKind::Fermenter),
            Stage::Distilling => Some(VesselKind::Still),
            Stage::Infusing | Stage::Blending | Stage::Storage | Stage::Proofing => {
                Some(VesselKind::Tank)
            }
            Stage::BarrelAging => Some(VesselKind::Barrel),
            Stage::Upcoming | Stage::Bottling | Stage::Bottled => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Upcoming => write!(f, "Upcoming"),
            Stage::Mashing => write!(f, "Mashing"),
            Stage::Fermenting => write!(f, "Fermenting"),
            Stage::Distilling => write!(f, "Distilling"),
            Stage::Infusing => write!(f, "Infusing"),
            Stage::Blending => write!(f, "Blending"),
            Stage::BarrelAging => write!(f, "Barrel Aging"),
            Stage::Storage => write!(f, "Storage"),
            Stage::Proofing => write!(f, "Proofing"),
            Stage::Bottling => write!(f, "Bottling"),
            Stage::Bottled => write!(f, "Bottled"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "upcoming" => Ok(Stage::Upcoming),
            "mashing" => Ok(Stage::Mashing),
            "fermenting" => Ok(Stage::Fermenting),
            "distilling" => Ok(Stage::Distilling),
            "infusing" => Ok(Stage::Infusing),
            "blending" => Ok(Stage::Blending),
            "barrel aging" | "barrelaging" => Ok(Stage::BarrelAging),
            "storage" => Ok(Stage::Storage),
            "proofing" => Ok(Stage::Proofing),
            "bottling" => Ok(Stage::Bottling),
            "bottled" => Ok(Stage::Bottled),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}
