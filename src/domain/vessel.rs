//! Vessel domain model
//!
//! Vessels are the physical containers spirit moves through. Each holds a
//! list of batch-attributed content entries; the aggregate `current` snapshot
//! (total volume, weighted ABV, total value) is derived from that list and
//! recomputed on every mutation, never edited directly.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::batch::Batch;
use super::id::{BatchId, RecipeId, VesselId};
use super::recipe::Recipe;
use super::stage::Stage;
use super::units::{convert, Unit};

/// Entries whose volume falls below this are pruned after any mutation, so
/// a vessel never retains a ghost zero-volume entry.
pub const VOLUME_EPSILON: f64 = 0.001;

/// Kind of physical container. Determines which pipeline stages may target
/// the vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VesselKind {
    #[serde(rename = "Mash Tun")]
    MashTun,
    Fermenter,
    Still,
    Tank,
    Barrel,
}

impl VesselKind {
    pub fn all() -> &'static [VesselKind] {
        &[
            VesselKind::MashTun,
            VesselKind::Fermenter,
            VesselKind::Still,
            VesselKind::Tank,
            VesselKind::Barrel,
        ]
    }
}

impl std::fmt::Display for VesselKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VesselKind::MashTun => write!(f, "Mash Tun"),
            VesselKind::Fermenter => write!(f, "Fermenter"),
            VesselKind::Still => write!(f, "Still"),
            VesselKind::Tank => write!(f, "Tank"),
            VesselKind::Barrel => write!(f, "Barrel"),
        }
    }
}

impl std::str::FromStr for VesselKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "mash tun" | "mashtun" | "tun" => Ok(VesselKind::MashTun),
            "fermenter" | "fermentor" => Ok(VesselKind::Fermenter),
            "still" => Ok(VesselKind::Still),
            "tank" => Ok(VesselKind::Tank),
            "barrel" | "cask" => Ok(VesselKind::Barrel),
            _ => Err(format!("Unknown vessel kind: {}", s)),
        }
    }
}

/// Nominal capacity of a vessel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VesselStats {
    /// Capacity volume; 0 when undeclared
    #[serde(default)]
    pub volume: f64,

    /// Unit the capacity is declared in; empty when undeclared
    #[serde(default, skip_serializing_if = "Unit::is_empty")]
    pub volume_unit: Unit,

    /// Nominal weight capacity (grain loads, mash weight)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_unit: Option<Unit>,
}

impl VesselStats {
    pub fn volume_capacity(volume: f64, unit: impl Into<Unit>) -> Self {
        Self {
            volume,
            volume_unit: unit.into(),
            weight: None,
            weight_unit: None,
        }
    }
}

/// Barrel-only metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarrelDetails {
    /// Barrel size in gallons (53 for a standard whiskey barrel)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,

    /// Char level of the staves (e.g. "#3")
    #[serde(rename = "char", default, skip_serializing_if = "Option::is_none")]
    pub char_level: Option<String>,

    /// Purchase cost
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

/// One batch-attributed sub-volume held inside a vessel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// The batch this fraction belongs to. A batch may have fractions in
    /// several vessels at once; this is a non-owning link.
    pub batch: BatchId,

    /// Volume of this fraction, always non-negative
    pub volume: f64,

    /// Unit the volume is expressed in
    pub volume_unit: Unit,

    /// Alcohol-by-volume of this fraction (0-100)
    pub abv: f64,

    /// Monetary value attributable to this fraction
    pub value: f64,
}

impl ContentEntry {
    pub fn new(
        batch: BatchId,
        volume: f64,
        volume_unit: impl Into<Unit>,
        abv: f64,
        value: f64,
    ) -> Self {
        Self {
            batch,
            volume,
            volume_unit: volume_unit.into(),
            abv,
            value,
        }
    }

    /// This entry's volume expressed in another unit
    pub fn volume_in(&self, unit: &Unit) -> f64 {
        convert(self.volume, &self.volume_unit, unit)
    }
}

/// Derived aggregate snapshot of a vessel's contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VesselCurrent {
    pub volume: f64,

    #[serde(default, skip_serializing_if = "Unit::is_empty")]
    pub volume_unit: Unit,

    pub abv: f64,

    pub value: f64,
}

impl VesselCurrent {
    /// Plain gallons of product, regardless of proof (TABC tax basis)
    pub fn wine_gallons(&self) -> f64 {
        convert(self.volume, &self.volume_unit, &Unit::from("gal"))
    }

    /// TTB regulatory unit: gallons times ABV over fifty
    pub fn proof_gallons(&self) -> f64 {
        self.wine_gallons() * self.abv / 50.0
    }
}

/// A physical container and its content ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    /// Unique identifier
    pub id: VesselId,

    /// Human-readable name (e.g. "FV-2", "Barrel 114")
    pub name: String,

    /// Kind of container
    #[serde(rename = "type")]
    pub kind: VesselKind,

    /// Nominal capacity
    #[serde(default, skip_serializing_if = "stats_is_default")]
    pub stats: VesselStats,

    /// Batch-attributed content entries; insertion order carries no meaning
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<ContentEntry>,

    /// Derived snapshot, recomputed from `contents` on every mutation
    #[serde(default)]
    pub current: VesselCurrent,

    /// Barrel-only metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barrel: Option<BarrelDetails>,

    /// Whether this barrel has held spirit before (barrel reuse tracking)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_used: bool,

    /// Spirit previously held, captured when a barrel is emptied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_contents: Option<String>,

    /// When the vessel was registered
    pub created_at: DateTime<Utc>,

    /// When the vessel was last updated
    pub updated_at: DateTime<Utc>,
}

fn stats_is_default(stats: &VesselStats) -> bool {
    *stats == VesselStats::default()
}

impl Vessel {
    /// Registers a new, empty vessel
    pub fn new(id: VesselId, name: impl Into<String>, kind: VesselKind, stats: VesselStats) -> Self {
        let now = Utc::now();
        let current = VesselCurrent {
            volume_unit: stats.volume_unit.clone(),
            ..VesselCurrent::default()
        };
        Self {
            id,
            name: name.into(),
            kind,
            stats,
            contents: Vec::new(),
            current,
            barrel: None,
            is_used: false,
            previous_contents: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// True if this vessel's kind matches the stage's required container
    pub fn accepts_stage(&self, stage: Stage) -> bool {
        stage.required_vessel() == Some(self.kind)
    }

    /// Index of the content entry belonging to a batch, if present
    pub fn find_content(&self, batch: &BatchId) -> Option<usize> {
        self.contents.iter().position(|e| &e.batch == batch)
    }

    pub fn has_batch(&self, batch: &BatchId) -> bool {
        self.find_content(batch).is_some()
    }

    /// Sum of all content volumes expressed in the given unit
    pub fn contents_volume_in(&self, unit: &Unit) -> f64 {
        self.contents.iter().map(|e| e.volume_in(unit)).sum()
    }

    /// Percent of declared capacity occupied, or None when no capacity is
    /// declared
    pub fn capacity_used(&self) -> Option<f64> {
        if self.stats.volume <= 0.0 || self.stats.volume_unit.is_empty() {
            return None;
        }
        let held = self.contents_volume_in(&self.stats.volume_unit);
        Some(held / self.stats.volume * 100.0)
    }

    /// Rebuilds the `current` snapshot from `contents`.
    ///
    /// The total is expressed in the declared capacity unit, falling back to
    /// the first entry's unit when no capacity is declared. ABV is the
    /// volume-weighted average; value is a plain sum (currency needs no unit
    /// conversion). An empty vessel gets the zero snapshot, keeping only the
    /// previous unit label.
    pub fn recompute(&mut self) {
        if self.contents.is_empty() {
            self.current = VesselCurrent {
                volume: 0.0,
                volume_unit: self.current.volume_unit.clone(),
                abv: 0.0,
                value: 0.0,
            };
            return;
        }

        let target_unit = if !self.stats.volume_unit.is_empty() {
            self.stats.volume_unit.clone()
        } else {
            self.contents[0].volume_unit.clone()
        };

        let mut total = 0.0;
        let mut weighted_abv = 0.0;
        let mut value = 0.0;
        for entry in &self.contents {
            let volume = entry.volume_in(&target_unit);
            total += volume;
            weighted_abv += entry.abv * volume;
            value += entry.value;
        }

        self.current = VesselCurrent {
            volume: total,
            volume_unit: target_unit,
            abv: if total > 0.0 { weighted_abv / total } else { 0.0 },
            value,
        };
    }

    /// Adds a content entry (batch entering a vessel-bound stage or a
    /// transfer-in) and refreshes the snapshot
    pub fn add_content(&mut self, entry: ContentEntry) {
        self.contents.push(entry);
        self.prune_empty();
        self.recompute();
        self.updated_at = Utc::now();
    }

    /// Drops entries drained below the epsilon threshold
    pub fn prune_empty(&mut self) {
        self.contents.retain(|e| e.volume >= VOLUME_EPSILON);
    }

    /// Draws part of a batch's fraction out of the vessel with no receiving
    /// vessel (bottling runs, sampling). The request is clamped at what the
    /// entry holds and value leaves proportionally. Returns the volume
    /// removed in the entry's own unit, or None when the batch has nothing
    /// here.
    pub fn draw_content(
        &mut self,
        batch: &BatchId,
        volume: f64,
        volume_unit: &Unit,
    ) -> Option<f64> {
        if volume <= 0.0 {
            return None;
        }
        let idx = self
            .find_content(batch)
            .filter(|&i| self.contents[i].volume > 0.0)?;

        let entry_unit = self.contents[idx].volume_unit.clone();
        let available = self.contents[idx].volume;
        let requested = convert(volume, volume_unit, &entry_unit);
        let actual = requested.min(available);
        let removed_value = self.contents[idx].value * (actual / available);

        self.contents[idx].volume -= actual;
        self.contents[idx].value -= removed_value;
        self.prune_empty();
        self.recompute();
        self.updated_at = Utc::now();
        Some(actual)
    }

    /// Clears the vessel. For barrels holding spirit this first captures
    /// reuse provenance: `is_used` is set and `previous_contents` records the
    /// spirit type resolved through the first entry's batch and its recipe,
    /// falling back to the recipe name. Non-barrel kinds skip the capture.
    pub fn empty_contents(
        &mut self,
        batches: &HashMap<BatchId, Batch>,
        recipes: &HashMap<RecipeId, Recipe>,
    ) {
        if self.kind == VesselKind::Barrel && !self.contents.is_empty() {
            self.is_used = true;
            let label = self.contents.first().and_then(|entry| {
                let batch = batches.get(&entry.batch)?;
                let recipe = recipes.get(&batch.recipe)?;
                Some(recipe.spirit_label().to_string())
            });
            if let Some(label) = label {
                self.previous_contents = Some(label);
            }
        }
        self.contents.clear();
        self.recompute();
        self.updated_at = Utc::now();
    }
}
