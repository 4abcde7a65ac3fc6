//! Volume transfers between vessels
//!
//! Three transfer modes over a pair of vessel ledgers: full transfer,
//! proportional partial transfer spread across every content entry, and
//! batch-targeted partial transfer of one entry. All three recompute both
//! vessels before returning; failures are explicit errors so callers can
//! tell "did nothing" from "succeeded".

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::id::BatchId;
use super::units::{convert, Unit};
use super::vessel::{ContentEntry, Vessel, VOLUME_EPSILON};

#[derive(Error, Debug, PartialEq)]
pub enum TransferError {
    #[error("Source vessel is empty")]
    EmptySource,

    #[error("Insufficient volume: requested {requested:.3} {unit}, only {available:.3} {unit} in source")]
    InsufficientVolume {
        requested: f64,
        available: f64,
        unit: Unit,
    },

    #[error("Batch {batch} has no contents in the source vessel")]
    BatchNotPresent { batch: BatchId },

    #[error("Transfer volume must be positive (got {0})")]
    InvalidVolume(f64),
}

/// What a completed transfer moved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReceipt {
    /// Volume moved, expressed in `volume_unit`
    pub volume: f64,
    pub volume_unit: Unit,
    /// Monetary value moved
    pub value: f64,
    /// Content entries the transfer touched in the source
    pub entries: usize,
}

/// Moves every content entry from `source` to `dest`.
///
/// Destination contents become the concatenation of its prior entries and
/// the source's, in order, with no merging of like batches. The source is
/// left empty.
pub fn full_transfer(source: &mut Vessel, dest: &mut Vessel) -> Result<TransferReceipt, TransferError> {
    if source.contents.is_empty() {
        return Err(TransferError::EmptySource);
    }

    let receipt = TransferReceipt {
        volume: source.current.volume,
        volume_unit: source.current.volume_unit.clone(),
        value: source.current.value,
        entries: source.contents.len(),
    };

    dest.contents.append(&mut source.contents);

    finish(source, dest);
    Ok(receipt)
}

/// Draws a stated volume out of `source` without naming a batch: every
/// content entry gives up the same share of itself.
///
/// Volumes are normalized into the source's first entry's unit before the
/// ratio is computed. Destination entries keep each source entry's own unit.
/// Asking for the whole vessel (within the epsilon tolerance) moves every
/// entry outright; asking for more is an error.
pub fn transfer_proportional(
    source: &mut Vessel,
    dest: &mut Vessel,
    volume: f64,
    volume_unit: &Unit,
) -> Result<TransferReceipt, TransferError> {
    if volume <= 0.0 {
        return Err(TransferError::InvalidVolume(volume));
    }

    let normal_unit = source
        .contents
        .first()
        .map(|e| e.volume_unit.clone())
        .unwrap_or_else(|| volume_unit.clone());

    let source_total = source.contents_volume_in(&normal_unit);
    if source_total <= 0.0 {
        return Err(TransferError::EmptySource);
    }

    let requested = convert(volume, volume_unit, &normal_unit);
    if requested > source_total + VOLUME_EPSILON {
        return Err(TransferError::InsufficientVolume {
            requested,
            available: source_total,
            unit: normal_unit,
        });
    }

    let entries = source.contents.len();
    let mut moved_value = 0.0;

    if (source_total - requested).abs() <= VOLUME_EPSILON {
        // Draining the vessel completely: move entries whole rather than
        // splitting by a ratio of one, which would zero the remainder by
        // arithmetic luck instead of intent.
        moved_value = source.current.value;
        dest.contents.append(&mut source.contents);
    } else {
        let ratio = requested / source_total;
        for entry in &mut source.contents {
            let split_volume = entry.volume * ratio;
            let split_value = entry.value * ratio;
            entry.volume -= split_volume;
            entry.value -= split_value;
            moved_value += split_value;
            dest.contents.push(ContentEntry::new(
                entry.batch.clone(),
                split_volume,
                entry.volume_unit.clone(),
                entry.abv,
                split_value,
            ));
        }
    }

    finish(source, dest);
    Ok(TransferReceipt {
        volume,
        volume_unit: volume_unit.clone(),
        value: moved_value,
        entries,
    })
}

/// Moves a stated volume of one batch's fraction from `source` to `dest`,
/// used for selective stage advancement of part of a batch.
///
/// The request is clamped at what the entry holds; a request may never
/// drain more than is present. At the destination the moved fraction merges
/// into an existing entry for the same batch (volume-weighted ABV, additive
/// value) or lands as a new entry in the requested unit.
pub fn transfer_batch_contents(
    source: &mut Vessel,
    dest: &mut Vessel,
    batch: &BatchId,
    volume: f64,
    volume_unit: &Unit,
) -> Result<TransferReceipt, TransferError> {
    if volume <= 0.0 {
        return Err(TransferError::InvalidVolume(volume));
    }

    let idx = source
        .find_content(batch)
        .filter(|&i| source.contents[i].volume > 0.0)
        .ok_or_else(|| TransferError::BatchNotPresent {
            batch: batch.clone(),
        })?;

    let entry_unit = source.contents[idx].volume_unit.clone();
    let entry_volume = source.contents[idx].volume;
    let entry_abv = source.contents[idx].abv;

    let requested = convert(volume, volume_unit, &entry_unit);
    let actual = requested.min(entry_volume);
    let ratio = actual / entry_volume;
    let moved_value = source.contents[idx].value * ratio;

    source.contents[idx].volume -= actual;
    source.contents[idx].value -= moved_value;

    match dest.find_content(batch) {
        Some(existing_idx) => {
            let existing = &mut dest.contents[existing_idx];
            let moved_here = convert(actual, &entry_unit, &existing.volume_unit);
            let combined = existing.volume + moved_here;
            if combined > 0.0 {
                existing.abv =
                    (existing.abv * existing.volume + entry_abv * moved_here) / combined;
            }
            existing.volume = combined;
            existing.value += moved_value;
        }
        None => {
            dest.contents.push(ContentEntry::new(
                batch.clone(),
                convert(actual, &entry_unit, volume_unit),
                volume_unit.clone(),
                entry_abv,
                moved_value,
            ));
        }
    }

    finish(source, dest);
    Ok(TransferReceipt {
        volume: convert(actual, &entry_unit, volume_unit),
        volume_unit: volume_unit.clone(),
        value: moved_value,
        entries: 1,
    })
}

/// Prunes, recomputes, and touches both vessels after a mutation
fn finish(source: &mut Vessel, dest: &mut Vessel) {
    let now = Utc::now();
    source.prune_empty();
    dest.prune_empty();
    source.recompute();
    dest.recompute();
    source.updated_at = now;
    dest.updated_at = now;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::VesselId;
    use crate::domain::vessel::{VesselKind, VesselStats};

    fn tank(name: &str, capacity: f64) -> Vessel {
        let id = VesselId::new(name, Utc::now());
        Vessel::new(
            id,
            name,
            VesselKind::Tank,
            VesselStats::volume_capacity(capacity, "gal"),
        )
    }

    fn batch_id(name: &str) -> BatchId {
        BatchId::new(name, Utc::now())
    }

    #[test]
    fn full_transfer_concatenates_and_empties() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);

        let b1 = batch_id("B1");
        let b2 = batch_id("B2");
        let b3 = batch_id("B3");
        dest.add_content(ContentEntry::new(b3.clone(), 30.0, "gal", 45.0, 300.0));
        source.add_content(ContentEntry::new(b1.clone(), 100.0, "gal", 40.0, 1000.0));
        source.add_content(ContentEntry::new(b2.clone(), 50.0, "gal", 70.0, 800.0));

        let receipt = full_transfer(&mut source, &mut dest).unwrap();

        assert!(source.contents.is_empty());
        assert_eq!(source.current.volume, 0.0);
        assert_eq!(dest.contents.len(), 3);
        assert_eq!(dest.contents[0].batch, b3);
        assert_eq!(dest.contents[1].batch, b1);
        assert_eq!(dest.contents[2].batch, b2);
        assert_eq!(dest.current.volume, 180.0);
        assert_eq!(dest.current.value, 2100.0);

        assert_eq!(receipt.volume, 150.0);
        assert_eq!(receipt.value, 1800.0);
        assert_eq!(receipt.entries, 2);
    }

    #[test]
    fn full_transfer_of_empty_source_is_an_error() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);

        assert_eq!(
            full_transfer(&mut source, &mut dest),
            Err(TransferError::EmptySource)
        );
        assert!(dest.contents.is_empty());
    }

    #[test]
    fn proportional_split_reduces_source_and_credits_dest() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        let b1 = batch_id("B1");
        source.add_content(ContentEntry::new(b1.clone(), 60.0, "gal", 40.0, 600.0));

        let receipt =
            transfer_proportional(&mut source, &mut dest, 20.0, &Unit::from("gal")).unwrap();

        assert_eq!(source.contents.len(), 1);
        assert!((source.contents[0].volume - 40.0).abs() < 1e-9);
        assert!((source.contents[0].value - 400.0).abs() < 1e-9);

        assert_eq!(dest.contents.len(), 1);
        assert_eq!(dest.contents[0].batch, b1);
        assert!((dest.contents[0].volume - 20.0).abs() < 1e-9);
        assert!((dest.contents[0].value - 200.0).abs() < 1e-9);
        assert_eq!(dest.contents[0].abv, 40.0);

        assert!((receipt.value - 200.0).abs() < 1e-9);
    }

    #[test]
    fn proportional_spreads_across_all_entries() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        source.add_content(ContentEntry::new(batch_id("B1"), 100.0, "gal", 40.0, 1000.0));
        source.add_content(ContentEntry::new(batch_id("B2"), 50.0, "gal", 70.0, 500.0));

        transfer_proportional(&mut source, &mut dest, 30.0, &Unit::from("gal")).unwrap();

        // Ratio 0.2 applied uniformly
        assert!((source.contents[0].volume - 80.0).abs() < 1e-9);
        assert!((source.contents[1].volume - 40.0).abs() < 1e-9);
        assert!((dest.contents[0].volume - 20.0).abs() < 1e-9);
        assert!((dest.contents[1].volume - 10.0).abs() < 1e-9);
        assert!((dest.current.volume - 30.0).abs() < 1e-9);
    }

    #[test]
    fn proportional_keeps_each_entrys_own_unit() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        source.add_content(ContentEntry::new(batch_id("B1"), 1.0, "gal", 40.0, 100.0));
        // Exactly one more gallon, recorded in liters
        source.add_content(ContentEntry::new(
            batch_id("B2"),
            3.785411784,
            "L",
            40.0,
            100.0,
        ));

        transfer_proportional(&mut source, &mut dest, 1.0, &Unit::from("gal")).unwrap();

        assert_eq!(dest.contents[0].volume_unit.as_str(), "gal");
        assert_eq!(dest.contents[1].volume_unit.as_str(), "L");
        assert!((dest.contents[0].volume - 0.5).abs() < 1e-9);
        assert!((dest.contents[1].volume - 1.892705892).abs() < 1e-9);
        assert!((dest.current.volume - 1.0).abs() < 1e-9);
    }

    #[test]
    fn proportional_from_empty_source_leaves_both_unchanged() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        dest.add_content(ContentEntry::new(batch_id("B1"), 10.0, "gal", 40.0, 100.0));

        let source_before = source.clone();
        let dest_before = dest.clone();

        let result = transfer_proportional(&mut source, &mut dest, 5.0, &Unit::from("gal"));

        assert_eq!(result, Err(TransferError::EmptySource));
        assert_eq!(source, source_before);
        assert_eq!(dest, dest_before);
    }

    #[test]
    fn proportional_over_ask_is_an_error() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        source.add_content(ContentEntry::new(batch_id("B1"), 10.0, "gal", 40.0, 100.0));

        let source_before = source.clone();
        let result = transfer_proportional(&mut source, &mut dest, 25.0, &Unit::from("gal"));

        assert!(matches!(
            result,
            Err(TransferError::InsufficientVolume { .. })
        ));
        assert_eq!(source, source_before);
        assert!(dest.contents.is_empty());
    }

    #[test]
    fn proportional_drain_moves_entries_whole() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        source.add_content(ContentEntry::new(batch_id("B1"), 40.0, "gal", 40.0, 400.0));
        source.add_content(ContentEntry::new(batch_id("B2"), 20.0, "gal", 60.0, 300.0));

        let receipt =
            transfer_proportional(&mut source, &mut dest, 60.0, &Unit::from("gal")).unwrap();

        assert!(source.contents.is_empty());
        assert_eq!(dest.contents.len(), 2);
        assert_eq!(dest.contents[0].volume, 40.0);
        assert_eq!(dest.contents[0].value, 400.0);
        assert_eq!(dest.contents[1].value, 300.0);
        assert!((receipt.value - 700.0).abs() < 1e-9);
        assert!(receipt.value.is_finite());
    }

    #[test]
    fn proportional_rejects_nonpositive_volume() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        source.add_content(ContentEntry::new(batch_id("B1"), 10.0, "gal", 40.0, 100.0));

        assert_eq!(
            transfer_proportional(&mut source, &mut dest, 0.0, &Unit::from("gal")),
            Err(TransferError::InvalidVolume(0.0))
        );
        assert_eq!(
            transfer_proportional(&mut source, &mut dest, -5.0, &Unit::from("gal")),
            Err(TransferError::InvalidVolume(-5.0))
        );
    }

    #[test]
    fn batch_targeted_moves_one_fraction() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        let b1 = batch_id("B1");
        let b2 = batch_id("B2");
        source.add_content(ContentEntry::new(b1.clone(), 100.0, "gal", 40.0, 1000.0));
        source.add_content(ContentEntry::new(b2.clone(), 50.0, "gal", 70.0, 500.0));

        let receipt =
            transfer_batch_contents(&mut source, &mut dest, &b1, 25.0, &Unit::from("gal"))
                .unwrap();

        // Only B1 is touched
        assert!((source.contents[0].volume - 75.0).abs() < 1e-9);
        assert!((source.contents[0].value - 750.0).abs() < 1e-9);
        assert_eq!(source.contents[1].volume, 50.0);

        assert_eq!(dest.contents.len(), 1);
        assert_eq!(dest.contents[0].batch, b1);
        assert!((dest.contents[0].volume - 25.0).abs() < 1e-9);
        assert_eq!(dest.contents[0].abv, 40.0);
        assert!((dest.contents[0].value - 250.0).abs() < 1e-9);

        assert!((receipt.volume - 25.0).abs() < 1e-9);
        assert_eq!(receipt.entries, 1);
    }

    #[test]
    fn batch_targeted_clamps_at_available_volume() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        let b1 = batch_id("B1");
        source.add_content(ContentEntry::new(b1.clone(), 10.0, "gal", 40.0, 100.0));

        let receipt =
            transfer_batch_contents(&mut source, &mut dest, &b1, 15.0, &Unit::from("gal"))
                .unwrap();

        assert!((receipt.volume - 10.0).abs() < 1e-9);
        assert!(source.contents.is_empty(), "drained entry must be pruned");
        assert!((dest.contents[0].volume - 10.0).abs() < 1e-9);
        assert!((dest.contents[0].value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn batch_targeted_merges_into_existing_entry() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        let b1 = batch_id("B1");
        source.add_content(ContentEntry::new(b1.clone(), 50.0, "gal", 70.0, 500.0));
        dest.add_content(ContentEntry::new(b1.clone(), 100.0, "gal", 40.0, 1000.0));

        transfer_batch_contents(&mut source, &mut dest, &b1, 50.0, &Unit::from("gal")).unwrap();

        assert_eq!(dest.contents.len(), 1, "same batch merges, never duplicates");
        assert!((dest.contents[0].volume - 150.0).abs() < 1e-9);
        assert!((dest.contents[0].abv - 50.0).abs() < 1e-9);
        assert!((dest.contents[0].value - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn batch_targeted_converts_request_units() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        let b1 = batch_id("B1");
        source.add_content(ContentEntry::new(b1.clone(), 10.0, "gal", 40.0, 100.0));

        // One gallon asked for in liters
        transfer_batch_contents(&mut source, &mut dest, &b1, 3.785411784, &Unit::from("L"))
            .unwrap();

        assert!((source.contents[0].volume - 9.0).abs() < 1e-9);
        assert_eq!(dest.contents[0].volume_unit.as_str(), "L");
        assert!((dest.contents[0].volume - 3.785411784).abs() < 1e-9);
        assert!((dest.current.volume - 1.0).abs() < 1e-9);
    }

    #[test]
    fn batch_targeted_missing_batch_is_an_error() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        source.add_content(ContentEntry::new(batch_id("B1"), 10.0, "gal", 40.0, 100.0));

        let absent = batch_id("B2");
        let source_before = source.clone();

        let result =
            transfer_batch_contents(&mut source, &mut dest, &absent, 5.0, &Unit::from("gal"));

        assert_eq!(
            result,
            Err(TransferError::BatchNotPresent {
                batch: absent.clone()
            })
        );
        assert_eq!(source, source_before);
        assert!(dest.contents.is_empty());
    }

    #[test]
    fn batch_targeted_epsilon_prunes_drained_entry() {
        let mut source = tank("Source", 500.0);
        let mut dest = tank("Dest", 500.0);
        let b1 = batch_id("B1");
        source.add_content(ContentEntry::new(b1.clone(), 10.0, "gal", 40.0, 100.0));

        transfer_batch_contents(&mut source, &mut dest, &b1, 9.9995, &Unit::from("gal")).unwrap();

        assert!(
            !source.has_batch(&b1),
            "entry below epsilon must vanish, not linger at ~0"
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn proportional_transfer_conserves_volume_and_value(
                v1 in 1.0f64..500.0,
                v2 in 1.0f64..500.0,
                frac in 0.01f64..0.95,
            ) {
                let mut source = tank("Source", 0.0);
                source.stats = VesselStats::default();
                let mut dest = tank("Dest", 0.0);
                dest.stats = VesselStats::default();

                source.add_content(ContentEntry::new(batch_id("B1"), v1, "gal", 40.0, v1 * 10.0));
                source.add_content(ContentEntry::new(batch_id("B2"), v2, "gal", 65.0, v2 * 12.0));

                let total_before = source.contents_volume_in(&Unit::from("gal"));
                let value_before = source.current.value;
                let ask = total_before * frac;

                transfer_proportional(&mut source, &mut dest, ask, &Unit::from("gal")).unwrap();

                let total_after = source.contents_volume_in(&Unit::from("gal"))
                    + dest.contents_volume_in(&Unit::from("gal"));
                let value_after = source.current.value + dest.current.value;

                prop_assert!((total_after - total_before).abs() < 1e-6);
                prop_assert!((value_after - value_before).abs() < 1e-6);
                prop_assert!((dest.current.volume - ask).abs() < 1e-6);
            }

            #[test]
            fn batch_targeted_never_overdraws(
                held in 1.0f64..200.0,
                ask in 1.0f64..400.0,
            ) {
                let mut source = tank("Source", 500.0);
                let mut dest = tank("Dest", 500.0);
                let b1 = batch_id("B1");
                source.add_content(ContentEntry::new(b1.clone(), held, "gal", 55.0, held * 9.0));

                let receipt =
                    transfer_batch_contents(&mut source, &mut dest, &b1, ask, &Unit::from("gal"))
                        .unwrap();

                prop_assert!(receipt.volume <= held + 1e-9);
                prop_assert!(dest.current.volume <= held + 1e-9);
                for entry in &source.contents {
                    prop_assert!(entry.volume >= VOLUME_EPSILON);
                }
            }
        }
    }
}
