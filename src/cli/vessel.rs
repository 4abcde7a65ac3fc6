//! Vessel CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{
    convert, full_transfer, transfer_batch_contents, transfer_proportional, BarrelDetails,
    BatchId, ContentEntry, TransferError, Unit, Vessel, VesselId, VesselKind, VesselStats,
};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum VesselCommands {
    /// Register a new vessel
    Add {
        /// Vessel name
        name: String,

        /// Vessel kind (mash-tun, fermenter, still, tank, barrel)
        #[arg(long, short = 'k')]
        kind: String,

        /// Nominal capacity volume
        #[arg(long, short = 'c')]
        capacity: Option<f64>,

        /// Capacity unit (default: project default unit)
        #[arg(long, short = 'u')]
        unit: Option<String>,

        /// Barrel size in gallons (barrels only)
        #[arg(long)]
        barrel_size: Option<f64>,

        /// Barrel char level, e.g. "#3" (barrels only)
        #[arg(long)]
        char: Option<String>,

        /// Barrel purchase cost (barrels only)
        #[arg(long)]
        cost: Option<f64>,
    },

    /// List vessels
    List {
        /// Filter by kind
        #[arg(long, short = 'k')]
        kind: Option<String>,

        /// Show only vessels currently holding contents
        #[arg(long)]
        filled: bool,
    },

    /// Show vessel details
    Show {
        /// Vessel ID
        id: String,
    },

    /// Add a batch's volume into a vessel
    Fill {
        /// Vessel ID
        vessel: String,

        /// Batch ID
        batch: String,

        /// Volume to add
        volume: f64,

        /// Volume unit (default: batch unit)
        #[arg(long, short = 'u')]
        unit: Option<String>,

        /// ABV of the added spirit (default: batch ABV)
        #[arg(long)]
        abv: Option<f64>,

        /// Value attributed to the fill (default: batch value share)
        #[arg(long)]
        value: Option<f64>,
    },

    /// Move contents between vessels
    ///
    /// With no flags the whole vessel moves. `--volume` draws the stated
    /// amount proportionally from every entry; `--batch` moves only that
    /// batch's fraction.
    Transfer {
        /// Source vessel ID
        source: String,

        /// Destination vessel ID
        dest: String,

        /// Volume to move (default: everything)
        #[arg(long)]
        volume: Option<f64>,

        /// Volume unit (default: source vessel unit)
        #[arg(long, short = 'u')]
        unit: Option<String>,

        /// Move only this batch's contents
        #[arg(long, short = 'b')]
        batch: Option<String>,
    },

    /// Empty a vessel, capturing barrel reuse provenance
    Empty {
        /// Vessel ID
        id: String,
    },
}

pub fn run(cmd: VesselCommands, output: &Output) -> Result<()> {
    match cmd {
        VesselCommands::Add {
            name,
            kind,
            capacity,
            unit,
            barrel_size,
            char,
            cost,
        } => add_vessel(
            output,
            &name,
            &kind,
            capacity,
            unit.as_deref(),
            barrel_size,
            char,
            cost,
        ),
        VesselCommands::List { kind, filled } => list_vessels(output, kind.as_deref(), filled),
        VesselCommands::Show { id } => show_vessel(output, &id),
        VesselCommands::Fill {
            vessel,
            batch,
            volume,
            unit,
            abv,
            value,
        } => fill_vessel(output, &vessel, &batch, volume, unit.as_deref(), abv, value),
        VesselCommands::Transfer {
            source,
            dest,
            volume,
            unit,
            batch,
        } => transfer(
            output,
            &source,
            &dest,
            volume,
            unit.as_deref(),
            batch.as_deref(),
        ),
        VesselCommands::Empty { id } => empty_vessel(output, &id),
    }
}

#[allow(clippy::too_many_arguments)]
fn add_vessel(
    output: &Output,
    name: &str,
    kind_str: &str,
    capacity: Option<f64>,
    unit: Option<&str>,
    barrel_size: Option<f64>,
    char_level: Option<String>,
    cost: Option<f64>,
) -> Result<()> {
    use chrono::Utc;

    let project = Project::open_current()?;
    let store = project.vessel_store();

    let kind: VesselKind = kind_str.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    if kind != VesselKind::Barrel
        && (barrel_size.is_some() || char_level.is_some() || cost.is_some())
    {
        anyhow::bail!("Barrel options only apply to barrel vessels");
    }

    if let Some(volume) = capacity {
        if volume <= 0.0 {
            anyhow::bail!("Capacity must be positive (got {})", volume);
        }
    }

    let unit = unit
        .map(Unit::from)
        .unwrap_or_else(|| project.config().project.default_volume_unit.clone());

    let stats = match capacity {
        Some(volume) => VesselStats::volume_capacity(volume, unit),
        None => VesselStats::default(),
    };

    let mut vessel = Vessel::new(VesselId::new(name, Utc::now()), name, kind, stats);
    if kind == VesselKind::Barrel {
        vessel.barrel = Some(BarrelDetails {
            size: barrel_size,
            char_level,
            cost,
        });
    }

    store.append(&vessel)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": vessel.id.to_string(),
            "name": vessel.name,
            "kind": vessel.kind,
        }));
    } else {
        output.success(&format!(
            "Registered {}: {} ({})",
            vessel.kind, vessel.id, vessel.name
        ));
    }

    Ok(())
}

fn list_vessels(output: &Output, kind_filter: Option<&str>, filled_only: bool) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.vessel_store();

    let kind = kind_filter
        .map(|k| k.parse::<VesselKind>())
        .transpose()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let vessels = store.read_all()?;
    let mut selected: Vec<_> = vessels
        .values()
        .filter(|v| kind.map_or(true, |k| v.kind == k))
        .filter(|v| !filled_only || !v.is_empty())
        .collect();
    selected.sort_by(|a, b| a.name.cmp(&b.name));

    if output.is_json() {
        let items: Vec<_> = selected
            .iter()
            .map(|v| {
                serde_json::json!({
                    "id": v.id.to_string(),
                    "name": v.name,
                    "kind": v.kind,
                    "volume": v.current.volume,
                    "volume_unit": v.current.volume_unit,
                    "abv": v.current.abv,
                    "value": v.current.value,
                    "is_used": v.is_used,
                })
            })
            .collect();
        output.data(&items);
    } else if selected.is_empty() {
        println!("No vessels found.");
    } else {
        println!("{:<12} {:<20} {:<10} CONTENTS", "ID", "NAME", "KIND");
        println!("{}", "-".repeat(70));
        for vessel in selected {
            let contents = if vessel.is_empty() {
                "empty".to_string()
            } else {
                format!(
                    "{:.1} {} @ {:.1}% ABV",
                    vessel.current.volume, vessel.current.volume_unit, vessel.current.abv
                )
            };
            println!(
                "{:<12} {:<20} {:<10} {}",
                vessel.id.to_string(),
                vessel.name,
                vessel.kind.to_string(),
                contents
            );
        }
    }

    Ok(())
}

fn show_vessel(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.vessel_store();

    let id: VesselId = id_str.parse()?;
    let vessels = store.read_all()?;

    let vessel = vessels
        .get(&id)
        .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", id))?;

    let batches = project.batch_store().read_all()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": vessel.id.to_string(),
            "name": vessel.name,
            "kind": vessel.kind,
            "stats": vessel.stats,
            "contents": vessel.contents,
            "current": vessel.current,
            "capacity_used": vessel.capacity_used(),
            "wine_gallons": vessel.current.wine_gallons(),
            "proof_gallons": vessel.current.proof_gallons(),
            "barrel": vessel.barrel,
            "is_used": vessel.is_used,
            "previous_contents": vessel.previous_contents,
            "created_at": vessel.created_at,
            "updated_at": vessel.updated_at,
        }));
    } else {
        println!("Vessel: {} ({})", vessel.id, vessel.kind);
        println!("Name: {}", vessel.name);
        if vessel.stats.volume > 0.0 {
            println!(
                "Capacity: {} {}",
                vessel.stats.volume, vessel.stats.volume_unit
            );
        }
        if let Some(pct) = vessel.capacity_used() {
            println!("Filled: {:.1}%", pct);
        }
        if let Some(barrel) = &vessel.barrel {
            if let Some(size) = barrel.size {
                println!("Barrel size: {} gal", size);
            }
            if let Some(char_level) = &barrel.char_level {
                println!("Char: {}", char_level);
            }
            if let Some(cost) = barrel.cost {
                println!("Cost: ${:.2}", cost);
            }
        }
        if vessel.is_used {
            match &vessel.previous_contents {
                Some(previous) => println!("Used barrel (previously held {})", previous),
                None => println!("Used barrel"),
            }
        }
        println!("Created: {}", vessel.created_at.format("%Y-%m-%d %H:%M"));
        println!("Updated: {}", vessel.updated_at.format("%Y-%m-%d %H:%M"));

        if vessel.contents.is_empty() {
            println!("\nEmpty.");
        } else {
            println!("\nContents ({} entries):", vessel.contents.len());
            for entry in &vessel.contents {
                let batch_name = batches
                    .get(&entry.batch)
                    .map(|b| b.name.as_str())
                    .unwrap_or("?");
                println!(
                    "  {:.2} {} @ {:.1}% ABV (${:.2}) - {} [{}]",
                    entry.volume, entry.volume_unit, entry.abv, entry.value, batch_name, entry.batch
                );
            }
            println!(
                "\nCurrent: {:.2} {} @ {:.1}% ABV (${:.2})",
                vessel.current.volume,
                vessel.current.volume_unit,
                vessel.current.abv,
                vessel.current.value
            );
            println!("Wine gallons: {:.2}", vessel.current.wine_gallons());
            println!("Proof gallons: {:.2}", vessel.current.proof_gallons());
        }
    }

    Ok(())
}

fn fill_vessel(
    output: &Output,
    vessel_str: &str,
    batch_str: &str,
    volume: f64,
    unit: Option<&str>,
    abv: Option<f64>,
    value: Option<f64>,
) -> Result<()> {
    let project = Project::open_current()?;
    let vessel_store = project.vessel_store();

    if volume <= 0.0 {
        anyhow::bail!("Fill volume must be positive (got {})", volume);
    }

    let vessel_id: VesselId = vessel_str.parse()?;
    let batch_id: BatchId = batch_str.parse()?;

    let mut vessels = vessel_store.read_all()?;
    let batches = project.batch_store().read_all()?;

    let vessel = vessels
        .get_mut(&vessel_id)
        .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", vessel_id))?;
    let batch = batches
        .get(&batch_id)
        .ok_or_else(|| anyhow::anyhow!("Batch not found: {}", batch_id))?;

    let unit = unit
        .map(Unit::from)
        .unwrap_or_else(|| batch.volume_unit.clone());
    let abv = abv.unwrap_or(batch.abv);
    let value = value.unwrap_or_else(|| {
        let total = batch.total_volume();
        if total > 0.0 {
            batch.value * convert(volume, &unit, &batch.volume_unit) / total
        } else {
            0.0
        }
    });

    vessel.add_content(ContentEntry::new(
        batch_id.clone(),
        volume,
        unit.clone(),
        abv,
        value,
    ));
    vessel_store.update(vessel)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "vessel": vessel.id.to_string(),
            "batch": batch_id.to_string(),
            "volume": volume,
            "volume_unit": unit,
            "abv": abv,
            "value": value,
            "current": vessel.current,
        }));
    } else {
        output.success(&format!(
            "Filled {} with {:.2} {} of {}",
            vessel.name, volume, unit, batch.name
        ));
    }

    Ok(())
}

fn transfer(
    output: &Output,
    source_str: &str,
    dest_str: &str,
    volume: Option<f64>,
    unit: Option<&str>,
    batch: Option<&str>,
) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.vessel_store();

    let source_id: VesselId = source_str.parse()?;
    let dest_id: VesselId = dest_str.parse()?;

    if source_id == dest_id {
        anyhow::bail!("Source and destination are the same vessel");
    }

    let mut vessels = store.read_all()?;
    let mut source = vessels
        .remove(&source_id)
        .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", source_id))?;
    let mut dest = vessels
        .remove(&dest_id)
        .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", dest_id))?;

    let receipt = match (batch, volume) {
        (Some(batch_str), volume) => {
            let batch_id: BatchId = batch_str.parse()?;
            let (volume, unit) = match volume {
                Some(v) => (v, resolve_unit(unit, &source, &project)),
                None => {
                    // No stated volume: move the batch's whole fraction
                    let idx = source.find_content(&batch_id).ok_or_else(|| {
                        TransferError::BatchNotPresent {
                            batch: batch_id.clone(),
                        }
                    })?;
                    (
                        source.contents[idx].volume,
                        source.contents[idx].volume_unit.clone(),
                    )
                }
            };
            output.verbose_ctx(
                "transfer",
                &format!("Batch-targeted: {:.3} {} of {}", volume, unit, batch_id),
            );
            transfer_batch_contents(&mut source, &mut dest, &batch_id, volume, &unit)?
        }
        (None, Some(volume)) => {
            let unit = resolve_unit(unit, &source, &project);
            output.verbose_ctx("transfer", &format!("Proportional: {:.3} {}", volume, unit));
            transfer_proportional(&mut source, &mut dest, volume, &unit)?
        }
        (None, None) => {
            output.verbose_ctx("transfer", "Full transfer");
            full_transfer(&mut source, &mut dest)?
        }
    };

    // Both vessels land in one atomic rewrite
    store.update_many([&source, &dest])?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "source": source.id.to_string(),
            "dest": dest.id.to_string(),
            "moved": receipt,
            "source_current": source.current,
            "dest_current": dest.current,
        }));
    } else {
        output.success(&format!(
            "Transferred {:.2} {} (${:.2}) from {} to {}",
            receipt.volume, receipt.volume_unit, receipt.value, source.name, dest.name
        ));
    }

    Ok(())
}

/// Unit precedence for transfer requests: explicit flag, then the source
/// vessel's snapshot unit, then the project default
fn resolve_unit(unit: Option<&str>, source: &Vessel, project: &Project) -> Unit {
    match unit {
        Some(u) => Unit::from(u),
        None => {
            if source.current.volume_unit.is_empty() {
                project.config().project.default_volume_unit.clone()
            } else {
                source.current.volume_unit.clone()
            }
        }
    }
}

fn empty_vessel(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.vessel_store();

    let id: VesselId = id_str.parse()?;
    let mut vessels = store.read_all()?;

    let vessel = vessels
        .get_mut(&id)
        .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", id))?;

    if vessel.is_empty() {
        anyhow::bail!("Vessel {} is already empty", vessel.name);
    }

    let drained = vessel.current.clone();
    let batches = project.batch_store().read_all()?;
    let recipes = project.recipe_store().read_all()?;

    vessel.empty_contents(&batches, &recipes);
    store.update(vessel)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": vessel.id.to_string(),
            "drained_volume": drained.volume,
            "drained_unit": drained.volume_unit,
            "is_used": vessel.is_used,
            "previous_contents": vessel.previous_contents,
        }));
    } else {
        output.success(&format!(
            "Emptied {} ({:.2} {} removed)",
            vessel.name, drained.volume, drained.volume_unit
        ));
        if vessel.kind == VesselKind::Barrel {
            match &vessel.previous_contents {
                Some(previous) => println!("Barrel marked used (held {})", previous),
                None => println!("Barrel marked used"),
            }
        }
    }

    Ok(())
}
