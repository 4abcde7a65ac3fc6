//! Batch CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::Output;
use crate::domain::{
    convert, transfer_batch_contents, Batch, BatchId, BatchVolumeModel, ContentEntry, Pipeline,
    RecipeId, Stage, Unit, Vessel, VesselId,
};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum BatchCommands {
    /// Start a new batch from a recipe
    Start {
        /// Recipe ID
        recipe: String,

        /// Batch size (volume entering the first stage)
        #[arg(long, short = 's')]
        size: f64,

        /// Volume unit (default: project default unit)
        #[arg(long, short = 'u')]
        unit: Option<String>,

        /// Batch name (default: "<recipe name> #<n>")
        #[arg(long, short = 'n')]
        name: Option<String>,

        /// Expected ABV of the batch
        #[arg(long, default_value = "0")]
        abv: f64,

        /// Input cost attributed to the batch
        #[arg(long, default_value = "0")]
        value: f64,

        /// Vessel to deposit the first-stage contents into
        #[arg(long)]
        vessel: Option<String>,
    },

    /// List batches
    List {
        /// Include bottled batches
        #[arg(long)]
        all: bool,
    },

    /// Show batch details
    Show {
        /// Batch ID
        id: String,
    },

    /// Move batch volume to the next stage of its recipe pipeline
    ///
    /// Advancing less than the full stage volume records a split (heads and
    /// tails staying behind, a partial barrel fill). Pair `--source` and
    /// `--dest` to move the physical contents along with the ledger.
    Advance {
        /// Batch ID
        id: String,

        /// Volume to advance (default: everything at the stage)
        #[arg(long)]
        volume: Option<f64>,

        /// Volume unit (default: batch unit)
        #[arg(long, short = 'u')]
        unit: Option<String>,

        /// Stage to advance from (default: furthest active stage)
        #[arg(long)]
        from: Option<String>,

        /// Vessel the volume physically leaves
        #[arg(long)]
        source: Option<String>,

        /// Vessel the volume physically enters
        #[arg(long)]
        dest: Option<String>,
    },

    /// Set the volume recorded at a stage (documented losses or additions)
    Adjust {
        /// Batch ID
        id: String,

        /// Stage name
        stage: String,

        /// New volume at the stage
        volume: f64,

        /// Volume unit (default: batch unit)
        #[arg(long, short = 'u')]
        unit: Option<String>,
    },
}

pub fn run(cmd: BatchCommands, output: &Output) -> Result<()> {
    match cmd {
        BatchCommands::Start {
            recipe,
            size,
            unit,
            name,
            abv,
            value,
            vessel,
        } => start_batch(
            output,
            &recipe,
            size,
            unit.as_deref(),
            name,
            abv,
            value,
            vessel.as_deref(),
        ),
        BatchCommands::List { all } => list_batches(output, all),
        BatchCommands::Show { id } => show_batch(output, &id),
        BatchCommands::Advance {
            id,
            volume,
            unit,
            from,
            source,
            dest,
        } => advance_batch(
            output,
            &id,
            volume,
            unit.as_deref(),
            from.as_deref(),
            source.as_deref(),
            dest.as_deref(),
        ),
        BatchCommands::Adjust {
            id,
            stage,
            volume,
            unit,
        } => adjust_batch(output, &id, &stage, volume, unit.as_deref()),
    }
}

/// Fails unless the vessel's kind matches what the stage calls for
fn ensure_stage_vessel(vessel: &Vessel, stage: Stage) -> Result<()> {
    if vessel.accepts_stage(stage) {
        return Ok(());
    }
    match stage.required_vessel() {
        Some(required) => anyhow::bail!(
            "{} is a {}; the {} stage needs a {}",
            vessel.name,
            vessel.kind,
            stage,
            required
        ),
        None => anyhow::bail!("The {} stage does not take a vessel", stage),
    }
}

#[allow(clippy::too_many_arguments)]
fn start_batch(
    output: &Output,
    recipe_str: &str,
    size: f64,
    unit: Option<&str>,
    name: Option<String>,
    abv: f64,
    value: f64,
    vessel: Option<&str>,
) -> Result<()> {
    use chrono::Utc;

    let project = Project::open_current()?;
    let batch_store = project.batch_store();

    if size <= 0.0 {
        anyhow::bail!("Batch size must be positive (got {})", size);
    }

    let recipe_id: RecipeId = recipe_str.parse()?;
    let recipe = project
        .recipe_store()
        .read(&recipe_id)?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found: {}", recipe_id))?;

    let unit = unit
        .map(Unit::from)
        .unwrap_or_else(|| project.config().project.default_volume_unit.clone());

    let batches = batch_store.read_all()?;
    let name = name.unwrap_or_else(|| {
        let n = batches.values().filter(|b| b.recipe == recipe_id).count() + 1;
        format!("{} #{}", recipe.name, n)
    });

    let mut batch = Batch::new(
        BatchId::new(&name, Utc::now()),
        &name,
        recipe_id.clone(),
        size,
        unit.clone(),
        abv,
        value,
    );

    // The whole size enters the first pipeline stage right away; volume sits
    // at "Upcoming" only when the recipe has an empty custom pipeline.
    let first_stage = recipe.pipeline.first_stage();
    if let Some(first) = first_stage {
        batch.move_volume(Stage::Upcoming, first, size);
    }

    if let Some(vessel_str) = vessel {
        let first = first_stage.ok_or_else(|| {
            anyhow::anyhow!("Recipe {} has an empty pipeline; nothing to deposit", recipe.name)
        })?;

        let vessel_store = project.vessel_store();
        let vessel_id: VesselId = vessel_str.parse()?;
        let mut vessels = vessel_store.read_all()?;
        let vessel = vessels
            .get_mut(&vessel_id)
            .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", vessel_id))?;

        ensure_stage_vessel(vessel, first)?;
        vessel.add_content(ContentEntry::new(
            batch.id.clone(),
            size,
            unit.clone(),
            abv,
            value,
        ));
        vessel_store.update(vessel)?;
        output.verbose_ctx(
            "batch",
            &format!("Deposited {:.2} {} into {}", size, unit, vessel.name),
        );
    }

    batch_store.append(&batch)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": batch.id.to_string(),
            "name": batch.name,
            "recipe": recipe_id.to_string(),
            "size": size,
            "volume_unit": unit,
            "stage": first_stage.map(|s| s.to_string()),
        }));
    } else {
        match first_stage {
            Some(stage) => output.success(&format!(
                "Started batch: {} - {} ({:.2} {} at {})",
                batch.id, batch.name, size, unit, stage
            )),
            None => output.success(&format!(
                "Started batch: {} - {} ({:.2} {}, awaiting a pipeline)",
                batch.id, batch.name, size, unit
            )),
        }
    }

    Ok(())
}

fn list_batches(output: &Output, all: bool) -> Result<()> {
    let project = Project::open_current()?;

    let batches = project.batch_store().read_all()?;
    let recipes = project.recipe_store().read_all()?;

    let mut selected: Vec<_> = batches.values().filter(|b| all || !b.is_bottled()).collect();
    selected.sort_by(|a, b| a.name.cmp(&b.name));

    if output.is_json() {
        let items: Vec<_> = selected
            .iter()
            .map(|b| {
                serde_json::json!({
                    "id": b.id.to_string(),
                    "name": b.name,
                    "recipe": b.recipe.to_string(),
                    "total_volume": b.total_volume(),
                    "volume_unit": b.volume_unit,
                    "active_stages": b.active_stages().iter().map(|s| s.to_string()).collect::<Vec<_>>(),
                    "bottled": b.is_bottled(),
                })
            })
            .collect();
        output.data(&items);
    } else if selected.is_empty() {
        println!("No batches found.");
    } else {
        println!("{:<12} {:<24} {:<14} VOLUME", "ID", "NAME", "STAGE");
        println!("{}", "-".repeat(64));
        for batch in selected {
            let pipeline = recipes
                .get(&batch.recipe)
                .map(|r| r.pipeline.clone())
                .unwrap_or_else(|| Pipeline::new(Vec::new()));
            let stage = batch
                .furthest_stage(&pipeline)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<12} {:<24} {:<14} {:.1} {}",
                batch.id.to_string(),
                batch.name,
                stage,
                batch.total_volume(),
                batch.volume_unit
            );
        }
    }

    Ok(())
}

fn show_batch(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;

    let id: BatchId = id_str.parse()?;
    let batches = project.batch_store().read_all()?;
    let batch = batches
        .get(&id)
        .ok_or_else(|| anyhow::anyhow!("Batch not found: {}", id))?;

    let recipe = project.recipe_store().read(&batch.recipe)?;

    if output.is_json() {
        let stage_volumes: Vec<_> = batch
            .active_stages()
            .iter()
            .map(|s| {
                serde_json::json!({
                    "stage": s.to_string(),
                    "volume": batch.volume_at(*s),
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "id": batch.id.to_string(),
            "name": batch.name,
            "recipe": batch.recipe.to_string(),
            "recipe_name": recipe.as_ref().map(|r| r.name.clone()),
            "total_volume": batch.total_volume(),
            "volume_unit": batch.volume_unit,
            "abv": batch.abv,
            "value": batch.value,
            "stage_volumes": stage_volumes,
            "bottled": batch.is_bottled(),
            "bottled_at": batch.bottled_at,
            "created_at": batch.created_at,
            "updated_at": batch.updated_at,
        }));
    } else {
        println!("Batch: {}", batch.id);
        println!("Name: {}", batch.name);
        match &recipe {
            Some(r) => println!("Recipe: {} ({})", r.name, r.id),
            None => println!("Recipe: {}", batch.recipe),
        }
        println!(
            "Total: {:.2} {} @ {:.1}% ABV (${:.2})",
            batch.total_volume(),
            batch.volume_unit,
            batch.abv,
            batch.value
        );
        if let BatchVolumeModel::Legacy { .. } = &batch.volume {
            println!("Tracking: single-stage (legacy record)");
        }
        println!("Created: {}", batch.created_at.format("%Y-%m-%d %H:%M"));
        println!("Updated: {}", batch.updated_at.format("%Y-%m-%d %H:%M"));
        if let Some(bottled) = batch.bottled_at {
            println!("Bottled: {}", bottled.format("%Y-%m-%d %H:%M"));
        }

        let active = batch.active_stages();
        if !active.is_empty() {
            println!("\nStage volumes:");
            for stage in active {
                println!(
                    "  {:<14} {:.2} {}",
                    stage.to_string(),
                    batch.volume_at(stage),
                    batch.volume_unit
                );
            }
        }
    }

    Ok(())
}

fn advance_batch(
    output: &Output,
    id_str: &str,
    volume: Option<f64>,
    unit: Option<&str>,
    from: Option<&str>,
    source: Option<&str>,
    dest: Option<&str>,
) -> Result<()> {
    let project = Project::open_current()?;
    let batch_store = project.batch_store();

    let id: BatchId = id_str.parse()?;
    let mut batches = batch_store.read_all()?;
    let batch = batches
        .get_mut(&id)
        .ok_or_else(|| anyhow::anyhow!("Batch not found: {}", id))?;

    let recipe = project
        .recipe_store()
        .read(&batch.recipe)?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found: {}", batch.recipe))?;
    let pipeline = &recipe.pipeline;
    if pipeline.is_empty() {
        anyhow::bail!("Recipe {} has an empty pipeline", recipe.name);
    }

    let from_stage = match from {
        Some(s) => s.parse::<Stage>().map_err(|e: String| anyhow::anyhow!(e))?,
        None => batch.furthest_stage(pipeline).ok_or_else(|| {
            anyhow::anyhow!("Batch {} has no volume to advance", batch.name)
        })?,
    };

    let to_stage = if from_stage == Stage::Upcoming {
        // Volume still waiting outside the pipeline enters at the first stage
        pipeline
            .first_stage()
            .ok_or_else(|| anyhow::anyhow!("Recipe {} has an empty pipeline", recipe.name))?
    } else if let Some(next) = pipeline.next_stage(from_stage) {
        next
    } else if pipeline.contains(from_stage) {
        anyhow::bail!(
            "{} is the final stage of the {} pipeline",
            from_stage,
            recipe.name
        );
    } else {
        anyhow::bail!(
            "Stage {} is not part of the {} pipeline",
            from_stage,
            recipe.name
        );
    };

    let available = batch.volume_at(from_stage);
    if available <= 0.0 {
        anyhow::bail!("Batch {} has no volume at {}", batch.name, from_stage);
    }

    let unit = unit
        .map(Unit::from)
        .unwrap_or_else(|| batch.volume_unit.clone());
    let requested = match volume {
        Some(v) if v <= 0.0 => anyhow::bail!("Advance volume must be positive (got {})", v),
        Some(v) => convert(v, &unit, &batch.volume_unit),
        None => available,
    };

    let moved = batch.move_volume(from_stage, to_stage, requested);
    output.verbose_ctx(
        "advance",
        &format!(
            "{}: {:.3} {} from {} to {}",
            batch.name, moved, batch.volume_unit, from_stage, to_stage
        ),
    );

    // Physical movement between vessels, when stated
    let vessel_store = project.vessel_store();
    match (source, dest) {
        (Some(source_str), Some(dest_str)) => {
            let source_id: VesselId = source_str.parse()?;
            let dest_id: VesselId = dest_str.parse()?;
            if source_id == dest_id {
                anyhow::bail!("Source and destination are the same vessel");
            }

            let mut vessels = vessel_store.read_all()?;
            let mut source_vessel = vessels
                .remove(&source_id)
                .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", source_id))?;
            let mut dest_vessel = vessels
                .remove(&dest_id)
                .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", dest_id))?;

            ensure_stage_vessel(&dest_vessel, to_stage)?;
            transfer_batch_contents(
                &mut source_vessel,
                &mut dest_vessel,
                &id,
                moved,
                &batch.volume_unit,
            )?;
            vessel_store.update_many([&source_vessel, &dest_vessel])?;
        }
        (Some(source_str), None) => {
            // No destination vessel: the volume leaves the vessel system
            // (bottling runs, sampling)
            let source_id: VesselId = source_str.parse()?;
            let mut vessels = vessel_store.read_all()?;
            let source_vessel = vessels
                .get_mut(&source_id)
                .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", source_id))?;

            source_vessel
                .draw_content(&id, moved, &batch.volume_unit)
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "Batch {} has no contents in {}",
                        batch.name,
                        source_vessel.name
                    )
                })?;
            vessel_store.update(source_vessel)?;
        }
        (None, Some(dest_str)) => {
            let dest_id: VesselId = dest_str.parse()?;
            let mut vessels = vessel_store.read_all()?;
            let dest_vessel = vessels
                .get_mut(&dest_id)
                .ok_or_else(|| anyhow::anyhow!("Vessel not found: {}", dest_id))?;

            ensure_stage_vessel(dest_vessel, to_stage)?;
            let total = batch.total_volume();
            let share = if total > 0.0 {
                batch.value * moved / total
            } else {
                0.0
            };
            dest_vessel.add_content(ContentEntry::new(
                id.clone(),
                moved,
                batch.volume_unit.clone(),
                batch.abv,
                share,
            ));
            vessel_store.update(dest_vessel)?;
        }
        (None, None) => {}
    }

    batch_store.update(batch)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": batch.id.to_string(),
            "from": from_stage.to_string(),
            "to": to_stage.to_string(),
            "moved": moved,
            "volume_unit": batch.volume_unit,
            "remaining_at_from": batch.volume_at(from_stage),
            "bottled": batch.is_bottled(),
        }));
    } else {
        output.success(&format!(
            "Advanced {:.2} {} of {} from {} to {}",
            moved, batch.volume_unit, batch.name, from_stage, to_stage
        ));
        if batch.is_bottled() {
            println!("Batch complete: all volume bottled.");
        }
    }

    Ok(())
}

fn adjust_batch(
    output: &Output,
    id_str: &str,
    stage_str: &str,
    volume: f64,
    unit: Option<&str>,
) -> Result<()> {
    let project = Project::open_current()?;
    let batch_store = project.batch_store();

    let id: BatchId = id_str.parse()?;
    let stage: Stage = stage_str.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    if volume < 0.0 {
        anyhow::bail!("Stage volume cannot be negative (got {})", volume);
    }

    let mut batches = batch_store.read_all()?;
    let batch = batches
        .get_mut(&id)
        .ok_or_else(|| anyhow::anyhow!("Batch not found: {}", id))?;

    let unit = unit
        .map(Unit::from)
        .unwrap_or_else(|| batch.volume_unit.clone());
    let normalized = convert(volume, &unit, &batch.volume_unit);

    let before = batch.volume_at(stage);
    batch.set_stage_volume(stage, normalized);
    batch_store.update(batch)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": batch.id.to_string(),
            "stage": stage.to_string(),
            "volume": normalized,
            "volume_unit": batch.volume_unit,
            "previous": before,
        }));
    } else {
        output.success(&format!(
            "Set {} at {} to {:.2} {} (was {:.2})",
            batch.name, stage, normalized, batch.volume_unit, before
        ));
    }

    Ok(())
}
