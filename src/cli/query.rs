//! Query commands (status, report)
//!
//! Read-side aggregation over the vessel and batch ledgers.

use anyhow::Result;

use super::output::Output;
use crate::domain::{Pipeline, VesselKind};
use crate::storage::Project;

/// Show distillery status overview
pub fn status(output: &Output) -> Result<()> {
    let project = Project::open_current()?;

    let vessels = project.vessel_store().read_all()?;
    let batches = project.batch_store().read_all()?;
    let recipes = project.recipe_store().read_all()?;

    let filled = vessels.values().filter(|v| !v.is_empty()).count();
    let used_barrels = vessels
        .values()
        .filter(|v| v.kind == VesselKind::Barrel && v.is_used)
        .count();

    let kind_counts: Vec<(VesselKind, usize, usize)> = VesselKind::all()
        .iter()
        .map(|k| {
            let total = vessels.values().filter(|v| v.kind == *k).count();
            let kind_filled = vessels
                .values()
                .filter(|v| v.kind == *k && !v.is_empty())
                .count();
            (*k, total, kind_filled)
        })
        .filter(|(_, total, _)| *total > 0)
        .collect();

    let mut active: Vec<_> = batches.values().filter(|b| !b.is_bottled()).collect();
    active.sort_by(|a, b| a.name.cmp(&b.name));
    let bottled = batches.len() - active.len();

    if output.is_json() {
        output.data(&serde_json::json!({
            "recipes": recipes.len(),
            "vessels": {
                "total": vessels.len(),
                "filled": filled,
                "used_barrels": used_barrels,
                "by_kind": kind_counts.iter().map(|(k, total, kind_filled)| {
                    serde_json::json!({
                        "kind": k.to_string(),
                        "total": total,
                        "filled": kind_filled,
                    })
                }).collect::<Vec<_>>(),
            },
            "batches": {
                "total": batches.len(),
                "active": active.len(),
                "bottled": bottled,
            },
        }));
    } else {
        match &project.config().project.distillery_name {
            Some(name) => println!("{} - Status", name),
            None => println!("Distillery Status"),
        }
        println!("{}", "=".repeat(40));
        println!();
        println!("Recipes: {}", recipes.len());
        println!();
        println!("Vessels: {} total ({} filled)", vessels.len(), filled);
        for (kind, total, kind_filled) in &kind_counts {
            println!("  {:<12} {} ({} filled)", kind.to_string(), total, kind_filled);
        }
        if used_barrels > 0 {
            println!("  Used barrels: {}", used_barrels);
        }
        println!();
        println!(
            "Batches: {} total ({} active, {} bottled)",
            batches.len(),
            active.len(),
            bottled
        );

        if !active.is_empty() {
            println!();
            println!("Active batches:");
            for batch in active {
                let pipeline = recipes
                    .get(&batch.recipe)
                    .map(|r| r.pipeline.clone())
                    .unwrap_or_else(|| Pipeline::new(Vec::new()));
                let stage = batch
                    .furthest_stage(&pipeline)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "  {} - {} ({:.1} {} at {})",
                    batch.id,
                    batch.name,
                    batch.total_volume(),
                    batch.volume_unit,
                    stage
                );
            }
        }
    }

    Ok(())
}

/// Show the spirits-on-hand report (wine and proof gallons per vessel)
pub fn report(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let vessels = project.vessel_store().read_all()?;

    let mut rows: Vec<_> = vessels
        .values()
        .filter(|v| !v.is_empty())
        .map(|v| (v, v.current.wine_gallons(), v.current.proof_gallons()))
        .collect();
    rows.sort_by(|a, b| a.0.name.cmp(&b.0.name));

    let total_wine: f64 = rows.iter().map(|(_, wine, _)| wine).sum();
    let total_proof: f64 = rows.iter().map(|(_, _, proof)| proof).sum();
    let total_value: f64 = rows.iter().map(|(v, _, _)| v.current.value).sum();

    if output.is_json() {
        output.data(&serde_json::json!({
            "vessels": rows.iter().map(|(v, wine, proof)| {
                serde_json::json!({
                    "id": v.id.to_string(),
                    "name": v.name,
                    "kind": v.kind,
                    "volume": v.current.volume,
                    "volume_unit": v.current.volume_unit,
                    "abv": v.current.abv,
                    "value": v.current.value,
                    "wine_gallons": wine,
                    "proof_gallons": proof,
                })
            }).collect::<Vec<_>>(),
            "totals": {
                "wine_gallons": total_wine,
                "proof_gallons": total_proof,
                "value": total_value,
            },
        }));
    } else {
        match &project.config().project.distillery_name {
            Some(name) => println!("{} - Spirits On Hand", name),
            None => println!("Spirits On Hand"),
        }
        println!("{}", "=".repeat(64));

        if rows.is_empty() {
            println!("No spirits on hand.");
            return Ok(());
        }

        println!(
            "{:<20} {:<10} {:>6} {:>12} {:>12}",
            "VESSEL", "KIND", "ABV", "WINE GAL", "PROOF GAL"
        );
        println!("{}", "-".repeat(64));
        for (vessel, wine, proof) in &rows {
            println!(
                "{:<20} {:<10} {:>5.1}% {:>12.2} {:>12.2}",
                vessel.name,
                vessel.kind.to_string(),
                vessel.current.abv,
                wine,
                proof
            );
        }
        println!("{}", "-".repeat(64));
        println!(
            "{:<20} {:<10} {:>6} {:>12.2} {:>12.2}",
            "TOTAL", "", "", total_wine, total_proof
        );
        println!();
        println!("Total value: ${:.2}", total_value);
    }

    Ok(())
}
