//! Recipe CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;

use super::output::Output;
use crate::domain::{Pipeline, PipelineTemplate, Recipe, RecipeId};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum RecipeCommands {
    /// Create a new recipe
    New {
        /// Recipe name
        name: String,

        /// Pipeline template (default: project default template)
        #[arg(long, short = 't')]
        template: Option<String>,

        /// Spirit type, e.g. "Bourbon" (the barrel provenance label)
        #[arg(long = "type")]
        spirit_type: Option<String>,

        /// Custom comma-separated stage list (overrides --template)
        #[arg(long)]
        stages: Option<String>,
    },

    /// List recipes
    List,

    /// Show recipe details
    Show {
        /// Recipe ID
        id: String,
    },

    /// Open a recipe's production notes in your editor
    Edit {
        /// Recipe ID
        id: String,
    },

    /// List the built-in pipeline templates
    Templates,
}

pub fn run(cmd: RecipeCommands, output: &Output) -> Result<()> {
    match cmd {
        RecipeCommands::New {
            name,
            template,
            spirit_type,
            stages,
        } => new_recipe(output, &name, template.as_deref(), spirit_type, stages.as_deref()),
        RecipeCommands::List => list_recipes(output),
        RecipeCommands::Show { id } => show_recipe(output, &id),
        RecipeCommands::Edit { id } => edit_recipe(output, &id),
        RecipeCommands::Templates => list_templates(output),
    }
}

fn new_recipe(
    output: &Output,
    name: &str,
    template: Option<&str>,
    spirit_type: Option<String>,
    stages: Option<&str>,
) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.recipe_store();

    let mut recipe = match stages {
        Some(list) => {
            let names: Vec<&str> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            let pipeline = Pipeline::from_names(&names)?;
            Recipe::with_pipeline(name, pipeline)
        }
        None => {
            let template = match template {
                Some(t) => t
                    .parse::<PipelineTemplate>()
                    .map_err(|e: String| anyhow::anyhow!(e))?,
                None => project.config().project.default_template,
            };
            Recipe::new(name, template)
        }
    };

    if let Some(spirit) = spirit_type {
        recipe.set_spirit_type(spirit);
    }

    store.write(&recipe)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": recipe.id.to_string(),
            "name": recipe.name,
            "type": recipe.spirit_type,
            "template": recipe.template,
            "pipeline": recipe.pipeline,
        }));
    } else {
        output.success(&format!(
            "Created recipe: {} - {} ({})",
            recipe.id, recipe.name, recipe.template
        ));
        if !recipe.pipeline.is_empty() {
            println!("Pipeline: {}", stage_chain(&recipe.pipeline));
        }
    }

    Ok(())
}

fn stage_chain(pipeline: &Pipeline) -> String {
    pipeline
        .stages()
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn list_recipes(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.recipe_store();

    let mut list = store.list()?;
    list.sort_by(|a, b| a.1.cmp(&b.1));

    if output.is_json() {
        let items: Vec<_> = list
            .iter()
            .map(|(id, name, template)| {
                serde_json::json!({
                    "id": id.to_string(),
                    "name": name,
                    "template": template,
                })
            })
            .collect();
        output.data(&items);
    } else if list.is_empty() {
        println!("No recipes found.");
    } else {
        println!("{:<12} {:<24} TEMPLATE", "ID", "NAME");
        println!("{}", "-".repeat(64));
        for (id, name, template) in list {
            println!("{:<12} {:<24} {}", id.to_string(), name, template);
        }
    }

    Ok(())
}

fn show_recipe(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.recipe_store();

    let id: RecipeId = id_str.parse()?;
    let recipe = store
        .read(&id)?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found: {}", id))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": recipe.id.to_string(),
            "name": recipe.name,
            "type": recipe.spirit_type,
            "template": recipe.template,
            "pipeline": recipe.pipeline,
            "created_at": recipe.created_at,
            "updated_at": recipe.updated_at,
            "body": recipe.body,
            "meta": recipe.meta,
        }));
    } else {
        println!("Recipe: {}", recipe.id);
        println!("Name: {}", recipe.name);
        if let Some(spirit) = &recipe.spirit_type {
            println!("Type: {}", spirit);
        }
        println!("Template: {}", recipe.template);
        if recipe.pipeline.is_empty() {
            println!("Pipeline: (empty)");
        } else {
            println!("Pipeline: {}", stage_chain(&recipe.pipeline));
        }
        println!("Created: {}", recipe.created_at.format("%Y-%m-%d %H:%M"));
        println!("Updated: {}", recipe.updated_at.format("%Y-%m-%d %H:%M"));

        if !recipe.meta.is_empty() {
            println!("\nMetadata:");
            for (key, value) in recipe.meta.iter() {
                println!("  {}: {}", key, value);
            }
        }

        if !recipe.body.is_empty() {
            println!("\nNotes:");
            println!("{}", recipe.body);
        }
    }

    Ok(())
}

fn edit_recipe(output: &Output, id_str: &str) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.recipe_store();

    let id: RecipeId = id_str.parse()?;
    if !store.exists(&id) {
        anyhow::bail!("Recipe not found: {}", id);
    }

    let editor = project
        .config()
        .global
        .editor
        .clone()
        .or_else(|| std::env::var("EDITOR").ok())
        .unwrap_or_else(|| "vi".to_string());

    let path = store.recipe_path(&id);
    output.verbose_ctx("edit", &format!("Opening {} with {}", path.display(), editor));

    let status = std::process::Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;

    if !status.success() {
        anyhow::bail!("Editor exited with status {}", status);
    }

    // Re-read so the confirmation reflects the edit; the index rebuilds off
    // the file's new mtime
    let recipe = store
        .read(&id)?
        .ok_or_else(|| anyhow::anyhow!("Recipe not found after edit: {}", id))?;
    output.success(&format!("Updated recipe: {} ({})", recipe.id, recipe.name));

    Ok(())
}

fn list_templates(output: &Output) -> Result<()> {
    // Static reference data; works outside a project
    if output.is_json() {
        let items: Vec<_> = PipelineTemplate::all()
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.to_string(),
                    "stages": t
                        .stages()
                        .stages()
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        output.data(&items);
    } else {
        println!("{:<28} STAGES", "TEMPLATE");
        println!("{}", "-".repeat(90));
        for template in PipelineTemplate::all() {
            let pipeline = template.stages();
            let chain = if pipeline.is_empty() {
                "(choose your own with --stages)".to_string()
            } else {
                stage_chain(&pipeline)
            };
            println!("{:<28} {}", template.to_string(), chain);
        }
    }

    Ok(())
}
