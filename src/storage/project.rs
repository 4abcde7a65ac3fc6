//! Project management
//!
//! Handles project initialization and provides access to stores.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::{BatchStore, Config, RecipeStore, VesselStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a stillroom project. Run 'stillroom init' first.")]
    NotInProject,
}

/// A Stillroom project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let stillroom_dir = root.join(".stillroom");

        if !stillroom_dir.is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let stillroom_dir = root.join(".stillroom");

        // Create directory structure
        fs::create_dir_all(&stillroom_dir).with_context(|| {
            format!(
                "Failed to create .stillroom directory: {}",
                stillroom_dir.display()
            )
        })?;

        let recipes_dir = stillroom_dir.join("recipes");
        fs::create_dir_all(&recipes_dir).with_context(|| {
            format!(
                "Failed to create recipes directory: {}",
                recipes_dir.display()
            )
        })?;

        // Create default config
        let config_path = stillroom_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# Stillroom configuration

# Distillery name, shown in report headers
# distillery_name = "My Distillery"

# Default volume unit for new vessels and batches
default_volume_unit = "gal"

# Default pipeline template for 'stillroom recipe new'
default_template = "Grain Spirit (Barreled)"
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        // Create .gitignore for .stillroom
        let gitignore_path = stillroom_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# Ignore index files (they're regenerated)
recipes/index.jsonl
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .stillroom directory path
    pub fn stillroom_dir(&self) -> PathBuf {
        self.root.join(".stillroom")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the vessel store
    pub fn vessel_store(&self) -> VesselStore {
        VesselStore::for_project(&self.root)
    }

    /// Returns the batch store
    pub fn batch_store(&self) -> BatchStore {
        BatchStore::for_project(&self.root)
    }

    /// Returns the recipe store
    pub fn recipe_store(&self) -> RecipeStore {
        RecipeStore::for_project(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.stillroom_dir().is_dir());
        assert!(project.stillroom_dir().join("recipes").is_dir());
        assert!(project.stillroom_dir().join("config.toml").is_file());
        assert!(project.stillroom_dir().join(".gitignore").is_file());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();

        Project::init(dir.path()).unwrap();
        Project::init(dir.path()).unwrap(); // Should not fail

        assert!(dir.path().join(".stillroom").is_dir());
    }

    #[test]
    fn default_config_parses() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        // The generated config.toml must round-trip through the loader
        assert_eq!(
            project.config().project.default_volume_unit.as_str(),
            "gal"
        );
        assert_eq!(
            project.config().project.default_template,
            crate::domain::PipelineTemplate::GrainBarreled
        );
    }

    #[test]
    fn open_existing_project() {
        let dir = TempDir::new().unwrap();
        Project::init(dir.path()).unwrap();

        let project = Project::open(dir.path()).unwrap();
        assert_eq!(project.root(), dir.path());
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        let result = Project::open(dir.path());

        assert!(result.is_err());
    }

    #[test]
    fn stores_are_accessible() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        let vessel_store = project.vessel_store();
        let batch_store = project.batch_store();
        let recipe_store = project.recipe_store();

        assert!(vessel_store.path().ends_with("vessels.jsonl"));
        assert!(batch_store.path().ends_with("batches.jsonl"));
        assert!(recipe_store.dir().ends_with("recipes"));
    }
}
