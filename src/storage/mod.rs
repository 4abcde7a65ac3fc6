//! # Storage Layer
//!
//! Persistence layer for Stillroom with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Recipes | Markdown + YAML frontmatter | `.stillroom/recipes/{id}.md` |
//! | Vessels | JSONL (one JSON per line) | `.stillroom/vessels.jsonl` |
//! | Batches | JSONL (one JSON per line) | `.stillroom/batches.jsonl` |
//! | Config | TOML | `.stillroom/config.toml` |
//! | Index | JSONL (auto-regenerated) | `.stillroom/recipes/index.jsonl` |
//!
//! ## Concurrency Safety
//!
//! - [`VesselStore`] and [`BatchStore`] use file locking (`fs2`) for concurrent access
//! - [`RecipeStore`] uses mtime-based index invalidation
//! - All writes are atomic (temp file + rename)
//!
//! ## Project Structure
//!
//! ```text
//! .stillroom/
//! ├── recipes/
//! │   ├── r-1234567.md      # Recipe markdown files
//! │   └── index.jsonl       # Fast query index (auto-generated)
//! ├── vessels.jsonl         # All vessels in JSONL format
//! ├── batches.jsonl         # All batches in JSONL format
//! ├── config.toml           # Project configuration
//! └── .gitignore            # Ignores the regenerated index
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a Stillroom project
//! - [`RecipeStore`] - Read/write recipes as markdown files
//! - [`VesselStore`] / [`BatchStore`] - Read/write vessels and batches as JSONL
//! - [`Config`] - Project and global configuration

mod config;
mod jsonl;
mod markdown;
mod project;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig};
pub use jsonl::{BatchStore, JsonlStore, VesselStore};
pub use markdown::RecipeStore;
pub use project::{Project, ProjectError};
