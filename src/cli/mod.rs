//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init`, `status`, `report` |
//! | Vessel | Container registry | `vessel add`, `vessel fill`, `vessel transfer` |
//! | Batch | Production lifecycle | `batch start`, `batch advance`, `batch adjust` |
//! | Recipe | Recipe documents | `recipe new`, `recipe edit`, `recipe templates` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! stillroom --verbose status
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod batch;
mod output;
mod query;
mod recipe;
mod vessel;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
