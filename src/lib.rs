//! Stillroom CLI - Local-first production tracking for craft distilleries
//!
//! Stillroom tracks spirit batches as they move through a recipe's pipeline
//! of stages (mashing, fermenting, distilling, barreling, bottling) and keeps
//! a ledger of which vessels hold which batches, at what volume and value.

pub mod domain;
pub mod storage;
pub mod cli;

pub use domain::{
    Batch, BatchId, Pipeline, PipelineTemplate, Recipe, RecipeId, Stage, Unit, Vessel, VesselId,
    VesselKind,
};
