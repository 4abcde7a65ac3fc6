//! Domain models for Stillroom
//!
//! Contains the core business logic without any I/O concerns.

mod id;
mod units;
mod stage;
mod pipeline;
mod recipe;
mod batch;
mod vessel;
mod transfer;

pub use id::{BatchId, IdError, RecipeId, VesselId};
pub use units::{convert, ratio, Unit, UnitFamily};
pub use stage::Stage;
pub use pipeline::{Pipeline, PipelineError, PipelineTemplate};
pub use recipe::{Recipe, RecipeFrontmatter, RecipeMeta};
pub use batch::{Batch, BatchVolumeModel};
pub use vessel::{
    BarrelDetails, ContentEntry, Vessel, VesselCurrent, VesselKind, VesselStats, VOLUME_EPSILON,
};
pub use transfer::{
    full_transfer, transfer_batch_contents, transfer_proportional, TransferError, TransferReceipt,
};
