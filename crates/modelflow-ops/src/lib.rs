//! modelflow-ops — operation surface and orchestration.
//!
//! Composes the graph crate and the catalog/engine clients into the
//! externally invocable toolset:
//! - [`Toolset`] — create project/workflow, add nodes, dispatch runs,
//!   lookups, config editing, node removal
//! - [`WorkflowMutator`] — per-workflow serialized read-modify-write
//! - [`AssetRegistrar`] — best-effort asset/provenance registration
//! - reply gate for interactive clarifying questions
//!
//! Every operation takes an explicit [`OpContext`]; no shared mutable
//! session state is held between calls.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod context;
pub mod error;
pub mod mutator;
pub mod registrar;
pub mod settings;
pub mod surface;
pub mod wait;

pub use context::OpContext;
pub use error::OpError;
pub use mutator::WorkflowMutator;
pub use registrar::AssetRegistrar;
pub use settings::{SettingsPatch, SimulationSettings};
pub use surface::{OpDetail, OpOutcome, Toolset};
pub use wait::{reply_gate, ReplySender, ReplyWait, DEFAULT_REPLY_TIMEOUT};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
