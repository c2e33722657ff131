//! Error taxonomy for the operation surface.
//!
//! Propagation policy:
//! - workflow persistence failures raise and abort the operation
//! - asset/provenance registration failures are logged, never raised
//! - unknown parameter keys are a recoverable outcome, not an error
//!   (see `OpDetail::Rejected` in the surface module)

use modelflow_catalog::CatalogError;
use modelflow_graph::GraphError;
use std::time::Duration;

/// Failure of an operation-surface call.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// A dependent service answered with an error or was unreachable
    #[error("dependent service call failed: {0}")]
    Network(#[from] CatalogError),

    /// A token matched neither an in-graph port/node nor a usable
    /// external id for this operation
    #[error("could not resolve identifier {0:?} against the workflow")]
    IdentifierNotFound(String),

    /// The workflow read-modify-write cycle failed; the operation aborts
    #[error("workflow persistence failed: {0}")]
    Persistence(#[source] CatalogError),

    /// Graph invariant violated while wiring nodes
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A concurrent writer invalidated this mutation.
    ///
    /// Not produced by the per-workflow serialized mutator; reserved
    /// for a store exposing compare-and-swap writes.
    #[error("workflow was modified concurrently; changes lost")]
    ConflictLost,

    /// The wait for a user response expired
    #[error("timed out waiting for a user response after {0:?}")]
    Timeout(Duration),

    /// The operation was cancelled before completing
    #[error("operation cancelled")]
    Cancelled,
}

impl OpError {
    /// Whether the caller can usefully retry or rephrase.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            OpError::Network(e) => e.is_retryable() || e.is_client_rejection(),
            OpError::IdentifierNotFound(_) => true,
            OpError::Timeout(_) => true,
            OpError::ConflictLost => true,
            OpError::Persistence(_) | OpError::Graph(_) | OpError::Cancelled => false,
        }
    }
}
