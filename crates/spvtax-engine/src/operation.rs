//! Collaborator interfaces.
//!
//! The engine never decides what a stage computes. It awaits a
//! [`StageOperation`] for each stage and an [`EntitySource`] for the initial
//! filing. Implementations must be `Send + Sync` so a run can be moved onto
//! another task; both traits are object-safe so mock and live integrations
//! can be chosen at runtime.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spvtax_core::SpvId;
use spvtax_state::{Filing, Investor};

use crate::error::OperationError;

/// A selectable SPV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    /// SPV identifier.
    pub id: SpvId,
    /// SPV name.
    pub name: String,
}

/// Where filings come from.
#[async_trait]
pub trait EntitySource: Send + Sync {
    /// SPVs the user can pick from.
    async fn list_candidate_entities(&self) -> Result<Vec<EntitySummary>, OperationError>;

    /// A fresh filing for `id`: every status pending, no download
    /// references, no confirmation id.
    async fn load_entity_details(&self, id: &SpvId) -> Result<Filing, OperationError>;
}

/// The business operation behind one stage.
#[async_trait]
pub trait StageOperation: Send + Sync {
    /// Produce the successor filing. `filing` is the engine's copy; the
    /// engine's own filing is untouched until the result is committed.
    async fn execute(&self, filing: Filing) -> Result<Filing, OperationError>;

    /// Deliver to a single investor. Only called for stages that deliver
    /// per investor.
    async fn deliver(&self, _filing: &Filing, _investor: &Investor) -> Result<(), OperationError> {
        Ok(())
    }

    /// Name for logs.
    fn name(&self) -> &str;
}
