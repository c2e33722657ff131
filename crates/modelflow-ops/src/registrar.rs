//! Asset/provenance registrar.
//!
//! Registration is best-effort and two-step, not atomic: by the time it
//! runs, the node has already been persisted, so a failure here must
//! not abort the enclosing operation. Both failures are logged only,
//! and the provenance step runs regardless of the asset step's outcome.

use modelflow_catalog::{CatalogStore, ProvenanceRelation, ResourceType};
use modelflow_graph::ProjectId;
use std::sync::Arc;

/// Registers external resources as project assets with provenance.
pub struct AssetRegistrar {
    store: Arc<dyn CatalogStore>,
}

impl AssetRegistrar {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Register `resource_id` under the project's asset collection and
    /// record a `Project CONTAINS resource` provenance relation.
    pub async fn register(
        &self,
        project: &ProjectId,
        resource_type: ResourceType,
        resource_id: &str,
    ) {
        tracing::info!(%project, %resource_type, resource_id, "registering project asset");
        if let Err(err) = self
            .store
            .add_asset(project, resource_type, resource_id)
            .await
        {
            tracing::error!(%project, resource_id, error = %err, "failed to add asset to project");
        }

        let relation = ProvenanceRelation::contains(project, resource_id, resource_type);
        if let Err(err) = self.store.add_provenance(&relation).await {
            tracing::error!(
                %project,
                resource_id,
                error = %err,
                "failed to add provenance for project CONTAINS {resource_type}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelflow_test_utils::InMemoryCatalog;

    #[tokio::test]
    async fn registers_asset_and_provenance() {
        let store = Arc::new(InMemoryCatalog::new());
        let registrar = AssetRegistrar::new(store.clone());
        let project = ProjectId::new("p1");

        registrar
            .register(&project, ResourceType::Models, "m1")
            .await;

        let assets = store.assets();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].1, ResourceType::Models);
        assert_eq!(assets[0].2, "m1");

        let provenance = store.provenance();
        assert_eq!(provenance.len(), 1);
        assert_eq!(provenance[0].relation_type, "CONTAINS");
        assert_eq!(provenance[0].right_type, "Model");
    }

    #[tokio::test]
    async fn provenance_still_recorded_when_asset_post_fails() {
        let store = Arc::new(InMemoryCatalog::new());
        store.fail_asset_posts();
        let registrar = AssetRegistrar::new(store.clone());

        registrar
            .register(&ProjectId::new("p1"), ResourceType::Datasets, "ds1")
            .await;

        assert!(store.assets().is_empty());
        assert_eq!(store.provenance().len(), 1);
        assert_eq!(store.provenance()[0].right_type, "Dataset");
    }
}
