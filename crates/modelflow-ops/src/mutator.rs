//! Workflow mutator.
//!
//! The store keeps the only authoritative workflow copy, so every
//! mutation is a fetch/modify/replace cycle. The store offers no
//! version token, which makes unserialized cycles a last-writer-wins
//! race; a per-workflow async mutex is held across the whole cycle so
//! that local writers are single-file per workflow id.
//!
//! Cancellation before the PUT leaves the stored workflow unmodified:
//! the closure only touches the in-memory copy.

use crate::error::OpError;
use dashmap::DashMap;
use modelflow_catalog::CatalogStore;
use modelflow_graph::{Workflow, WorkflowId};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Serialized read-modify-write access to stored workflows.
pub struct WorkflowMutator {
    store: Arc<dyn CatalogStore>,
    locks: DashMap<WorkflowId, Arc<Mutex<()>>>,
}

impl WorkflowMutator {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, id: WorkflowId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Fetch a read-only snapshot. Not serialized against writers; the
    /// snapshot may be stale by the time it is inspected.
    pub async fn read(&self, id: WorkflowId) -> Result<Workflow, OpError> {
        self.store.get_workflow(id).await.map_err(OpError::from)
    }

    /// Run one fetch/modify/replace cycle under the workflow's lock.
    ///
    /// The closure mutates the freshly fetched copy; its return value is
    /// handed back after a successful PUT. Fetch and PUT failures are
    /// persistence errors and abort the operation.
    pub async fn update<T, F>(&self, id: WorkflowId, mutate: F) -> Result<T, OpError>
    where
        T: Send,
        F: FnOnce(&mut Workflow) -> Result<T, OpError> + Send,
    {
        let lock = self.lock_for(id);
        let result = {
            let _guard = lock.lock().await;
            self.run_cycle(id, mutate).await
        };
        // Drop the table entry once no other cycle holds a handle:
        // two strong counts are the map entry plus our local `lock`,
        // and any waiter raises the count and keeps the entry alive.
        self.locks
            .remove_if(&id, |_, entry| Arc::strong_count(entry) == 2);
        result
    }

    async fn run_cycle<T, F>(&self, id: WorkflowId, mutate: F) -> Result<T, OpError>
    where
        T: Send,
        F: FnOnce(&mut Workflow) -> Result<T, OpError> + Send,
    {
        let mut workflow = self
            .store
            .get_workflow(id)
            .await
            .map_err(OpError::Persistence)?;
        let value = mutate(&mut workflow)?;
        self.store
            .put_workflow(&workflow)
            .await
            .map_err(OpError::Persistence)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelflow_graph::{DatasetId, NodeFactory};
    use modelflow_test_utils::InMemoryCatalog;

    fn seeded() -> (Arc<InMemoryCatalog>, WorkflowId) {
        let store = Arc::new(InMemoryCatalog::new());
        let id = store.seed_workflow(Workflow::new("w", "d"));
        (store, id)
    }

    #[tokio::test]
    async fn update_persists_the_mutation() {
        let (store, id) = seeded();
        let mutator = WorkflowMutator::new(store.clone());

        mutator
            .update(id, |wf| {
                let parts = NodeFactory::for_workflow(wf).dataset_node(&DatasetId::new("ds"));
                wf.push_node(parts.node);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(store.workflow(id).unwrap().nodes.len(), 1);
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn closure_error_skips_the_put() {
        let (store, id) = seeded();
        let mutator = WorkflowMutator::new(store.clone());

        let result: Result<(), _> = mutator
            .update(id, |wf| {
                let parts = NodeFactory::for_workflow(wf).dataset_node(&DatasetId::new("ds"));
                wf.push_node(parts.node);
                Err(OpError::Cancelled)
            })
            .await;

        assert!(matches!(result, Err(OpError::Cancelled)));
        assert!(store.workflow(id).unwrap().nodes.is_empty());
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn missing_workflow_is_a_persistence_error() {
        let store = Arc::new(InMemoryCatalog::new());
        let mutator = WorkflowMutator::new(store);
        let result = mutator.update(WorkflowId::new(), |_| Ok(())).await;
        assert!(matches!(result, Err(OpError::Persistence(_))));
    }

    #[tokio::test]
    async fn lock_table_is_emptied_after_the_cycle() {
        let (store, id) = seeded();
        let mutator = WorkflowMutator::new(store.clone());

        mutator.update(id, |_| Ok(())).await.unwrap();
        assert!(mutator.locks.is_empty());

        // failed cycles release their entry too
        let result = mutator
            .update(id, |_| Err::<(), _>(OpError::Cancelled))
            .await;
        assert!(matches!(result, Err(OpError::Cancelled)));
        assert!(mutator.locks.is_empty());
    }

    // Without per-workflow serialization, concurrent cycles would read
    // the same base copy and the last PUT would drop the other's node.
    #[tokio::test]
    async fn concurrent_updates_do_not_lose_writes() {
        let (store, id) = seeded();
        let mutator = Arc::new(WorkflowMutator::new(store.clone()));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let mutator = mutator.clone();
                tokio::spawn(async move {
                    mutator
                        .update(id, move |wf| {
                            let parts = NodeFactory::for_workflow(wf)
                                .dataset_node(&DatasetId::new(format!("ds-{i}")));
                            wf.push_node(parts.node);
                            Ok(())
                        })
                        .await
                })
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        assert_eq!(store.workflow(id).unwrap().nodes.len(), 10);
        assert!(mutator.locks.is_empty());
    }
}
