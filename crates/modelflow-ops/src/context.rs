//! Operation context.
//!
//! Earlier revisions held the active project and workflow as shared
//! mutable toolset state; every call now receives the pair explicitly,
//! so concurrent calls against different workflows cannot observe each
//! other's targets.

use modelflow_graph::{ProjectId, WorkflowId};

/// The project/workflow pair an operation acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpContext {
    pub project_id: ProjectId,
    pub workflow_id: WorkflowId,
}

impl OpContext {
    #[inline]
    #[must_use]
    pub fn new(project_id: ProjectId, workflow_id: WorkflowId) -> Self {
        Self {
            project_id,
            workflow_id,
        }
    }

    /// Same project, different workflow.
    #[inline]
    #[must_use]
    pub fn with_workflow(mut self, workflow_id: WorkflowId) -> Self {
        self.workflow_id = workflow_id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_workflow_keeps_the_project() {
        let ctx = OpContext::new(ProjectId::new("p1"), WorkflowId::new());
        let other = WorkflowId::new();
        let moved = ctx.clone().with_workflow(other);
        assert_eq!(moved.project_id, ctx.project_id);
        assert_eq!(moved.workflow_id, other);
    }
}
