use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{info, instrument};

use crate::model::auth::Actor;
use crate::model::global_error::{AppError, ErrorCode};
use crate::store;

use super::policy::Permission;
use super::BugWorkflow;

/// True when adding "`bug_id` depends on `depends_on_id`" would close a cycle,
/// i.e. `bug_id` is already reachable from `depends_on_id`.
pub fn would_create_cycle(edges: &[(i32, i32)], bug_id: i32, depends_on_id: i32) -> bool {
    if bug_id == depends_on_id {
        return true;
    }

    let mut adjacency: HashMap<i32, Vec<i32>> = HashMap::new();
    for &(from, to) in edges {
        adjacency.entry(from).or_default().push(to);
    }

    let mut seen = HashSet::from([depends_on_id]);
    let mut queue = VecDeque::from([depends_on_id]);

    while let Some(node) = queue.pop_front() {
        for &next in adjacency.get(&node).into_iter().flatten() {
            if next == bug_id {
                return true;
            }
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    false
}

impl BugWorkflow {
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn add_dependency(&self, bug_id: i32, depends_on_id: i32, actor: &Actor) -> Result<(), AppError> {
        if bug_id == depends_on_id {
            return Err(AppError::bad_request(ErrorCode::SelfDependency));
        }

        let graph = tokio::time::timeout(self.locks.timeout(), self.graph_lock.lock())
            .await
            .map_err(|_| {
                AppError::with_detail(ErrorCode::ConcurrencyConflict, "dependency graph is busy")
            })?;
        let (guard, txn) = self.lock_bug(bug_id).await?;

        let bug = store::find_bug(&txn, bug_id).await?;
        store::find_bug(&txn, depends_on_id).await?;
        self.policy.authorize(Permission::ManageDependencies, actor)?;

        if store::edge_exists(&txn, bug_id, depends_on_id).await? {
            return Ok(());
        }

        let edges = store::all_edges(&txn).await?;
        if would_create_cycle(&edges, bug_id, depends_on_id) {
            return Err(AppError::with_detail(
                ErrorCode::CyclicDependency,
                format!("bug #{} is already reachable from bug #{}", bug_id, depends_on_id),
            ));
        }

        store::insert_edge(&txn, bug_id, depends_on_id).await?;

        let message = format!("Bug #{} now depends on bug #{}", bug_id, depends_on_id);
        let pending = self.touch_and_record(&txn, bug, actor, &message).await?;

        txn.commit().await?;
        drop(guard);
        drop(graph);
        info!(bug_id, depends_on_id, "dependency added");

        self.emitter.deliver(pending).await;
        Ok(())
    }

    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn remove_dependency(&self, bug_id: i32, depends_on_id: i32, actor: &Actor) -> Result<(), AppError> {
        let (guard, txn) = self.lock_bug(bug_id).await?;

        let bug = store::find_bug(&txn, bug_id).await?;
        self.policy.authorize(Permission::ManageDependencies, actor)?;

        if !store::delete_edge(&txn, bug_id, depends_on_id).await? {
            return Ok(());
        }

        let message = format!("Bug #{} no longer depends on bug #{}", bug_id, depends_on_id);
        let pending = self.touch_and_record(&txn, bug, actor, &message).await?;

        self.finish(guard, txn, pending).await?;
        info!(bug_id, depends_on_id, "dependency removed");
        Ok(())
    }

    /// Bugs that block `bug_id`.
    pub async fn list_dependencies(&self, bug_id: i32) -> Result<Vec<i32>, AppError> {
        store::find_bug(&self.db, bug_id).await?;
        store::dependencies_of(&self.db, bug_id).await
    }

    /// Bugs blocked by `bug_id`.
    pub async fn list_dependents(&self, bug_id: i32) -> Result<Vec<i32>, AppError> {
        store::find_bug(&self.db, bug_id).await?;
        store::dependents_of(&self.db, bug_id).await
    }
}
