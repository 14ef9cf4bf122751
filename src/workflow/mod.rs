//! Bug lifecycle engine: status transitions, dependency graph, activity
//! trail and the auto-close sweep. Every mutation takes the bug's lock, runs
//! in one transaction and hands notifications to the dispatcher after commit.

mod bug;
mod dependency;
mod emitter;
mod lock;
mod policy;
mod scheduler;
mod state_machine;

use std::sync::Arc;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tokio::sync::Mutex;

use crate::configuration::WorkflowSettings;
use crate::model::global_error::AppError;
use crate::util::NotificationDispatcher;

pub use bug::format_duration;
pub use dependency::would_create_cycle;
pub use emitter::{ActivityEmitter, PendingDelivery};
pub use lock::{BugLockGuard, BugLocks};
pub use policy::{AccessPolicy, Permission};
pub use scheduler::{spawn_scheduler, SweepReport};
pub use state_machine::{plan, TransitionEffect};

pub struct BugWorkflow {
    db: DatabaseConnection,
    locks: BugLocks,
    graph_lock: Mutex<()>,
    policy: AccessPolicy,
    emitter: ActivityEmitter,
    settings: WorkflowSettings,
}

impl BugWorkflow {
    pub fn new(
        db: DatabaseConnection,
        dispatcher: Arc<dyn NotificationDispatcher>,
        policy: AccessPolicy,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            db,
            locks: BugLocks::new(settings.lock_timeout),
            graph_lock: Mutex::new(()),
            policy,
            emitter: ActivityEmitter::new(dispatcher),
            settings,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    async fn lock_bug(&self, bug_id: i32) -> Result<(BugLockGuard, DatabaseTransaction), AppError> {
        let guard = self.locks.acquire(bug_id).await?;
        let txn = self.db.begin().await?;
        Ok((guard, txn))
    }

    /// Commits, releases the bug lock, then delivers.
    async fn finish(
        &self,
        guard: BugLockGuard,
        txn: DatabaseTransaction,
        pending: Vec<PendingDelivery>,
    ) -> Result<(), AppError> {
        txn.commit().await?;
        drop(guard);
        self.emitter.deliver(pending).await;
        Ok(())
    }
}
