use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use crate::entity::bug::BugStatus;
use crate::model::auth::Actor;
use crate::model::global_error::{AppError, ErrorCode};
use crate::store;

use super::state_machine::TransitionOutcome;
use super::BugWorkflow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub closed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BugWorkflow {
    /// Closes every resolved bug whose auto-close deadline is at or before `now`.
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, AppError> {
        let due = store::bugs_due_for_auto_close(&self.db, now).await?;
        Ok(self.close_due(due, now).await)
    }

    /// Closes the given bugs that are still resolved and due at `now` when
    /// re-read under their lock. The rest are counted as skipped.
    pub async fn close_due(&self, bug_ids: Vec<i32>, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        for bug_id in bug_ids {
            match self.auto_close(bug_id, now).await {
                Ok(true) => report.closed += 1,
                Ok(false) => report.skipped += 1,
                Err(err) => {
                    error!(bug_id, error = %err, "auto-close failed");
                    report.failed += 1;
                }
            }
        }

        if report != SweepReport::default() {
            info!(
                closed = report.closed,
                skipped = report.skipped,
                failed = report.failed,
                "auto-close sweep finished"
            );
        }
        report
    }

    async fn auto_close(&self, bug_id: i32, now: DateTime<Utc>) -> Result<bool, AppError> {
        let (guard, txn) = self.lock_bug(bug_id).await?;

        let outcome = self
            .apply_transition(&txn, bug_id, BugStatus::Closed, &Actor::system(), Some(now))
            .await;

        match outcome {
            Ok(TransitionOutcome::Applied(_, pending)) => {
                self.finish(guard, txn, pending).await?;
                Ok(true)
            }
            Ok(TransitionOutcome::Unchanged(_) | TransitionOutcome::Skipped) => Ok(false),
            // deleted since it was selected
            Err(err) if err.code() == ErrorCode::BugNotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Runs `sweep` every `period` until the runtime shuts down. The first sweep
/// happens immediately.
pub fn spawn_scheduler(workflow: Arc<BugWorkflow>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = workflow.sweep(Utc::now()).await {
                error!(error = %err, "auto-close sweep could not run");
            }
        }
    })
}
