use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseTransaction, IntoActiveModel, Set};
use tracing::{info, instrument};

use crate::entity::bug::{self, BugStatus};
use crate::model::auth::Actor;
use crate::model::global_error::{AppError, ErrorCode};
use crate::store;

use super::emitter::PendingDelivery;
use super::policy::Permission;
use super::BugWorkflow;

/// What a permitted transition does besides changing the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    Plain,
    StartAutoClose,
    StopAutoClose,
    Reopen,
}

/// Checks `from -> to` against the transition table. `Ok(None)` means the bug
/// is already in the target state.
pub fn plan(from: BugStatus, to: BugStatus) -> Result<Option<TransitionEffect>, AppError> {
    use BugStatus::*;

    if from == to {
        return Ok(None);
    }

    let effect = match (from, to) {
        (Open, InProgress) | (InProgress, Open) => TransitionEffect::Plain,
        (InProgress, Resolved) => TransitionEffect::StartAutoClose,
        (Resolved, Closed) => TransitionEffect::StopAutoClose,
        (Resolved, Open) | (Closed, Open) => TransitionEffect::Reopen,
        _ => {
            return Err(AppError::with_detail(
                ErrorCode::InvalidTransition,
                format!("{} -> {}", from, to),
            ));
        }
    };

    Ok(Some(effect))
}

/// Writes the new status and the timestamps that go with it.
pub fn apply(
    bug: &mut bug::ActiveModel,
    to: BugStatus,
    effect: TransitionEffect,
    now: DateTime<Utc>,
    auto_close_after: Duration,
) {
    bug.status = Set(to);
    bug.updated_at = Set(now);

    match effect {
        TransitionEffect::Plain => {}
        TransitionEffect::StartAutoClose => {
            bug.resolved_at = Set(Some(now));
            bug.auto_close_at = Set(Some(
                now.checked_add_signed(auto_close_after).unwrap_or(DateTime::<Utc>::MAX_UTC),
            ));
        }
        TransitionEffect::StopAutoClose => {
            bug.auto_close_at = Set(None);
        }
        TransitionEffect::Reopen => {
            bug.resolved_at = Set(None);
            bug.auto_close_at = Set(None);
        }
    }
}

pub(crate) enum TransitionOutcome {
    Applied(bug::Model, Vec<PendingDelivery>),
    Unchanged(bug::Model),
    /// The bug no longer matches the condition it was selected under.
    Skipped,
}

impl BugWorkflow {
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn transition_bug(
        &self,
        bug_id: i32,
        target: BugStatus,
        actor: &Actor,
    ) -> Result<bug::Model, AppError> {
        let (guard, txn) = self.lock_bug(bug_id).await?;

        match self.apply_transition(&txn, bug_id, target, actor, None).await? {
            TransitionOutcome::Applied(bug, pending) => {
                self.finish(guard, txn, pending).await?;
                Ok(bug)
            }
            TransitionOutcome::Unchanged(bug) => Ok(bug),
            TransitionOutcome::Skipped => Err(AppError::internal_error(ErrorCode::InternalError)),
        }
    }

    /// Runs one transition inside `txn`. The caller holds the bug lock.
    /// With `due_by` set the bug must still be resolved with a deadline at or
    /// before it, otherwise nothing is written.
    pub(crate) async fn apply_transition(
        &self,
        txn: &DatabaseTransaction,
        bug_id: i32,
        target: BugStatus,
        actor: &Actor,
        due_by: Option<DateTime<Utc>>,
    ) -> Result<TransitionOutcome, AppError> {
        let current = store::find_bug(txn, bug_id).await?;

        if let Some(due_by) = due_by {
            let still_due = current.status == BugStatus::Resolved
                && current.auto_close_at.is_some_and(|deadline| deadline <= due_by);
            if !still_due {
                return Ok(TransitionOutcome::Skipped);
            }
        }

        let from = current.status;
        let Some(effect) = plan(from, target)? else {
            return Ok(TransitionOutcome::Unchanged(current));
        };

        self.policy.authorize(Permission::Transition(from, target), actor)?;

        if target == BugStatus::Resolved {
            let blocking = store::unresolved_dependencies(txn, bug_id).await?;
            if !blocking.is_empty() {
                return Err(AppError::UnresolvedDependency(blocking));
            }
        }

        let recipients = self.emitter.watchers(txn, &current).await?;
        let project_id = current.project_id;

        let mut active = current.into_active_model();
        apply(&mut active, target, effect, Utc::now(), self.settings.auto_close_after);
        let updated = store::save_bug(txn, active).await?;

        let message = format!("Status changed from {} to {} by {}", from, target, actor);
        let pending = self
            .emitter
            .record(txn, project_id, Some(bug_id), actor, &message, &recipients)
            .await?;

        info!(bug_id, %from, to = %target, "bug status changed");
        Ok(TransitionOutcome::Applied(updated, pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BugStatus::*;

    const ALL: [BugStatus; 4] = [Open, InProgress, Resolved, Closed];

    #[test]
    fn same_state_is_a_no_op() {
        for status in ALL {
            assert_eq!(plan(status, status).unwrap(), None);
        }
    }

    #[test]
    fn only_table_transitions_are_allowed() {
        let allowed = [
            (Open, InProgress),
            (InProgress, Resolved),
            (Resolved, Closed),
            (Resolved, Open),
            (Closed, Open),
            (InProgress, Open),
        ];

        for from in ALL {
            for to in ALL {
                if from == to {
                    continue;
                }
                let result = plan(from, to);
                if allowed.contains(&(from, to)) {
                    assert!(result.is_ok(), "{} -> {} should be allowed", from, to);
                } else {
                    let err = result.unwrap_err();
                    assert_eq!(err.code(), ErrorCode::InvalidTransition, "{} -> {}", from, to);
                }
            }
        }
    }

    #[test]
    fn resolving_sets_deadline_and_reopen_clears_it() {
        let now = Utc::now();
        let mut bug = bug::ActiveModel::default();

        apply(&mut bug, Resolved, TransitionEffect::StartAutoClose, now, Duration::days(7));
        assert_eq!(bug.resolved_at, Set(Some(now)));
        assert_eq!(bug.auto_close_at, Set(Some(now + Duration::days(7))));

        apply(&mut bug, Closed, TransitionEffect::StopAutoClose, now, Duration::days(7));
        assert_eq!(bug.resolved_at, Set(Some(now)));
        assert_eq!(bug.auto_close_at, Set(None));

        apply(&mut bug, Open, TransitionEffect::Reopen, now, Duration::days(7));
        assert_eq!(bug.resolved_at, Set(None));
        assert_eq!(bug.status, Set(Open));
    }
}
