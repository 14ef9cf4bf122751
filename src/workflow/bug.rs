use chrono::{Duration, Utc};
use sea_orm::{IntoActiveModel, Set, TransactionTrait};
use tracing::{info, instrument};

use crate::entity::{activity_log, bug, bug_attachment, notification, time_tracking};
use crate::model::auth::Actor;
use crate::model::bug::NewBug;
use crate::model::global_error::{AppError, ErrorCode};
use crate::store::{self, ActivityScope};

use super::policy::Permission;
use super::BugWorkflow;

impl BugWorkflow {
    #[instrument(skip(self, new_bug, reporter), fields(reporter = %reporter))]
    pub async fn create_bug(&self, project_id: i32, new_bug: NewBug, reporter: &Actor) -> Result<bug::Model, AppError> {
        self.policy.authorize(Permission::Report, reporter)?;
        if new_bug.title.trim().is_empty() {
            return Err(AppError::with_detail(ErrorCode::ValidationError, "title must not be empty"));
        }

        let txn = self.db.begin().await?;

        store::find_project(&txn, project_id).await?;
        if let Some(user_id) = reporter.user_id {
            store::find_user(&txn, user_id).await?;
        }
        if let Some(team_id) = new_bug.assigned_team_id {
            store::find_team(&txn, team_id).await?;
        }
        if let Some(worker_id) = new_bug.assigned_worker_id {
            store::find_worker(&txn, worker_id).await?;
        }
        if let Some(sprint_id) = new_bug.sprint_id {
            let sprint = store::find_sprint(&txn, sprint_id).await?;
            if sprint.project_id != project_id {
                return Err(AppError::bad_request(ErrorCode::InvalidSprint));
            }
        }

        let created = store::insert_bug(&txn, project_id, &new_bug, reporter.user_id).await?;

        for name in new_bug.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            let tag = store::find_or_create_tag(&txn, name).await?;
            store::attach_tag(&txn, created.id, tag.id).await?;
        }

        let recipients = self.emitter.assignee(&txn, &created).await?;
        let message = format!("Bug #{} \"{}\" reported by {}", created.id, created.title, reporter);
        let pending = self
            .emitter
            .record(&txn, project_id, Some(created.id), reporter, &message, &recipients)
            .await?;

        txn.commit().await?;
        self.emitter.deliver(pending).await;

        info!(bug_id = created.id, project_id, "bug reported");
        Ok(created)
    }

    pub async fn get_bug(&self, bug_id: i32) -> Result<bug::Model, AppError> {
        store::find_bug(&self.db, bug_id).await
    }

    pub async fn bug_tags(&self, bug_id: i32) -> Result<Vec<String>, AppError> {
        store::find_bug(&self.db, bug_id).await?;
        store::bug_tags(&self.db, bug_id).await
    }

    /// Assigns `worker_id`, or clears the assignee with `None`.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn assign_worker(
        &self,
        bug_id: i32,
        worker_id: Option<i32>,
        actor: &Actor,
    ) -> Result<bug::Model, AppError> {
        let (guard, txn) = self.lock_bug(bug_id).await?;

        let current = store::find_bug(&txn, bug_id).await?;
        self.policy.authorize(Permission::Assign, actor)?;
        if let Some(worker_id) = worker_id {
            store::find_worker(&txn, worker_id).await?;
        }
        if current.assigned_worker_id == worker_id {
            return Ok(current);
        }

        // unassigning notifies the previous assignee
        let recipients = match worker_id {
            Some(_) => self.emitter.worker_user(&txn, worker_id).await?,
            None => self.emitter.assignee(&txn, &current).await?,
        };
        let project_id = current.project_id;

        let mut active = current.into_active_model();
        active.assigned_worker_id = Set(worker_id);
        active.updated_at = Set(Utc::now());
        let updated = store::save_bug(&txn, active).await?;

        let message = match worker_id {
            Some(worker_id) => format!("Bug #{} assigned to worker #{} by {}", bug_id, worker_id, actor),
            None => format!("Bug #{} unassigned by {}", bug_id, actor),
        };
        let pending = self
            .emitter
            .record(&txn, project_id, Some(bug_id), actor, &message, &recipients)
            .await?;

        self.finish(guard, txn, pending).await?;
        Ok(updated)
    }

    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn assign_team(
        &self,
        bug_id: i32,
        team_id: Option<i32>,
        actor: &Actor,
    ) -> Result<bug::Model, AppError> {
        let (guard, txn) = self.lock_bug(bug_id).await?;

        let current = store::find_bug(&txn, bug_id).await?;
        self.policy.authorize(Permission::Assign, actor)?;
        if let Some(team_id) = team_id {
            store::find_team(&txn, team_id).await?;
        }
        if current.assigned_team_id == team_id {
            return Ok(current);
        }

        let recipients = self.emitter.assignee(&txn, &current).await?;
        let project_id = current.project_id;

        let mut active = current.into_active_model();
        active.assigned_team_id = Set(team_id);
        active.updated_at = Set(Utc::now());
        let updated = store::save_bug(&txn, active).await?;

        let message = match team_id {
            Some(team_id) => format!("Bug #{} assigned to team #{} by {}", bug_id, team_id, actor),
            None => format!("Bug #{} unassigned from its team by {}", bug_id, actor),
        };
        let pending = self
            .emitter
            .record(&txn, project_id, Some(bug_id), actor, &message, &recipients)
            .await?;

        self.finish(guard, txn, pending).await?;
        Ok(updated)
    }

    /// Moves the bug into a sprint of its own project, or out of any sprint.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn set_sprint(
        &self,
        bug_id: i32,
        sprint_id: Option<i32>,
        actor: &Actor,
    ) -> Result<bug::Model, AppError> {
        let (guard, txn) = self.lock_bug(bug_id).await?;

        let current = store::find_bug(&txn, bug_id).await?;
        self.policy.authorize(Permission::Edit, actor)?;
        if let Some(sprint_id) = sprint_id {
            let sprint = store::find_sprint(&txn, sprint_id).await?;
            if sprint.project_id != current.project_id {
                return Err(AppError::with_detail(
                    ErrorCode::InvalidSprint,
                    format!("sprint #{} belongs to project #{}", sprint_id, sprint.project_id),
                ));
            }
        }
        if current.sprint_id == sprint_id {
            return Ok(current);
        }

        let (updated, pending) = self.move_to_sprint(&txn, current, sprint_id, actor).await?;

        self.finish(guard, txn, pending).await?;
        Ok(updated)
    }

    /// Detaches every bug from the sprint, each under its own lock and with its
    /// own activity entry, then deletes the sprint. Returns how many bugs were detached.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn delete_sprint(&self, sprint_id: i32, actor: &Actor) -> Result<usize, AppError> {
        store::find_sprint(&self.db, sprint_id).await?;
        self.policy.authorize(Permission::Edit, actor)?;

        let mut detached = 0;
        loop {
            let bug_ids = store::bugs_in_sprint(&self.db, sprint_id).await?;
            if bug_ids.is_empty() {
                break;
            }

            for bug_id in bug_ids {
                let (guard, txn) = self.lock_bug(bug_id).await?;

                let current = match store::find_bug(&txn, bug_id).await {
                    Ok(current) => current,
                    Err(err) if err.code() == ErrorCode::BugNotFound => continue,
                    Err(err) => return Err(err),
                };
                // moved elsewhere since it was listed
                if current.sprint_id != Some(sprint_id) {
                    continue;
                }

                let (_, pending) = self.move_to_sprint(&txn, current, None, actor).await?;
                self.finish(guard, txn, pending).await?;
                detached += 1;
            }
        }

        store::delete_sprint(&self.db, sprint_id).await?;
        info!(sprint_id, detached, "sprint deleted");
        Ok(detached)
    }

    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn add_tag(&self, bug_id: i32, name: &str, actor: &Actor) -> Result<(), AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::with_detail(ErrorCode::ValidationError, "tag name must not be empty"));
        }

        let (guard, txn) = self.lock_bug(bug_id).await?;

        let current = store::find_bug(&txn, bug_id).await?;
        self.policy.authorize(Permission::Edit, actor)?;

        let tag = store::find_or_create_tag(&txn, name).await?;
        if !store::attach_tag(&txn, bug_id, tag.id).await? {
            return Ok(());
        }

        let message = format!("Tag \"{}\" added to bug #{}", name, bug_id);
        let pending = self.touch_and_record(&txn, current, actor, &message).await?;

        self.finish(guard, txn, pending).await
    }

    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn remove_tag(&self, bug_id: i32, name: &str, actor: &Actor) -> Result<(), AppError> {
        let name = name.trim();
        let (guard, txn) = self.lock_bug(bug_id).await?;

        let current = store::find_bug(&txn, bug_id).await?;
        self.policy.authorize(Permission::Edit, actor)?;

        let Some(tag) = store::find_tag(&txn, name).await? else {
            return Ok(());
        };
        if !store::detach_tag(&txn, bug_id, tag.id).await? {
            return Ok(());
        }

        let message = format!("Tag \"{}\" removed from bug #{}", name, bug_id);
        let pending = self.touch_and_record(&txn, current, actor, &message).await?;

        self.finish(guard, txn, pending).await
    }

    /// Stores an opaque file reference against the bug.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn add_attachment(
        &self,
        bug_id: i32,
        file: &str,
        actor: &Actor,
    ) -> Result<bug_attachment::Model, AppError> {
        let file = file.trim();
        if file.is_empty() {
            return Err(AppError::with_detail(ErrorCode::ValidationError, "file reference must not be empty"));
        }

        let (guard, txn) = self.lock_bug(bug_id).await?;

        let current = store::find_bug(&txn, bug_id).await?;
        self.policy.authorize(Permission::Edit, actor)?;

        let attachment = store::insert_attachment(&txn, bug_id, file).await?;

        let message = format!("Attachment \"{}\" added to bug #{}", file, bug_id);
        let pending = self.touch_and_record(&txn, current, actor, &message).await?;

        self.finish(guard, txn, pending).await?;
        Ok(attachment)
    }

    pub async fn list_attachments(&self, bug_id: i32) -> Result<Vec<bug_attachment::Model>, AppError> {
        store::find_bug(&self.db, bug_id).await?;
        store::bug_attachments(&self.db, bug_id).await
    }

    /// Adds `spent` to the worker's running total on the bug.
    #[instrument(skip(self, actor), fields(actor = %actor))]
    pub async fn log_time(
        &self,
        bug_id: i32,
        worker_id: i32,
        spent: Duration,
        actor: &Actor,
    ) -> Result<time_tracking::Model, AppError> {
        if spent < Duration::zero() {
            return Err(AppError::bad_request(ErrorCode::InvalidDuration));
        }

        let (guard, txn) = self.lock_bug(bug_id).await?;

        let current = store::find_bug(&txn, bug_id).await?;
        store::find_worker(&txn, worker_id).await?;
        self.policy.authorize(Permission::LogTime, actor)?;

        let entry = store::add_time(&txn, bug_id, worker_id, spent.num_seconds()).await?;

        let message = format!(
            "{} logged on bug #{} by worker #{}",
            format_duration(spent),
            bug_id,
            worker_id
        );
        let pending = self.touch_and_record(&txn, current, actor, &message).await?;

        self.finish(guard, txn, pending).await?;
        Ok(entry)
    }

    pub async fn time_entries(&self, bug_id: i32) -> Result<Vec<time_tracking::Model>, AppError> {
        store::find_bug(&self.db, bug_id).await?;
        store::time_entries(&self.db, bug_id).await
    }

    /// Activity entries, newest first.
    pub async fn list_activity(&self, scope: ActivityScope) -> Result<Vec<activity_log::Model>, AppError> {
        match scope {
            ActivityScope::Project(project_id) => {
                store::find_project(&self.db, project_id).await?;
            }
            ActivityScope::Bug(bug_id) => {
                store::find_bug(&self.db, bug_id).await?;
            }
        }
        store::list_activity(&self.db, scope).await
    }

    pub async fn list_notifications(&self, user_id: i32) -> Result<Vec<notification::Model>, AppError> {
        store::list_notifications(&self.db, user_id).await
    }

    /// Only the notification's target may mark it read.
    pub async fn mark_notification_read(
        &self,
        notification_id: i32,
        actor: &Actor,
    ) -> Result<notification::Model, AppError> {
        let found = store::find_notification(&self.db, notification_id).await?;
        if actor.user_id != Some(found.user_id) {
            return Err(AppError::forbidden(ErrorCode::NotEnoughPermission));
        }
        store::mark_read(&self.db, found).await
    }

    async fn move_to_sprint(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        current: bug::Model,
        sprint_id: Option<i32>,
        actor: &Actor,
    ) -> Result<(bug::Model, Vec<super::PendingDelivery>), AppError> {
        let recipients = self.emitter.assignee(txn, &current).await?;
        let (bug_id, project_id) = (current.id, current.project_id);

        let mut active = current.into_active_model();
        active.sprint_id = Set(sprint_id);
        active.updated_at = Set(Utc::now());
        let updated = store::save_bug(txn, active).await?;

        let message = match sprint_id {
            Some(sprint_id) => format!("Bug #{} moved to sprint #{}", bug_id, sprint_id),
            None => format!("Bug #{} removed from sprint", bug_id),
        };
        let pending = self
            .emitter
            .record(txn, project_id, Some(bug_id), actor, &message, &recipients)
            .await?;

        Ok((updated, pending))
    }

    /// Bumps `updated_at` and records activity for the assigned worker.
    pub(super) async fn touch_and_record(
        &self,
        txn: &sea_orm::DatabaseTransaction,
        current: bug::Model,
        actor: &Actor,
        message: &str,
    ) -> Result<Vec<super::PendingDelivery>, AppError> {
        let recipients = self.emitter.assignee(txn, &current).await?;
        let (bug_id, project_id) = (current.id, current.project_id);

        let mut active = current.into_active_model();
        active.updated_at = Set(Utc::now());
        store::save_bug(txn, active).await?;

        self.emitter
            .record(txn, project_id, Some(bug_id), actor, message, &recipients)
            .await
    }
}

/// `1h 30m`, `45m`, `20s`. Zero renders as `0s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_compactly() {
        assert_eq!(format_duration(Duration::seconds(0)), "0s");
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::minutes(90)), "1h 30m");
        assert_eq!(format_duration(Duration::seconds(3601)), "1h 1s");
    }
}
