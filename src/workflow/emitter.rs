use std::sync::Arc;

use sea_orm::ConnectionTrait;
use tracing::{debug, warn};

use crate::entity::bug;
use crate::model::auth::Actor;
use crate::model::global_error::AppError;
use crate::store;
use crate::util::NotificationDispatcher;

/// A notification row that still has to be pushed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelivery {
    pub user_id: i32,
    pub message: String,
}

pub struct ActivityEmitter {
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl ActivityEmitter {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// User behind the worker currently assigned to `bug`, if any.
    pub async fn assignee<C: ConnectionTrait>(&self, conn: &C, bug: &bug::Model) -> Result<Vec<i32>, AppError> {
        self.worker_user(conn, bug.assigned_worker_id).await
    }

    pub async fn worker_user<C: ConnectionTrait>(
        &self,
        conn: &C,
        worker_id: Option<i32>,
    ) -> Result<Vec<i32>, AppError> {
        match worker_id {
            Some(worker_id) => Ok(vec![store::find_worker(conn, worker_id).await?.user_id]),
            None => Ok(Vec::new()),
        }
    }

    /// Assigned worker plus the reporter, without duplicates.
    pub async fn watchers<C: ConnectionTrait>(&self, conn: &C, bug: &bug::Model) -> Result<Vec<i32>, AppError> {
        let mut users = self.assignee(conn, bug).await?;
        if let Some(reporter) = bug.reported_by {
            if !users.contains(&reporter) {
                users.push(reporter);
            }
        }
        Ok(users)
    }

    /// Appends the activity entry and one notification per recipient inside
    /// the caller's transaction.
    pub async fn record<C: ConnectionTrait>(
        &self,
        conn: &C,
        project_id: i32,
        bug_id: Option<i32>,
        actor: &Actor,
        message: &str,
        recipients: &[i32],
    ) -> Result<Vec<PendingDelivery>, AppError> {
        let worker_id = match actor.user_id {
            Some(user_id) => store::find_worker_by_user(conn, user_id).await?.map(|w| w.id),
            None => None,
        };

        store::insert_activity(conn, project_id, bug_id, worker_id, message).await?;

        let mut pending = Vec::with_capacity(recipients.len());
        for &user_id in recipients {
            store::insert_notification(conn, user_id, message).await?;
            pending.push(PendingDelivery {
                user_id,
                message: message.to_string(),
            });
        }

        Ok(pending)
    }

    /// Best effort. Failures are logged and otherwise ignored.
    pub async fn deliver(&self, pending: Vec<PendingDelivery>) {
        for delivery in pending {
            match self.dispatcher.deliver(delivery.user_id, &delivery.message).await {
                Ok(()) => debug!(user_id = delivery.user_id, "notification delivered"),
                Err(err) => warn!(
                    user_id = delivery.user_id,
                    error = %err,
                    "notification delivery failed"
                ),
            }
        }
    }
}
