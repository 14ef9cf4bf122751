#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use bugvault::configuration::WorkflowSettings;
use bugvault::db::migrate;
use bugvault::entity::worker::WorkerRole;
use bugvault::entity::{bug, project, worker};
use bugvault::model::auth::Actor;
use bugvault::model::bug::NewBug;
use bugvault::store;
use bugvault::util::{DispatchError, NotificationDispatcher};
use bugvault::workflow::{AccessPolicy, BugWorkflow};

/// Captures every delivery so tests can assert on who was notified.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<(i32, String)>>,
}

impl RecordingDispatcher {
    pub fn sent(&self) -> Vec<(i32, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn deliver(&self, target_user_id: i32, message: &str) -> Result<(), DispatchError> {
        self.sent.lock().unwrap().push((target_user_id, message.to_string()));
        Ok(())
    }
}

/// Always fails, like an unreachable webhook.
pub struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn deliver(&self, _target_user_id: i32, _message: &str) -> Result<(), DispatchError> {
        let err = reqwest::Client::new()
            .get("http://")
            .build()
            .expect_err("an empty host is rejected");
        Err(DispatchError::Http(err))
    }
}

pub async fn memory_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:".to_owned());
    // one connection keeps the in-memory database alive and shared
    options
        .max_connections(1)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);

    let db = Database::connect(options).await.unwrap();
    migrate(&db).await.unwrap();
    db
}

pub struct Fixture {
    pub workflow: Arc<BugWorkflow>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub project: project::Model,
    pub developer: worker::Model,
    pub tester: worker::Model,
    pub reporter: Actor,
    pub dev_actor: Actor,
    pub tester_actor: Actor,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with(AccessPolicy::permissive(), WorkflowSettings::default()).await
    }

    pub async fn with(policy: AccessPolicy, settings: WorkflowSettings) -> Self {
        let db = memory_db().await;

        let reporter_user = store::create_user(&db, "reporter", "reporter@example.com", "reporter").await.unwrap();
        let dev_user = store::create_user(&db, "dev", "dev@example.com", "developer").await.unwrap();
        let tester_user = store::create_user(&db, "qa", "qa@example.com", "tester").await.unwrap();

        let workspace = store::create_workspace(&db, "acme", Some("test workspace")).await.unwrap();
        let team = store::create_team(&db, workspace.id, "core").await.unwrap();
        let developer = store::create_worker(&db, dev_user.id, Some(team.id), WorkerRole::Developer)
            .await
            .unwrap();
        let tester = store::create_worker(&db, tester_user.id, Some(team.id), WorkerRole::Tester)
            .await
            .unwrap();
        let project = store::create_project(&db, workspace.id, "tracker", Some(team.id)).await.unwrap();

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let workflow = Arc::new(BugWorkflow::new(db, dispatcher.clone(), policy, settings));

        Self {
            workflow,
            dispatcher,
            project,
            developer,
            tester,
            reporter: Actor::user(reporter_user.id, "reporter"),
            dev_actor: Actor::user(dev_user.id, "developer"),
            tester_actor: Actor::user(tester_user.id, "tester"),
        }
    }

    pub async fn report(&self, title: &str) -> bug::Model {
        let fields = NewBug {
            title: title.to_string(),
            ..Default::default()
        };
        self.workflow
            .create_bug(self.project.id, fields, &self.reporter)
            .await
            .unwrap()
    }

    pub async fn report_assigned(&self, title: &str) -> bug::Model {
        let fields = NewBug {
            title: title.to_string(),
            assigned_worker_id: Some(self.developer.id),
            ..Default::default()
        };
        self.workflow
            .create_bug(self.project.id, fields, &self.reporter)
            .await
            .unwrap()
    }

    /// Moves a fresh bug through open -> in_progress -> resolved.
    pub async fn resolve(&self, bug_id: i32) -> bug::Model {
        use bugvault::entity::bug::BugStatus;

        self.workflow
            .transition_bug(bug_id, BugStatus::InProgress, &self.dev_actor)
            .await
            .unwrap();
        self.workflow
            .transition_bug(bug_id, BugStatus::Resolved, &self.dev_actor)
            .await
            .unwrap()
    }
}
