mod common;

use bugvault::model::global_error::ErrorCode;
use bugvault::store::ActivityScope;

use common::Fixture;

#[tokio::test]
async fn reverse_edge_is_rejected_as_cycle() {
    let fx = Fixture::new().await;
    let a = fx.report("A").await;
    let b = fx.report("B").await;

    fx.workflow.add_dependency(a.id, b.id, &fx.dev_actor).await.unwrap();

    let err = fx.workflow.add_dependency(b.id, a.id, &fx.dev_actor).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::CyclicDependency);

    assert_eq!(fx.workflow.list_dependencies(a.id).await.unwrap(), vec![b.id]);
    assert!(fx.workflow.list_dependencies(b.id).await.unwrap().is_empty());
    assert_eq!(fx.workflow.list_dependents(b.id).await.unwrap(), vec![a.id]);
}

#[tokio::test]
async fn transitive_cycle_is_rejected() {
    let fx = Fixture::new().await;
    let a = fx.report("A").await;
    let b = fx.report("B").await;
    let c = fx.report("C").await;

    fx.workflow.add_dependency(a.id, b.id, &fx.dev_actor).await.unwrap();
    fx.workflow.add_dependency(b.id, c.id, &fx.dev_actor).await.unwrap();

    let err = fx.workflow.add_dependency(c.id, a.id, &fx.dev_actor).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::CyclicDependency);

    // a shortcut in the same direction is fine
    fx.workflow.add_dependency(a.id, c.id, &fx.dev_actor).await.unwrap();
    assert_eq!(fx.workflow.list_dependencies(a.id).await.unwrap(), vec![b.id, c.id]);
}

#[tokio::test]
async fn self_dependency_is_rejected_even_for_unknown_bugs() {
    let fx = Fixture::new().await;
    let a = fx.report("A").await;

    let err = fx.workflow.add_dependency(a.id, a.id, &fx.dev_actor).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::SelfDependency);

    let err = fx.workflow.add_dependency(777, 777, &fx.dev_actor).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::SelfDependency);
}

#[tokio::test]
async fn missing_bugs_are_not_found() {
    let fx = Fixture::new().await;
    let a = fx.report("A").await;

    let err = fx.workflow.add_dependency(a.id, 9999, &fx.dev_actor).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BugNotFound);

    let err = fx.workflow.add_dependency(9999, a.id, &fx.dev_actor).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::BugNotFound);
}

#[tokio::test]
async fn duplicate_add_and_repeated_remove_are_idempotent() {
    let fx = Fixture::new().await;
    let a = fx.report_assigned("A").await;
    let b = fx.report("B").await;

    fx.workflow.add_dependency(a.id, b.id, &fx.dev_actor).await.unwrap();
    fx.workflow.add_dependency(a.id, b.id, &fx.dev_actor).await.unwrap();
    assert_eq!(fx.workflow.list_dependencies(a.id).await.unwrap(), vec![b.id]);

    fx.workflow.remove_dependency(a.id, b.id, &fx.dev_actor).await.unwrap();
    fx.workflow.remove_dependency(a.id, b.id, &fx.dev_actor).await.unwrap();
    assert!(fx.workflow.list_dependencies(a.id).await.unwrap().is_empty());

    let messages: Vec<String> = fx
        .workflow
        .list_activity(ActivityScope::Bug(a.id))
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.message)
        .collect();
    assert_eq!(
        messages,
        vec![
            format!("Bug #{} no longer depends on bug #{}", a.id, b.id),
            format!("Bug #{} now depends on bug #{}", a.id, b.id),
            format!("Bug #{} \"A\" reported by {}", a.id, fx.reporter),
        ]
    );

    // the assignee heard about both changes
    let dev_user = fx.dev_actor.user_id.unwrap();
    let notified = fx
        .dispatcher
        .sent()
        .into_iter()
        .filter(|(user, message)| *user == dev_user && message.contains("depends on"))
        .count();
    assert_eq!(notified, 2);
}
