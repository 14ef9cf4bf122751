mod common;

use chrono::Duration;

use bugvault::entity::bug::BugStatus;
use bugvault::store::ActivityScope;
use bugvault::workflow::SweepReport;

use common::Fixture;

#[tokio::test]
async fn sweep_closes_only_after_the_deadline() {
    let fx = Fixture::new().await;
    let bug = fx.report_assigned("Auto close me").await;
    let resolved = fx.resolve(bug.id).await;
    let resolved_at = resolved.resolved_at.unwrap();

    let early = fx
        .workflow
        .sweep(resolved_at + Duration::days(7) - Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(early, SweepReport::default());
    assert_eq!(fx.workflow.get_bug(bug.id).await.unwrap().status, BugStatus::Resolved);

    let due = fx
        .workflow
        .sweep(resolved_at + Duration::days(7) + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(due.closed, 1);
    assert_eq!(due.failed, 0);

    let closed = fx.workflow.get_bug(bug.id).await.unwrap();
    assert_eq!(closed.status, BugStatus::Closed);
    assert_eq!(closed.resolved_at, Some(resolved_at));
    assert!(closed.auto_close_at.is_none());

    let close_entries: Vec<_> = fx
        .workflow
        .list_activity(ActivityScope::Bug(bug.id))
        .await
        .unwrap()
        .into_iter()
        .filter(|entry| entry.message == "Status changed from resolved to closed by system")
        .collect();
    assert_eq!(close_entries.len(), 1);
    assert!(close_entries[0].worker_id.is_none());

    // a later sweep finds nothing to do
    let again = fx
        .workflow
        .sweep(resolved_at + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(again, SweepReport::default());
}

#[tokio::test]
async fn reopened_bug_is_not_closed() {
    let fx = Fixture::new().await;
    let bug = fx.report("Came back").await;
    let resolved = fx.resolve(bug.id).await;
    let resolved_at = resolved.resolved_at.unwrap();

    fx.workflow
        .transition_bug(bug.id, BugStatus::Open, &fx.tester_actor)
        .await
        .unwrap();

    let report = fx.workflow.sweep(resolved_at + Duration::days(8)).await.unwrap();
    assert_eq!(report.closed, 0);
    assert_eq!(fx.workflow.get_bug(bug.id).await.unwrap().status, BugStatus::Open);
}

#[tokio::test]
async fn re_resolving_restarts_the_clock() {
    let fx = Fixture::new().await;
    let bug = fx.report("Flaky").await;
    let first = fx.resolve(bug.id).await;

    fx.workflow
        .transition_bug(bug.id, BugStatus::Open, &fx.tester_actor)
        .await
        .unwrap();
    let second = fx.resolve(bug.id).await;
    assert!(second.resolved_at.unwrap() >= first.resolved_at.unwrap());

    let deadline = second.auto_close_at.unwrap();
    let report = fx.workflow.sweep(deadline - Duration::seconds(1)).await.unwrap();
    assert_eq!(report.closed, 0);

    let report = fx.workflow.sweep(deadline).await.unwrap();
    assert_eq!(report.closed, 1);
}

#[tokio::test]
async fn sweep_handles_each_bug_independently() {
    let fx = Fixture::new().await;
    let first = fx.report("One").await;
    let second = fx.report("Two").await;
    let open = fx.report("Still open").await;

    let r1 = fx.resolve(first.id).await;
    let r2 = fx.resolve(second.id).await;
    let latest = r1.auto_close_at.unwrap().max(r2.auto_close_at.unwrap());

    let report = fx.workflow.sweep(latest + Duration::seconds(1)).await.unwrap();
    assert_eq!(report.closed, 2);
    assert_eq!(fx.workflow.get_bug(open.id).await.unwrap().status, BugStatus::Open);
}
