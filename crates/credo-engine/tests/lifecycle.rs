//! End-to-end scenarios for the transition engine over the in-memory
//! backend: first transition, timed SLA measurement, no-op idempotence,
//! append-only history, and racing writers.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use credo_core::{ApplicationId, ApplicationStatus, ProfileId};
use credo_engine::{
    LifecycleStore, MemoryStore, SlaAggregator, TransitionEngine, TransitionRequest,
};

fn t(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, 9, minute, 0).unwrap()
}

fn setup() -> (Arc<MemoryStore>, TransitionEngine, ApplicationId, ProfileId) {
    let store = Arc::new(MemoryStore::new());
    let engine = TransitionEngine::new(Arc::clone(&store) as Arc<dyn LifecycleStore>);
    let id = ApplicationId::new();
    store.register_application(id);
    (store, engine, id, ProfileId::new())
}

fn req(id: ApplicationId, status: ApplicationStatus, actor: ProfileId) -> TransitionRequest {
    TransitionRequest {
        application_id: id,
        status,
        note: None,
        changed_by: actor,
    }
}

#[tokio::test]
async fn fresh_application_first_transition_has_no_sla() {
    let (_store, engine, id, actor) = setup();

    let outcome = engine
        .record_transition_at(req(id, ApplicationStatus::InReview, actor), t(0))
        .await
        .unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.record.status, ApplicationStatus::InReview);
    assert_eq!(outcome.record.note, "status changed to IN_REVIEW");
    assert!(outcome.sla.is_none());
}

#[tokio::test]
async fn ten_minute_review_produces_ten_minute_sla() {
    let (_store, engine, id, actor) = setup();

    engine
        .record_transition_at(req(id, ApplicationStatus::InReview, actor), t(0))
        .await
        .unwrap();
    let outcome = engine
        .record_transition_at(req(id, ApplicationStatus::Approved, actor), t(10))
        .await
        .unwrap();

    let sla = outcome.sla.expect("status change must produce an SLA record");
    assert_eq!(sla.from_status, ApplicationStatus::InReview);
    assert_eq!(sla.to_status, ApplicationStatus::Approved);
    assert_eq!(sla.duration_minutes, 10);
    assert_eq!(sla.started_at, t(0));
    assert_eq!(sla.ended_at, t(10));
}

#[tokio::test]
async fn repeated_approval_is_idempotent() {
    let (store, engine, id, actor) = setup();

    let first = engine
        .record_transition_at(req(id, ApplicationStatus::Approved, actor), t(0))
        .await
        .unwrap();
    let second = engine
        .record_transition_at(req(id, ApplicationStatus::Approved, actor), t(30))
        .await
        .unwrap();

    assert!(!second.changed);
    assert!(second.sla.is_none());
    assert_eq!(second.record.id, first.record.id);
    assert_eq!(store.total_status_records(), 1);
    assert!(store.sla_for(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn history_is_append_only_across_transitions() {
    let (_store, engine, id, actor) = setup();

    engine
        .record_transition_at(req(id, ApplicationStatus::Submitted, actor), t(0))
        .await
        .unwrap();
    engine
        .record_transition_at(req(id, ApplicationStatus::InReview, actor), t(5))
        .await
        .unwrap();

    let before = engine.history(id).await.unwrap();

    engine
        .record_transition_at(req(id, ApplicationStatus::Rejected, actor), t(12))
        .await
        .unwrap();

    let after = engine.history(id).await.unwrap();
    assert_eq!(after.len(), before.len() + 1);
    // Every record that existed before is still present, byte for byte.
    for record in &before {
        assert!(after.contains(record), "existing record was mutated or removed");
    }
    // Oldest-first timestamps are monotonically non-decreasing.
    let mut oldest_first = after.clone();
    oldest_first.reverse();
    for pair in oldest_first.windows(2) {
        assert!(pair[1].created_at >= pair[0].created_at);
    }
}

#[tokio::test]
async fn permissive_workflow_allows_leaving_terminal_statuses() {
    let (_store, engine, id, actor) = setup();

    for status in [
        ApplicationStatus::Approved,
        ApplicationStatus::Submitted,
        ApplicationStatus::Rejected,
        ApplicationStatus::InReview,
    ] {
        let outcome = engine
            .record_transition(req(id, status, actor))
            .await
            .unwrap();
        assert!(outcome.changed);
    }
    assert_eq!(engine.history(id).await.unwrap().len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_writers_produce_a_consistent_sla_chain() {
    let (store, engine, id, actor) = setup();

    engine
        .record_transition(req(id, ApplicationStatus::Submitted, actor))
        .await
        .unwrap();

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .record_transition(req(id, ApplicationStatus::InReview, actor))
                .await
        })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .record_transition(req(id, ApplicationStatus::Approved, actor))
                .await
        })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Both writers committed: the initial record plus exactly two more.
    let history = engine.history(id).await.unwrap();
    assert_eq!(history.len(), 3);

    // Exactly two SLA records, each measuring against the record that was
    // actually latest when its transaction committed.
    let sla = store.sla_for(id).await.unwrap();
    assert_eq!(sla.len(), 2);
    assert_eq!(sla[0].from_status, ApplicationStatus::Submitted);
    assert_eq!(sla[1].from_status, sla[0].to_status);

    let latest = engine.latest(id).await.unwrap().unwrap();
    assert_eq!(latest.status, sla[1].to_status);

    for record in &sla {
        assert!(record.duration_minutes >= 0);
    }
}

#[tokio::test]
async fn aggregator_matches_engine_output() {
    let (store, engine, id, actor) = setup();

    engine
        .record_transition_at(req(id, ApplicationStatus::Submitted, actor), t(0))
        .await
        .unwrap();
    engine
        .record_transition_at(req(id, ApplicationStatus::InReview, actor), t(15))
        .await
        .unwrap();
    engine
        .record_transition_at(req(id, ApplicationStatus::Approved, actor), t(45))
        .await
        .unwrap();

    let aggregator = SlaAggregator::new(store as Arc<dyn LifecycleStore>);
    let summary = aggregator.summarize(id).await.unwrap();
    assert_eq!(summary.total_duration_minutes, 45);
    assert_eq!(summary.total_duration_hours, "0.75");
    assert_eq!(summary.transitions.len(), 2);

    let all = aggregator.summarize_all().await.unwrap();
    assert_eq!(all.len(), 2);
}
