//! Quarantine lifecycle tests: snapshot, escalation, restore and reconcile.

mod common;

use common::{
    ADMIN_ROLE, BOT, Call, GUILD, Harness, MEMBER_ROLE, MockPlatform, OWNER, VIP_ROLE, guild,
    settle,
};
use rxt_core::{LogCategory, MemberKey, RoleId, UserId, ViolationType};
use rxt_security::{
    JsonQuarantineStore, QuarantineStore, RestoreOutcome, RestoreTrigger, SecurityErrorKind,
};
use std::sync::Arc;
use std::time::Duration;

const BASE: Duration = Duration::from_secs(3600);

fn key(user: u64) -> MemberKey {
    MemberKey::new(GUILD, UserId::new(user))
}

#[tokio::test]
async fn test_first_offence_snapshots_and_strips_roles() {
    let h = Harness::new();
    let target = h.join(1, &[MEMBER_ROLE, VIP_ROLE]);

    let outcome = h
        .engine
        .manager()
        .apply_quarantine(&guild(), &target, "testing", ViolationType::Spam)
        .await
        .unwrap();

    assert_eq!(outcome.violations, 1);
    assert_eq!(outcome.duration, BASE);
    assert!(!outcome.repeat_offence);
    assert_eq!(outcome.snapshot_roles, vec![MEMBER_ROLE, VIP_ROLE]);

    let config = h.config().await;
    let quarantine_role = config.quarantine_role_id.expect("role cached");
    assert_eq!(h.platform.roles_of(target.user_id), vec![quarantine_role]);
    assert!(h.platform.is_timed_out(target.user_id));
    assert!(h.engine.manager().is_quarantined(key(1)).await);
    assert_eq!(h.store.load_all().await.unwrap().len(), 1);
    assert_eq!(h.sink.count(LogCategory::QuarantineApplied), 1);
}

#[tokio::test]
async fn test_resources_created_once_and_cached() {
    let h = Harness::new();
    let first = h.join(1, &[MEMBER_ROLE]);
    let second = h.join(2, &[MEMBER_ROLE]);
    let manager = h.engine.manager();

    manager
        .apply_quarantine(&guild(), &first, "a", ViolationType::Spam)
        .await
        .unwrap();
    manager
        .apply_quarantine(&guild(), &second, "b", ViolationType::Spam)
        .await
        .unwrap();

    let creates = h
        .platform
        .count_calls(|c| matches!(c, Call::CreateRole(_) | Call::CreateCategory(_) | Call::CreateChannel(..)));
    assert_eq!(creates, 3);

    let config = h.config().await;
    assert!(config.quarantine_role_id.is_some());
    assert!(config.quarantine_category_id.is_some());
    assert!(config.quarantine_channel_id.is_some());

    let channel_parent = h.platform.calls().into_iter().find_map(|c| match c {
        Call::CreateChannel(_, parent) => Some(parent),
        _ => None,
    });
    assert_eq!(channel_parent, Some(config.quarantine_category_id));
}

#[tokio::test]
async fn test_new_role_is_hidden_from_existing_channels() {
    let h = Harness::new();
    let target = h.join(1, &[]);
    h.engine
        .manager()
        .apply_quarantine(&guild(), &target, "a", ViolationType::Spam)
        .await
        .unwrap();

    assert_eq!(
        h.platform
            .count_calls(|c| *c == Call::SetOverwrite(common::GENERAL)),
        1
    );
}

#[tokio::test]
async fn test_deleted_quarantine_role_is_recreated() {
    let h = Harness::new();
    let first = h.join(1, &[]);
    h.engine
        .manager()
        .apply_quarantine(&guild(), &first, "a", ViolationType::Spam)
        .await
        .unwrap();
    let old_role = h.config().await.quarantine_role_id.unwrap();
    h.platform.delete_role(old_role);

    let second = h.join(2, &[]);
    h.engine
        .manager()
        .apply_quarantine(&guild(), &second, "b", ViolationType::Spam)
        .await
        .unwrap();

    let new_role = h.config().await.quarantine_role_id.unwrap();
    assert_ne!(new_role, old_role);
    assert_eq!(h.platform.count_calls(|c| matches!(c, Call::CreateRole(_))), 2);
    assert_eq!(h.platform.roles_of(second.user_id), vec![new_role]);
}

#[tokio::test]
async fn test_role_creation_failure_skips_quarantine() {
    let h = Harness::new();
    h.platform.fail_role_creation();
    let target = h.join(1, &[MEMBER_ROLE]);

    let err = h
        .engine
        .manager()
        .apply_quarantine(&guild(), &target, "a", ViolationType::Spam)
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), SecurityErrorKind::Configuration(_)));
    assert_eq!(h.platform.roles_of(target.user_id), vec![MEMBER_ROLE]);
    assert!(!h.engine.manager().is_quarantined(key(1)).await);
}

#[tokio::test]
async fn test_repeat_offence_escalates_and_keeps_snapshot() {
    let h = Harness::new();
    let target = h.join(1, &[MEMBER_ROLE, VIP_ROLE]);
    let manager = h.engine.manager();

    manager
        .apply_quarantine(&guild(), &target, "first", ViolationType::Spam)
        .await
        .unwrap();
    let quarantined = h.platform.member_view(target.user_id);
    let second = manager
        .apply_quarantine(&guild(), &quarantined, "second", ViolationType::Link)
        .await
        .unwrap();
    let third = manager
        .apply_quarantine(&guild(), &quarantined, "third", ViolationType::Spam)
        .await
        .unwrap();

    assert_eq!(second.violations, 2);
    assert_eq!(second.duration, BASE * 2);
    assert!(second.repeat_offence);
    assert_eq!(second.snapshot_roles, vec![MEMBER_ROLE, VIP_ROLE]);
    assert_eq!(third.violations, 3);
    assert_eq!(third.duration, BASE * 3);

    let entry = manager.status(key(1)).await.unwrap();
    assert_eq!(entry.snapshot().role_ids(), &vec![MEMBER_ROLE, VIP_ROLE]);
    assert_eq!(*entry.record().violation_type(), ViolationType::Spam);
}

#[tokio::test]
async fn test_managed_roles_are_not_snapshotted() {
    let h = Harness::new();
    let booster = RoleId::new(90);
    h.platform.insert_managed_role(booster, "Booster");
    let target = h.join(1, &[MEMBER_ROLE, booster]);

    let outcome = h
        .engine
        .manager()
        .apply_quarantine(&guild(), &target, "a", ViolationType::Spam)
        .await
        .unwrap();

    assert_eq!(outcome.snapshot_roles, vec![MEMBER_ROLE]);
    assert!(h.platform.roles_of(target.user_id).contains(&booster));
}

#[tokio::test]
async fn test_owner_and_engine_cannot_be_quarantined() {
    let h = Harness::new();
    for user in [OWNER, BOT] {
        let view = common::member(user.get(), &[ADMIN_ROLE]);
        let err = h
            .engine
            .manager()
            .apply_quarantine(&guild(), &view, "nope", ViolationType::Manual)
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), SecurityErrorKind::InvalidTarget { .. }));
    }
}

#[tokio::test(start_paused = true)]
async fn test_scheduled_restore_fires_after_duration() {
    let h = Harness::new();
    let target = h.join(1, &[MEMBER_ROLE, VIP_ROLE]);
    h.engine
        .manager()
        .apply_quarantine(&guild(), &target, "a", ViolationType::Spam)
        .await
        .unwrap();

    tokio::time::sleep(BASE - Duration::from_secs(1)).await;
    settle().await;
    assert!(h.engine.manager().is_quarantined(key(1)).await);

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;

    assert!(!h.engine.manager().is_quarantined(key(1)).await);
    let mut roles = h.platform.roles_of(target.user_id);
    roles.sort();
    assert_eq!(roles, vec![MEMBER_ROLE, VIP_ROLE]);
    assert!(!h.platform.is_timed_out(target.user_id));
    assert!(h.store.load_all().await.unwrap().is_empty());
    assert_eq!(h.sink.count(LogCategory::QuarantineRestored), 1);
}

#[tokio::test(start_paused = true)]
async fn test_escalation_rearms_timer() {
    let h = Harness::new();
    let target = h.join(1, &[MEMBER_ROLE]);
    let manager = h.engine.manager();
    manager
        .apply_quarantine(&guild(), &target, "a", ViolationType::Spam)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_secs(1800)).await;
    let quarantined = h.platform.member_view(target.user_id);
    manager
        .apply_quarantine(&guild(), &quarantined, "b", ViolationType::Spam)
        .await
        .unwrap();

    // The first timer would have fired at 3600s.
    tokio::time::sleep(Duration::from_secs(1900)).await;
    settle().await;
    assert!(manager.is_quarantined(key(1)).await);

    // The escalated quarantine lasts 7200s from the second offence.
    tokio::time::sleep(Duration::from_secs(5400)).await;
    settle().await;
    assert!(!manager.is_quarantined(key(1)).await);
    assert_eq!(h.platform.roles_of(target.user_id), vec![MEMBER_ROLE]);
}

#[tokio::test]
async fn test_stale_generation_is_ignored() {
    let h = Harness::new();
    let target = h.join(1, &[MEMBER_ROLE]);
    let manager = h.engine.manager();
    manager
        .apply_quarantine(&guild(), &target, "a", ViolationType::Spam)
        .await
        .unwrap();
    let first_generation = *manager.status(key(1)).await.unwrap().record().generation();

    let quarantined = h.platform.member_view(target.user_id);
    manager
        .apply_quarantine(&guild(), &quarantined, "b", ViolationType::Spam)
        .await
        .unwrap();

    let outcome = manager
        .restore(
            key(1),
            RestoreTrigger::Scheduled {
                generation: first_generation,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, RestoreOutcome::Stale);
    assert!(manager.is_quarantined(key(1)).await);
}

#[tokio::test]
async fn test_manual_release_restores_and_is_idempotent() {
    let h = Harness::new();
    let target = h.join(1, &[MEMBER_ROLE, VIP_ROLE]);
    let manager = h.engine.manager();
    manager
        .apply_quarantine(&guild(), &target, "a", ViolationType::Spam)
        .await
        .unwrap();

    let report = manager
        .remove_quarantine_manual(key(1), Some(OWNER))
        .await
        .unwrap();
    assert_eq!(report.roles_restored, vec![MEMBER_ROLE, VIP_ROLE]);
    assert!(report.roles_skipped.is_empty());
    assert_eq!(manager.pending_restores(), 0);

    h.platform.clear_calls();
    let again = manager
        .restore(key(1), RestoreTrigger::Manual { moderator: None })
        .await
        .unwrap();
    assert_eq!(again, RestoreOutcome::NotQuarantined);
    assert!(h.platform.calls().is_empty());

    let err = manager
        .remove_quarantine_manual(key(1), Some(OWNER))
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), SecurityErrorKind::NotQuarantined(_)));
}

#[tokio::test]
async fn test_restore_skips_deleted_roles() {
    let h = Harness::new();
    let target = h.join(1, &[MEMBER_ROLE, VIP_ROLE]);
    let manager = h.engine.manager();
    manager
        .apply_quarantine(&guild(), &target, "a", ViolationType::Spam)
        .await
        .unwrap();
    h.platform.delete_role(VIP_ROLE);

    let report = manager.remove_quarantine_manual(key(1), None).await.unwrap();

    assert_eq!(report.roles_restored, vec![MEMBER_ROLE]);
    assert_eq!(report.roles_skipped, vec![VIP_ROLE]);
    assert!(report.failed_actions.is_empty());
    assert_eq!(h.platform.roles_of(target.user_id), vec![MEMBER_ROLE]);
}

#[tokio::test]
async fn test_concurrent_offences_count_every_violation() {
    let h = Harness::new();
    let target = h.join(1, &[MEMBER_ROLE]);
    let manager = h.engine.manager().clone();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let manager = manager.clone();
        let target = target.clone();
        handles.push(tokio::spawn(async move {
            manager
                .apply_quarantine(&guild(), &target, "burst", ViolationType::Spam)
                .await
                .unwrap()
        }));
    }
    let mut counts: Vec<u32> = Vec::new();
    for handle in handles {
        counts.push(handle.await.unwrap().violations);
    }
    counts.sort();

    assert_eq!(counts, vec![1, 2, 3, 4, 5]);
    let entry = manager.status(key(1)).await.unwrap();
    assert_eq!(entry.snapshot().role_ids(), &vec![MEMBER_ROLE]);
    assert_eq!(h.platform.count_calls(|c| matches!(c, Call::CreateRole(_))), 1);
}

#[tokio::test]
async fn test_reconcile_restores_expired_and_reschedules_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quarantine.json");
    let platform = Arc::new(MockPlatform::new());

    {
        let store = Arc::new(JsonQuarantineStore::open(&path).await.unwrap());
        let h = Harness::build(platform.clone(), store);
        let expired = h.join(1, &[MEMBER_ROLE]);
        let active = h.join(2, &[VIP_ROLE]);
        let manager = h.engine.manager();
        manager
            .apply_quarantine(&guild(), &expired, "a", ViolationType::Spam)
            .await
            .unwrap();
        manager
            .apply_quarantine(&guild(), &active, "b", ViolationType::Spam)
            .await
            .unwrap();
        manager.shutdown();
    }

    // Expire the first entry as if the process had been down past its end.
    let json = std::fs::read_to_string(&path).unwrap();
    let mut doc: serde_json::Value = serde_json::from_str(&json).unwrap();
    for entry in doc.as_array_mut().unwrap() {
        if entry["snapshot"]["user_id"] == 1 {
            entry["record"]["quarantine_until"] = "2020-01-01T00:00:00Z".into();
        }
    }
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

    let store = Arc::new(JsonQuarantineStore::open(&path).await.unwrap());
    let h = Harness::build(platform.clone(), store);
    let report = h.engine.reconcile().await.unwrap();

    assert_eq!(report.restored, 1);
    assert_eq!(report.rescheduled, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(platform.roles_of(UserId::new(1)), vec![MEMBER_ROLE]);
    assert!(!h.engine.manager().is_quarantined(key(1)).await);
    assert!(h.engine.manager().is_quarantined(key(2)).await);
    assert_eq!(h.engine.manager().pending_restores(), 1);

    let reopened = JsonQuarantineStore::open(&path).await.unwrap();
    let remaining = reopened.load_all().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].key(), key(2));
}

#[tokio::test]
async fn test_reconcile_continues_generations() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quarantine.json");
    let platform = Arc::new(MockPlatform::new());

    let first_generation = {
        let store = Arc::new(JsonQuarantineStore::open(&path).await.unwrap());
        let h = Harness::build(platform.clone(), store);
        let target = h.join(1, &[MEMBER_ROLE]);
        h.engine
            .manager()
            .apply_quarantine(&guild(), &target, "a", ViolationType::Spam)
            .await
            .unwrap();
        h.engine.manager().shutdown();
        *h.engine
            .manager()
            .status(key(1))
            .await
            .unwrap()
            .record()
            .generation()
    };

    let store = Arc::new(JsonQuarantineStore::open(&path).await.unwrap());
    let h = Harness::build(platform.clone(), store);
    h.engine.reconcile().await.unwrap();
    let other = h.join(2, &[]);
    h.engine
        .manager()
        .apply_quarantine(&guild(), &other, "b", ViolationType::Spam)
        .await
        .unwrap();

    let generation = *h
        .engine
        .manager()
        .status(key(2))
        .await
        .unwrap()
        .record()
        .generation();
    assert!(generation > first_generation);
}
