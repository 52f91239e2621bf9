//! Administrative surface tests.

mod common;

use common::{Call, GUILD, Harness, MEMBER_ROLE, OWNER, VIP_ROLE, guild};
use rxt_config::Threshold;
use rxt_core::{ChannelId, Detector, LogCategory, RoleId, UserId, ViolationType};
use rxt_security::SecurityErrorKind;

#[tokio::test]
async fn test_whitelist_toggles_report_changes() {
    let h = Harness::new();
    let admin = h.engine.admin();
    let user = UserId::new(5);

    assert!(admin.whitelist_user(GUILD, user).await.unwrap());
    assert!(!admin.whitelist_user(GUILD, user).await.unwrap());
    assert!(h.config().await.whitelist_users.contains(&user));
    assert_eq!(h.sink.count(LogCategory::ConfigChanged), 1);

    assert!(admin.unwhitelist_user(GUILD, user).await.unwrap());
    assert!(!admin.unwhitelist_user(GUILD, user).await.unwrap());
    assert!(h.config().await.whitelist_users.is_empty());
    assert_eq!(h.sink.count(LogCategory::ConfigChanged), 2);
}

#[tokio::test]
async fn test_role_and_bot_whitelists() {
    let h = Harness::new();
    let admin = h.engine.admin();
    let bot = UserId::new(77);

    assert!(admin.whitelist_role(GUILD, VIP_ROLE).await.unwrap());
    assert!(admin.whitelist_bot(GUILD, bot).await.unwrap());
    let config = h.config().await;
    assert!(config.whitelist_roles.contains(&VIP_ROLE));
    assert!(config.whitelist_bots.contains(&bot));

    let vip = h.join(6, &[VIP_ROLE]);
    assert!(admin.is_whitelisted(&guild(), &vip).await.unwrap());

    assert!(admin.unwhitelist_role(GUILD, VIP_ROLE).await.unwrap());
    assert!(admin.unwhitelist_bot(GUILD, bot).await.unwrap());
    assert!(!admin.is_whitelisted(&guild(), &vip).await.unwrap());
}

#[tokio::test]
async fn test_zero_threshold_is_rejected() {
    let h = Harness::new();
    let admin = h.engine.admin();

    let err = admin
        .set_threshold(GUILD, Threshold::SpamMsgThreshold, 0)
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), SecurityErrorKind::Configuration(_)));
    assert_eq!(h.config().await.spam_msg_threshold, 5);
    assert_eq!(h.sink.count(LogCategory::ConfigChanged), 0);

    let updated = admin
        .set_threshold(GUILD, Threshold::SpamMsgThreshold, 3)
        .await
        .unwrap();
    assert_eq!(updated.spam_msg_threshold, 3);
}

#[tokio::test]
async fn test_out_of_range_threshold_is_rejected() {
    let h = Harness::new();

    let err = h
        .engine
        .admin()
        .set_threshold(GUILD, Threshold::RaidJoinCount, u64::MAX)
        .await
        .unwrap_err();

    assert!(matches!(err.kind(), SecurityErrorKind::Configuration(_)));
}

#[tokio::test]
async fn test_zero_base_duration_skips_timeout() {
    let h = Harness::new();
    let admin = h.engine.admin();
    admin
        .set_threshold(GUILD, Threshold::QuarantineBaseDurationSecs, 0)
        .await
        .unwrap();
    let target = h.join(2, &[MEMBER_ROLE]);

    let outcome = admin
        .apply_quarantine(&guild(), &target, OWNER, "cooling off")
        .await
        .unwrap();

    assert!(outcome.duration.is_zero());
    assert_eq!(h.platform.count_calls(|c| matches!(c, Call::Timeout(_))), 0);
}

#[tokio::test]
async fn test_detector_and_master_switches() {
    let h = Harness::new();
    let admin = h.engine.admin();

    let config = admin
        .set_detector_enabled(GUILD, Detector::Webhook, false)
        .await
        .unwrap();
    assert!(!config.detector_enabled(Detector::Webhook));
    assert!(config.detector_enabled(Detector::Spam));

    let config = admin.set_enabled(GUILD, false).await.unwrap();
    assert!(!config.detector_enabled(Detector::Spam));
    assert_eq!(h.sink.count(LogCategory::ConfigChanged), 2);
}

#[tokio::test]
async fn test_moderator_role_and_log_channel() {
    let h = Harness::new();
    let admin = h.engine.admin();
    let role = RoleId::new(70);
    let channel = ChannelId::new(700);

    admin.set_main_moderator_role(GUILD, Some(role)).await.unwrap();
    admin.set_log_channel(GUILD, Some(channel)).await.unwrap();
    let config = admin.config(GUILD).await.unwrap();
    assert_eq!(config.main_moderator_role_id, Some(role));
    assert_eq!(config.log_channel_id, Some(channel));

    admin.set_log_channel(GUILD, None).await.unwrap();
    assert_eq!(h.config().await.log_channel_id, None);
}

#[tokio::test]
async fn test_manual_quarantine_status_and_release() {
    let h = Harness::new();
    let admin = h.engine.admin();
    let target = h.join(2, &[MEMBER_ROLE, VIP_ROLE]);

    let outcome = admin
        .apply_quarantine(&guild(), &target, OWNER, "raid cleanup")
        .await
        .unwrap();
    assert_eq!(outcome.violation_type, ViolationType::Manual);

    let entry = admin.status(GUILD, target.user_id).await.unwrap();
    assert_eq!(*entry.record().violations(), 1);
    assert!(entry.record().reason().contains("raid cleanup"));
    assert!(entry.record().reason().contains(&format!("<@{}>", OWNER)));

    let report = admin
        .remove_quarantine_manual(GUILD, target.user_id, OWNER)
        .await
        .unwrap();
    assert_eq!(report.roles_restored, vec![MEMBER_ROLE, VIP_ROLE]);
    assert!(admin.status(GUILD, target.user_id).await.is_none());

    let err = admin
        .remove_quarantine_manual(GUILD, target.user_id, OWNER)
        .await
        .unwrap_err();
    assert!(matches!(err.kind(), SecurityErrorKind::NotQuarantined(_)));

    let restored = h
        .sink
        .lines()
        .into_iter()
        .filter(|(_, category, _)| *category == LogCategory::QuarantineRestored)
        .map(|(_, _, line)| line)
        .collect::<Vec<_>>();
    assert_eq!(restored.len(), 1);
    assert!(restored[0].contains("released by"));
}
