//! Shared test fixtures: an in-memory platform and a recording log sink.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rxt_config::{ConfigStore, MemoryConfigStore, SecurityConfig};
use rxt_core::{
    AuditAction, AuditEntry, ChannelId, GuildId, GuildView, LogCategory, MemberView,
    MemberViewBuilder, MessageId, Permissions, RoleId, RoleView, UserId, WebhookId,
};
use rxt_error::{PlatformError, PlatformErrorKind, PlatformResult};
use rxt_security::{
    ChannelOverwrite, EngineSettings, GuildPlatform, LogSink, MemoryQuarantineStore,
    QuarantineStore, SecurityEngine,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GUILD: GuildId = GuildId(1);
pub const OWNER: UserId = UserId(100);
pub const BOT: UserId = UserId(999);
pub const MODERATOR_ROLE: RoleId = RoleId(70);
pub const ADMIN_ROLE: RoleId = RoleId(80);
pub const MEMBER_ROLE: RoleId = RoleId(81);
pub const VIP_ROLE: RoleId = RoleId(82);
pub const GENERAL: ChannelId = ChannelId(500);

pub fn guild() -> GuildView {
    GuildView::new(GUILD, OWNER, BOT)
}

pub fn member(user: u64, roles: &[RoleId]) -> MemberView {
    MemberViewBuilder::default()
        .user_id(UserId::new(user))
        .role_ids(roles.to_vec())
        .display_name(format!("user{}", user))
        .account_created(Utc::now() - ChronoDuration::days(400))
        .build()
        .unwrap()
}

/// A platform call recorded by [`MockPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AddRole(UserId, RoleId),
    RemoveRole(UserId, RoleId),
    CreateRole(String),
    CreateCategory(String),
    CreateChannel(String, Option<ChannelId>),
    SetOverwrite(ChannelId),
    Timeout(UserId),
    ClearTimeout(UserId),
    Kick(UserId),
    DeleteMessage(MessageId),
    DeleteWebhook(WebhookId),
    Send(ChannelId, String),
    DirectMessage(UserId, String),
    AuditLookup(AuditAction),
}

#[derive(Debug, Default)]
struct MockState {
    members: HashMap<UserId, MemberView>,
    roles: HashMap<RoleId, RoleView>,
    channels: HashSet<ChannelId>,
    audit: Vec<AuditEntry>,
    timeouts: HashMap<UserId, DateTime<Utc>>,
    calls: Vec<Call>,
    fail_audit: bool,
    audit_delay: Option<Duration>,
    fail_create_role: bool,
}

/// In-memory guild that applies role changes to its member table.
#[derive(Debug)]
pub struct MockPlatform {
    state: Mutex<MockState>,
    next_id: AtomicU64,
}

impl Default for MockPlatform {
    fn default() -> Self {
        let platform = Self {
            state: Mutex::new(MockState::default()),
            next_id: AtomicU64::new(10_000),
        };
        platform.insert_role(MODERATOR_ROLE, "Moderator", Permissions::KICK_MEMBERS);
        platform.insert_role(ADMIN_ROLE, "Admin", Permissions::ADMINISTRATOR);
        platform.insert_role(MEMBER_ROLE, "Member", Permissions::SEND_MESSAGES);
        platform.insert_role(VIP_ROLE, "VIP", Permissions::EMBED_LINKS);
        platform.insert_channel(GENERAL);
        platform.insert_member(member(OWNER.get(), &[]));
        platform
    }
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn insert_role(&self, id: RoleId, name: &str, permissions: u64) {
        self.state().roles.insert(
            id,
            RoleView {
                id,
                name: name.to_string(),
                permissions: Permissions::from_bits(permissions),
                position: 1,
                managed: false,
            },
        );
    }

    pub fn insert_managed_role(&self, id: RoleId, name: &str) {
        self.insert_role(id, name, 0);
        if let Some(role) = self.state().roles.get_mut(&id) {
            role.managed = true;
        }
    }

    pub fn delete_role(&self, id: RoleId) {
        self.state().roles.remove(&id);
    }

    pub fn insert_channel(&self, id: ChannelId) {
        self.state().channels.insert(id);
    }

    pub fn delete_channel(&self, id: ChannelId) {
        self.state().channels.remove(&id);
    }

    pub fn insert_member(&self, member: MemberView) {
        self.state().members.insert(member.user_id, member);
    }

    pub fn push_audit(&self, action: AuditAction, actor: UserId, target: Option<u64>) {
        let entry = AuditEntry::new(action, actor, target, Utc::now());
        self.state().audit.insert(0, entry);
    }

    pub fn push_audit_entry(&self, entry: AuditEntry) {
        self.state().audit.insert(0, entry);
    }

    pub fn push_audit_at(
        &self,
        action: AuditAction,
        actor: UserId,
        target: Option<u64>,
        at: DateTime<Utc>,
    ) {
        let entry = AuditEntry::new(action, actor, target, at);
        self.state().audit.insert(0, entry);
    }

    pub fn fail_audit(&self) {
        self.state().fail_audit = true;
    }

    pub fn delay_audit(&self, delay: Duration) {
        self.state().audit_delay = Some(delay);
    }

    pub fn fail_role_creation(&self) {
        self.state().fail_create_role = true;
    }

    pub fn roles_of(&self, user: UserId) -> Vec<RoleId> {
        self.state()
            .members
            .get(&user)
            .map(|m| m.role_ids.clone())
            .unwrap_or_default()
    }

    pub fn member_view(&self, user: UserId) -> MemberView {
        self.state().members.get(&user).cloned().unwrap()
    }

    pub fn is_timed_out(&self, user: UserId) -> bool {
        self.state().timeouts.contains_key(&user)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

fn not_found(what: String) -> PlatformError {
    PlatformError::new(PlatformErrorKind::NotFound(what))
}

#[async_trait]
impl GuildPlatform for MockPlatform {
    async fn guild(&self, _guild_id: GuildId) -> PlatformResult<GuildView> {
        Ok(guild())
    }

    async fn member(&self, _guild_id: GuildId, user_id: UserId) -> PlatformResult<MemberView> {
        self.state()
            .members
            .get(&user_id)
            .cloned()
            .ok_or_else(|| not_found(format!("member {}", user_id)))
    }

    async fn roles(&self, _guild_id: GuildId) -> PlatformResult<Vec<RoleView>> {
        Ok(self.state().roles.values().cloned().collect())
    }

    async fn channel_ids(&self, _guild_id: GuildId) -> PlatformResult<Vec<ChannelId>> {
        Ok(self.state().channels.iter().copied().collect())
    }

    async fn create_role(
        &self,
        _guild_id: GuildId,
        name: &str,
        permissions: Permissions,
    ) -> PlatformResult<RoleId> {
        self.record(Call::CreateRole(name.to_string()));
        if self.state().fail_create_role {
            return Err(PlatformError::new(PlatformErrorKind::PermissionDenied(
                "manage roles".to_string(),
            )));
        }
        let id = RoleId::new(self.next_id());
        self.insert_role(id, name, permissions.bits());
        Ok(id)
    }

    async fn create_category(
        &self,
        _guild_id: GuildId,
        name: &str,
        _overwrites: Vec<ChannelOverwrite>,
    ) -> PlatformResult<ChannelId> {
        self.record(Call::CreateCategory(name.to_string()));
        let id = ChannelId::new(self.next_id());
        self.insert_channel(id);
        Ok(id)
    }

    async fn create_text_channel(
        &self,
        _guild_id: GuildId,
        name: &str,
        parent: Option<ChannelId>,
        _overwrites: Vec<ChannelOverwrite>,
    ) -> PlatformResult<ChannelId> {
        self.record(Call::CreateChannel(name.to_string(), parent));
        let id = ChannelId::new(self.next_id());
        self.insert_channel(id);
        Ok(id)
    }

    async fn set_channel_overwrite(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
        _overwrite: ChannelOverwrite,
    ) -> PlatformResult<()> {
        self.record(Call::SetOverwrite(channel_id));
        Ok(())
    }

    async fn add_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> PlatformResult<()> {
        self.record(Call::AddRole(user_id, role_id));
        let mut state = self.state();
        if !state.roles.contains_key(&role_id) {
            return Err(not_found(format!("role {}", role_id)));
        }
        let member = state
            .members
            .get_mut(&user_id)
            .ok_or_else(|| not_found(format!("member {}", user_id)))?;
        if !member.role_ids.contains(&role_id) {
            member.role_ids.push(role_id);
        }
        Ok(())
    }

    async fn remove_role(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        role_id: RoleId,
        _reason: &str,
    ) -> PlatformResult<()> {
        self.record(Call::RemoveRole(user_id, role_id));
        let mut state = self.state();
        let member = state
            .members
            .get_mut(&user_id)
            .ok_or_else(|| not_found(format!("member {}", user_id)))?;
        member.role_ids.retain(|r| *r != role_id);
        Ok(())
    }

    async fn timeout_member(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        until: DateTime<Utc>,
    ) -> PlatformResult<()> {
        self.record(Call::Timeout(user_id));
        self.state().timeouts.insert(user_id, until);
        Ok(())
    }

    async fn clear_timeout(&self, _guild_id: GuildId, user_id: UserId) -> PlatformResult<()> {
        self.record(Call::ClearTimeout(user_id));
        self.state().timeouts.remove(&user_id);
        Ok(())
    }

    async fn kick_member(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        _reason: &str,
    ) -> PlatformResult<()> {
        self.record(Call::Kick(user_id));
        self.state().members.remove(&user_id);
        Ok(())
    }

    async fn delete_message(
        &self,
        _channel_id: ChannelId,
        message_id: MessageId,
    ) -> PlatformResult<()> {
        self.record(Call::DeleteMessage(message_id));
        Ok(())
    }

    async fn delete_webhook(&self, webhook_id: WebhookId, _reason: &str) -> PlatformResult<()> {
        self.record(Call::DeleteWebhook(webhook_id));
        Ok(())
    }

    async fn send_message(&self, channel_id: ChannelId, content: &str) -> PlatformResult<()> {
        self.record(Call::Send(channel_id, content.to_string()));
        Ok(())
    }

    async fn send_direct_message(&self, user_id: UserId, content: &str) -> PlatformResult<()> {
        self.record(Call::DirectMessage(user_id, content.to_string()));
        Ok(())
    }

    async fn audit_entries(
        &self,
        _guild_id: GuildId,
        action: AuditAction,
        limit: u8,
    ) -> PlatformResult<Vec<AuditEntry>> {
        self.record(Call::AuditLookup(action));
        let (fail, delay) = {
            let state = self.state();
            (state.fail_audit, state.audit_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(PlatformError::new(PlatformErrorKind::Http(
                "audit log unavailable".to_string(),
            )));
        }
        Ok(self
            .state()
            .audit
            .iter()
            .filter(|e| *e.action() == action)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// Log sink that keeps every line for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(GuildId, LogCategory, String)>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<(GuildId, LogCategory, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn count(&self, category: LogCategory) -> usize {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c, _)| *c == category)
            .count()
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn log_action(&self, guild_id: GuildId, category: LogCategory, message: &str) {
        self.lines
            .lock()
            .unwrap()
            .push((guild_id, category, message.to_string()));
    }
}

/// An engine wired to in-memory collaborators.
pub struct Harness {
    pub platform: Arc<MockPlatform>,
    pub configs: Arc<MemoryConfigStore>,
    pub store: Arc<dyn QuarantineStore>,
    pub sink: Arc<RecordingSink>,
    pub engine: SecurityEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryQuarantineStore::new()))
    }

    pub fn with_store(store: Arc<dyn QuarantineStore>) -> Self {
        Self::build(Arc::new(MockPlatform::new()), store)
    }

    pub fn build(platform: Arc<MockPlatform>, store: Arc<dyn QuarantineStore>) -> Self {
        let configs = Arc::new(MemoryConfigStore::new());
        let sink = Arc::new(RecordingSink::default());
        let settings = EngineSettings::default()
            .with_self_action_grace(Duration::ZERO)
            .with_audit_timeout(Duration::from_millis(200));
        let engine = SecurityEngine::new(
            platform.clone(),
            configs.clone(),
            store.clone(),
            sink.clone(),
            settings,
        );
        Self {
            platform,
            configs,
            store,
            sink,
            engine,
        }
    }

    pub async fn configure(&self, edit: impl FnOnce(&mut SecurityConfig) + Send + 'static) {
        self.configs
            .update_config(GUILD, Box::new(edit))
            .await
            .unwrap();
    }

    pub async fn config(&self) -> SecurityConfig {
        self.configs.get_config(GUILD).await.unwrap()
    }

    /// Add a member to the platform and return its view.
    pub fn join(&self, user: u64, roles: &[RoleId]) -> MemberView {
        let view = member(user, roles);
        self.platform.insert_member(view.clone());
        view
    }
}

/// Let spawned tasks run to completion.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
