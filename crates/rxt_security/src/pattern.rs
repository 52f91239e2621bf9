//! Stateless content and account pattern checks.

use chrono::{DateTime, Utc};
use regex::Regex;
use rxt_core::MemberView;

/// Broadcast tokens that address every member of a guild or channel.
const BROADCAST_TOKENS: [&str; 2] = ["@everyone", "@here"];

/// Blocked-link detection over message content.
///
/// Every `http://` or `https://` URL is reduced to its host. A host is abusive
/// when it contains a blocked entry and contains no allowed entry, compared
/// case-insensitively as plain substrings.
///
/// # Examples
///
/// ```
/// use rxt_security::LinkDetector;
///
/// let detector = LinkDetector::new();
/// let blocked = vec!["grabify.link".to_string()];
/// let allowed = vec!["discord.com".to_string()];
///
/// let hit = detector.find_blocked("see https://Grabify.link/abc", &blocked, &allowed);
/// assert_eq!(hit.as_deref(), Some("grabify.link"));
/// assert!(detector.find_blocked("https://discord.com/x", &blocked, &allowed).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct LinkDetector {
    url: Regex,
}

impl Default for LinkDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkDetector {
    /// Create a detector.
    pub fn new() -> Self {
        Self {
            url: Regex::new(r"(?i)https?://([^\s/?#<>]+)").expect("Valid regex"),
        }
    }

    /// Lowercased hosts of every URL in `content`, in order of appearance.
    pub fn hosts(&self, content: &str) -> Vec<String> {
        self.url
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|authority| host_of(authority.as_str()))
            .filter(|host| !host.is_empty())
            .collect()
    }

    /// The first host in `content` matching `blocked` and not `allowed`.
    pub fn find_blocked(
        &self,
        content: &str,
        blocked: &[String],
        allowed: &[String],
    ) -> Option<String> {
        self.hosts(content)
            .into_iter()
            .find(|host| contains_any(host, blocked) && !contains_any(host, allowed))
    }
}

/// Strip userinfo and port from a URL authority.
fn host_of(authority: &str) -> String {
    let without_user = authority.rsplit('@').next().unwrap_or(authority);
    let host = without_user.split(':').next().unwrap_or(without_user);
    host.trim_end_matches('.').to_lowercase()
}

fn contains_any(host: &str, entries: &[String]) -> bool {
    entries
        .iter()
        .filter(|entry| !entry.is_empty())
        .any(|entry| host.contains(&entry.to_lowercase()))
}

/// Whether a message addresses the whole guild.
///
/// `mentions_everyone` is the platform's own resolution of the mention set; the
/// content is checked as well because the platform only resolves the broadcast
/// when the author is permitted to use it.
pub fn is_mass_mention(mentions_everyone: bool, content: &str) -> bool {
    mentions_everyone || BROADCAST_TOKENS.iter().any(|token| content.contains(token))
}

/// Suspicious-account heuristic for joining members.
///
/// A member is suspicious when the account is younger than the configured
/// minimum age and the display name looks generated.
#[derive(Debug, Clone)]
pub struct RaidHeuristic {
    name_patterns: Vec<Regex>,
}

impl Default for RaidHeuristic {
    fn default() -> Self {
        let patterns = [r"(?i)discord", r"(?i)bot", r"(?i)test", r"^\d+$"];
        Self {
            name_patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("Valid regex"))
                .collect(),
        }
    }
}

impl RaidHeuristic {
    /// Create the heuristic with the built-in name patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` looks generated.
    pub fn suspicious_name(&self, name: &str) -> bool {
        let name = name.trim();
        !name.is_empty() && self.name_patterns.iter().any(|p| p.is_match(name))
    }

    /// Whether `member` is a young account with a generated-looking name.
    pub fn is_suspicious(&self, member: &MemberView, min_age_days: u32, now: DateTime<Utc>) -> bool {
        member.account_age_days(now) < i64::from(min_age_days)
            && self.suspicious_name(&member.display_name)
    }
}
