use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`profiled_env_u64`] but zero is rejected in favour of `default`.
fn profiled_env_positive(profile: &str, key: &str, default: u64) -> u64 {
    match profiled_env_u64(profile, key, default) {
        0 => {
            tracing::warn!(key, default, "{key} must be greater than zero; using default");
            default
        }
        v => v,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub aliyun: AliyunConfig,
    pub dingtalk: DingTalkConfig,
    pub alarm: AlarmConfig,
}

/// Well-known env keys that identify a profile when prefixed.
const PROFILE_MARKER_KEYS: &[&str] = &["ALIYUN_ACCESS_KEY_ID", "DINGTALK_TOKENS", "RULES_PATH"];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SPOT_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("SPOT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            aliyun: AliyunConfig::from_env_profiled(p),
            dingtalk: DingTalkConfig::from_env_profiled(p),
            alarm: AlarmConfig::from_env_profiled(p),
        }
    }

    /// Discover available profiles by scanning env vars for `{PREFIX}_{MARKER_KEY}` patterns.
    /// Always includes "default" (the unprefixed config).
    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{}", marker)) {
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                    {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!("  aliyun:    configured={}", self.aliyun.is_configured());
        tracing::info!(
            "  dingtalk:  conversations={}, signed={}",
            self.dingtalk.tokens.len(),
            self.dingtalk.secret.is_some()
        );
        tracing::info!(
            "  alarm:     rules_path={}, cycle_timeout={}s, filter_ttl={}h",
            self.alarm.rules_path.display(),
            self.alarm.cycle_timeout_secs,
            self.alarm.filter_ttl_hours
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        let mut conversations: Vec<&String> = self.dingtalk.tokens.keys().collect();
        conversations.sort();
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "aliyun": {
                "endpoint": self.aliyun.endpoint,
                "configured": self.aliyun.is_configured(),
            },
            "dingtalk": {
                "conversations": conversations,
                "signed": self.dingtalk.secret.is_some(),
            },
            "alarm": {
                "rules_path": self.alarm.rules_path,
                "cycle_timeout_secs": self.alarm.cycle_timeout_secs,
                "filter_ttl_hours": self.alarm.filter_ttl_hours,
                "fetch_concurrency": self.alarm.fetch_concurrency,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Aliyun ECS ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliyunConfig {
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub access_key_secret: Option<String>,
    /// Endpoint override; `ecs.{region}.aliyuncs.com` when unset.
    pub endpoint: Option<String>,
}

impl AliyunConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            access_key_id: profiled_env_opt(p, "ALIYUN_ACCESS_KEY_ID"),
            access_key_secret: profiled_env_opt(p, "ALIYUN_ACCESS_KEY_SECRET"),
            endpoint: profiled_env_opt(p, "ALIYUN_ECS_ENDPOINT"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.access_key_id.is_some() && self.access_key_secret.is_some()
    }
}

// ── DingTalk ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DingTalkConfig {
    /// Conversation title → robot access token.
    #[serde(skip_serializing)]
    pub tokens: HashMap<String, String>,
    /// Optional robot signing secret.
    #[serde(skip_serializing)]
    pub secret: Option<String>,
}

impl DingTalkConfig {
    fn from_env_profiled(p: &str) -> Self {
        let tokens = match profiled_env_opt(p, "DINGTALK_TOKENS") {
            Some(raw) => parse_tokens(&raw),
            None => HashMap::new(),
        };
        Self {
            tokens,
            secret: profiled_env_opt(p, "DINGTALK_SECRET"),
        }
    }

    pub fn token_for(&self, conversation: &str) -> Option<&str> {
        self.tokens.get(conversation).map(String::as_str)
    }
}

/// Parse the `DINGTALK_TOKENS` JSON object. Malformed input yields an empty
/// map and a warning.
fn parse_tokens(raw: &str) -> HashMap<String, String> {
    match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(error = %e, "DINGTALK_TOKENS is not a JSON object of strings; ignoring");
            HashMap::new()
        }
    }
}

// ── Alarm engine ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Rule file or directory.
    pub rules_path: PathBuf,
    /// Deadline for each price source and notifier call.
    pub cycle_timeout_secs: u64,
    /// Inactivity after which a change-filter entry is dropped.
    pub filter_ttl_hours: u64,
    /// Parallel price history requests per query.
    pub fetch_concurrency: usize,
}

impl AlarmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_path: PathBuf::from(profiled_env_or(p, "RULES_PATH", "data/rules")),
            cycle_timeout_secs: profiled_env_positive(p, "CYCLE_TIMEOUT_SECS", 60),
            filter_ttl_hours: profiled_env_positive(p, "FILTER_TTL_HOURS", 24),
            fetch_concurrency: profiled_env_positive(p, "FETCH_CONCURRENCY", 8) as usize,
        }
    }
}
