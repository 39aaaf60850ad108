//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ParleySettings::default()`]
//! 2. If a settings file exists, deep-merge its values over defaults
//! 3. Apply `PARLEY_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::ParleySettings;

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults (still applying env
/// overrides). If the file contains invalid JSON, returns an error.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed, or when the
/// merged settings fail validation.
pub fn load_settings_from_path(path: &Path) -> Result<ParleySettings> {
    let defaults = serde_json::to_value(ParleySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: ParleySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Each env var has strict parsing rules:
/// - Integers and floats must be valid and within the specified range
/// - Booleans accept: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`
/// - Invalid values are logged and ignored (fall back to file/default)
pub fn apply_env_overrides(settings: &mut ParleySettings) {
    // ── Server settings ─────────────────────────────────────────────
    if let Some(v) = read_env_string("PARLEY_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("PARLEY_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_u64("PARLEY_HEARTBEAT_SECS", 1, 3600) {
        settings.server.heartbeat_interval_secs = v;
    }
    if let Some(v) = read_env_u64("PARLEY_IDLE_WARNING_SECS", 1, 86_400) {
        settings.server.idle_warning_secs = v;
    }
    if let Some(v) = read_env_u64("PARLEY_SESSION_TIMEOUT_SECS", 1, 86_400) {
        settings.server.session_timeout_secs = v;
    }
    if let Some(v) = read_env_u64("PARLEY_DEDUP_WINDOW_SECS", 1, 86_400) {
        settings.server.dedup_window_secs = v;
    }

    // ── Retrieval settings ──────────────────────────────────────────
    if let Some(v) = read_env_string("PARLEY_EMBEDDING_BASE_URL") {
        settings.retrieval.embedding_base_url = v;
    }
    if let Some(v) = read_env_string("PARLEY_EMBEDDING_MODEL") {
        settings.retrieval.embedding_model = v;
    }
    if let Some(v) = read_env_f64("PARLEY_MIN_SCORE", 0.0, 1.0) {
        settings.retrieval.min_score = v;
    }
    if let Some(v) = read_env_usize("PARLEY_MAX_DOCUMENTS", 1, 100) {
        settings.retrieval.max_documents = v;
    }

    // ── Generation settings ─────────────────────────────────────────
    if let Some(v) = read_env_string("PARLEY_LLM_BASE_URL") {
        settings.generation.base_url = v;
    }
    if let Some(v) = read_env_string("PARLEY_LLM_MODEL") {
        settings.generation.model = v;
    }
    if let Some(v) = read_env_f64("PARLEY_DAILY_COST_LIMIT", 0.0, 100_000.0) {
        settings.generation.daily_cost_limit_usd = v;
    }
    if let Some(v) = read_env_bool("PARLEY_CACHE_ENABLED") {
        settings.generation.cache_enabled = v;
    }
    if let Some(v) = read_env_u64("PARLEY_CACHE_TTL_SECS", 1, 2_592_000) {
        settings.generation.cache_ttl_secs = v;
    }

    // ── Rules settings ──────────────────────────────────────────────
    if let Some(v) = read_env_string("PARLEY_RULES_PATH") {
        settings.rules.rules_path = Some(v);
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a finite `f64` within a range.
pub fn parse_f64_range(val: &str, min: f64, max: f64) -> Option<f64> {
    let n: f64 = val.parse().ok()?;
    (n.is_finite() && n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

fn read_env_f64(name: &str, min: f64, max: f64) -> Option<f64> {
    let val = std::env::var(name).ok()?;
    let result = parse_f64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid f64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
