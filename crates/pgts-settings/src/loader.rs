//! Layered settings loading.
//!
//! Compiled defaults are serialized to JSON, the user file is merged over
//! them key by key, the result is deserialized back, `PGTS_*` variables are
//! applied on top, and the whole is validated.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::PgtsSettings;

/// `~/.pgts/settings.json`.
pub fn settings_path() -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
    home.join(".pgts").join("settings.json")
}

/// Load from [`settings_path`].
pub fn load_settings() -> Result<PgtsSettings> {
    load_settings_from_path(&settings_path())
}

/// Load from `path`, falling back to defaults when the file is absent.
///
/// Unreadable files, bad JSON and values that fail validation are errors.
pub fn load_settings_from_path(path: &Path) -> Result<PgtsSettings> {
    load_settings_with_env(path, |name| std::env::var(name).ok())
}

/// [`load_settings_from_path`] with `PGTS_*` variables read from `lookup`
/// instead of the process environment.
pub fn load_settings_with_env(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PgtsSettings> {
    let mut settings = load_file_layer(path)?;
    apply_overrides_from(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<PgtsSettings> {
    let json_err = |source: serde_json::Error| SettingsError::Json {
        path: Some(path.to_path_buf()),
        source,
    };
    let defaults = serde_json::to_value(PgtsSettings::default())
        .map_err(|source| SettingsError::Json { path: None, source })?;

    if !path.is_file() {
        debug!(path = %path.display(), "no settings file, using defaults");
        return serde_json::from_value(defaults)
            .map_err(|source| SettingsError::Json { path: None, source });
    }

    let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let overlay: Value = serde_json::from_str(&text).map_err(json_err)?;
    debug!(path = %path.display(), "merging settings file over defaults");
    serde_json::from_value(deep_merge(defaults, overlay)).map_err(json_err)
}

/// Merge `overlay` into `base`.
///
/// Objects merge per key, recursively. Any other overlay value replaces
/// the base value, except `null`, which leaves the base value alone.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            merge_maps(&mut base, overlay);
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

fn merge_maps(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        if value.is_null() {
            continue;
        }
        let slot = base.entry(key).or_insert(Value::Null);
        *slot = deep_merge(std::mem::take(slot), value);
    }
}

/// Apply `PGTS_*` overrides from `lookup`.
///
/// Invalid values are ignored with a warning; the file or default value
/// stays.
pub fn apply_overrides_from(settings: &mut PgtsSettings, lookup: impl Fn(&str) -> Option<String>) {
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let ranged_u64 = |name: &str, min: u64, max: u64| {
        let val = lookup(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        result
    };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = string("PGTS_BASE_URL") {
        settings.server.base_url = v;
    }
    if let Some(v) = string("PGTS_SOCKET_PATH") {
        settings.server.socket_path = v;
    }
    if let Some(v) = string("PGTS_SOCKET_URL") {
        settings.server.socket_base_url = Some(v);
    }

    // ── Broker ──────────────────────────────────────────────────────
    if let Some(v) = ranged_u64("PGTS_REQUEST_TIMEOUT_MS", 1, 3_600_000) {
        settings.broker.request_timeout_ms = v;
    }
    if let Some(v) = ranged_u64("PGTS_CONNECT_TIMEOUT_MS", 1, 3_600_000) {
        settings.broker.connect_timeout_ms = v;
    }

    // ── Connection defaults ─────────────────────────────────────────
    if let Some(v) = string("PGTS_HOST") {
        settings.connection.host = v;
    }
    if let Some(v) = string("PGTS_USER") {
        settings.connection.user = v;
    }
    if let Some(v) = string("PGTS_DBNAME") {
        settings.connection.dbname = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = string("PGTS_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(val) = lookup("PGTS_LOG_JSON") {
        match parse_bool(&val) {
            Some(v) => settings.logging.json = v,
            None => tracing::warn!(key = "PGTS_LOG_JSON", value = %val, "invalid boolean env var, ignoring"),
        }
    }
}

/// Boolean env value: `1`, `true`, `yes`, `on` and their negatives,
/// in any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    const TRUE: [&str; 4] = ["1", "true", "yes", "on"];
    const FALSE: [&str; 4] = ["0", "false", "no", "off"];
    let val = val.trim();
    if TRUE.iter().any(|t| t.eq_ignore_ascii_case(val)) {
        Some(true)
    } else if FALSE.iter().any(|f| f.eq_ignore_ascii_case(val)) {
        Some(false)
    } else {
        None
    }
}

/// Integer env value within `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    val.trim()
        .parse::<u64>()
        .ok()
        .filter(|n| (min..=max).contains(n))
}
