//! # pgts-settings
//!
//! Client settings loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`PgtsSettings::default()`]
//! 2. **User file**: `~/.pgts/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `PGTS_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    deep_merge, load_settings, load_settings_from_path, load_settings_with_env, settings_path,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<PgtsSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.pgts/settings.json` with env var
/// overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> &'static PgtsSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to load settings, using defaults");
            PgtsSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the provided settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: PgtsSettings) -> std::result::Result<(), PgtsSettings> {
    SETTINGS.set(settings)
}
