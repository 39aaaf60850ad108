//! # parley-settings
//!
//! Configuration management with layered sources for the Parley backend.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** — [`ParleySettings::default()`]
//! 2. **JSON file** — the path given on the command line (deep-merged over
//!    defaults)
//! 3. **Environment variables** — `PARLEY_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_settings_from_path};
pub use types::{
    GenerationSettings, ParleySettings, RetrievalSettings, RulesSettings, ServerSettings,
    Templates,
};
