use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::pipeline::layout::LayoutSettings;
use crate::pipeline::reconstruct::HeadingRules;

/// Application-level constants
pub const APP_NAME: &str = "Docshift";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Short name used for scratch folders under shared locations (`/tmp/docshift`, ...).
pub const SCRATCH_FOLDER: &str = "docshift";

/// Folder created under the process working directory (candidate 2).
pub const PROCESS_SCRATCH_FOLDER: &str = "temp-files";

// Environment variables consumed by `ConverterConfig::from_env`.
pub const ENV_TEMP_DIR: &str = "DOCSHIFT_TEMP_DIR";
pub const ENV_OFFICE_BIN: &str = "DOCSHIFT_OFFICE_BIN";
pub const ENV_DISABLE_OFFICE: &str = "DOCSHIFT_DISABLE_OFFICE";
pub const ENV_OFFICE_TIMEOUT_SECS: &str = "DOCSHIFT_OFFICE_TIMEOUT_SECS";
pub const ENV_ALLOW_IN_MEMORY: &str = "DOCSHIFT_ALLOW_IN_MEMORY";
pub const ENV_MAX_UPLOAD_MB: &str = "DOCSHIFT_MAX_UPLOAD_MB";

const DEFAULT_OFFICE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_UPLOAD_MB: usize = 50;

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "docshift=info,tower_http=info"
}

/// External office-suite settings.
#[derive(Debug, Clone, Serialize)]
pub struct OfficeConfig {
    /// Explicit executable. When `None`, `PATH` is probed for `soffice`/`libreoffice`.
    pub binary: Option<PathBuf>,
    /// Force the tool unavailable (fallback-only operation).
    pub disabled: bool,
    /// Upper bound on one headless conversion.
    pub timeout: Duration,
}

impl Default for OfficeConfig {
    fn default() -> Self {
        Self {
            binary: None,
            disabled: false,
            timeout: Duration::from_secs(DEFAULT_OFFICE_TIMEOUT_SECS),
        }
    }
}

/// Every tunable of the conversion pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ConverterConfig {
    /// Operator-configured base scratch directory (first candidate).
    pub temp_base_dir: Option<PathBuf>,
    /// Whether the in-memory sentinel may be handed out when no directory is writable.
    pub allow_in_memory: bool,
    pub office: OfficeConfig,
    pub heading_rules: HeadingRules,
    pub layout: LayoutSettings,
    pub max_upload_bytes: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            temp_base_dir: None,
            allow_in_memory: true,
            office: OfficeConfig::default(),
            heading_rules: HeadingRules::default(),
            layout: LayoutSettings::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl ConverterConfig {
    /// Build the configuration from process environment variables.
    ///
    /// Unset or unparsable values keep their defaults; none are required.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with an injectable variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_TEMP_DIR).filter(|v| !v.trim().is_empty()) {
            config.temp_base_dir = Some(PathBuf::from(dir));
        }
        if let Some(bin) = lookup(ENV_OFFICE_BIN).filter(|v| !v.trim().is_empty()) {
            config.office.binary = Some(PathBuf::from(bin));
        }
        if let Some(flag) = lookup(ENV_DISABLE_OFFICE) {
            config.office.disabled = parse_flag(&flag).unwrap_or(false);
        }
        if let Some(secs) = lookup(ENV_OFFICE_TIMEOUT_SECS).and_then(|v| v.trim().parse::<u64>().ok()) {
            if secs > 0 {
                config.office.timeout = Duration::from_secs(secs);
            }
        }
        if let Some(flag) = lookup(ENV_ALLOW_IN_MEMORY) {
            config.allow_in_memory = parse_flag(&flag).unwrap_or(true);
        }
        if let Some(mb) = lookup(ENV_MAX_UPLOAD_MB).and_then(|v| v.trim().parse::<usize>().ok()) {
            if mb > 0 {
                config.max_upload_bytes = mb * 1024 * 1024;
            }
        }

        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
