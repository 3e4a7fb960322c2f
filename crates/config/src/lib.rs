//! # Config - environment settings for the tuple shell
//!
//! ```text
//! FPTU_MAX_FIELDS  builder field budget          (default: 1024)
//! FPTU_MAX_BYTES   builder byte budget           (default: 65536)
//! FPTU_INDENT      JSON indent unit, "" = compact (default: "")
//! FPTU_JSON5       JSON5 relaxations             (default: true)
//! FPTU_QUOTE_KEYS  always quote object keys      (default: false)
//! FPTU_LOG         tracing filter                (default: "warn")
//! ```
//!
//! Values that fail to parse fall back to the default. Budgets are clamped
//! to what a tuple can hold.

use json::JsonFlags;
use tuple::{HEADER_BYTES, MAX_FIELDS, MAX_TUPLE_BYTES};

pub const DEFAULT_MAX_FIELDS: usize = 1024;
pub const DEFAULT_MAX_BYTES: usize = 64 * 1024;
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_fields: usize,
    pub max_bytes: usize,
    /// Indent unit for pretty JSON; `None` renders compact output.
    pub indent: Option<String>,
    pub json5: bool,
    pub quote_keys: bool,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_fields: DEFAULT_MAX_FIELDS,
            max_bytes: DEFAULT_MAX_BYTES,
            indent: None,
            json5: true,
            quote_keys: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which returns `None` for unset keys.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let max_fields = parsed(&lookup, "FPTU_MAX_FIELDS", defaults.max_fields).min(MAX_FIELDS);
        let max_bytes = parsed(&lookup, "FPTU_MAX_BYTES", defaults.max_bytes)
            .clamp(HEADER_BYTES, MAX_TUPLE_BYTES);
        let indent = lookup("FPTU_INDENT").filter(|unit| !unit.is_empty());

        Self {
            max_fields,
            max_bytes,
            indent,
            json5: parsed(&lookup, "FPTU_JSON5", defaults.json5),
            quote_keys: parsed(&lookup, "FPTU_QUOTE_KEYS", defaults.quote_keys),
            log_filter: lookup("FPTU_LOG").unwrap_or(defaults.log_filter),
        }
    }

    /// Emitter flags for these settings.
    pub fn flags(&self) -> JsonFlags {
        let mut flags = JsonFlags::empty();
        flags.set(JsonFlags::DISABLE_JSON5, !self.json5);
        flags.set(JsonFlags::FORCE_QUOTE_KEYS, self.quote_keys);
        flags
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}
