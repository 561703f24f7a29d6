use serde::{Deserialize, Serialize};

use super::settings::{DEFAULT_MAX_ITEMS, Settings};

/// Configuration from .tstack/config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Seed values for the settings record when none is persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default: see src/templates/config.toml
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Default: see src/templates/config.toml
    #[serde(default = "default_max_hours")]
    pub max_hours: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            max_items: DEFAULT_MAX_ITEMS,
            max_hours: 24,
        }
    }
}

impl DefaultsConfig {
    pub fn settings(&self) -> Settings {
        Settings {
            max_items: self.max_items,
            max_time_ms: self.max_hours.saturating_mul(60 * 60 * 1000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between expiry sweeps while `tstack watch` runs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Titles wider than this many terminal cells are truncated in `list`
    #[serde(default = "default_title_width")]
    pub title_width: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig { title_width: 48 }
    }
}

/// Default: see src/templates/config.toml
fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

/// Default: see src/templates/config.toml
fn default_max_hours() -> u64 {
    24
}

fn default_interval_secs() -> u64 {
    60
}

fn default_title_width() -> usize {
    48
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: StackConfig = toml::from_str("").unwrap();
        assert_eq!(config.defaults.max_items, 5);
        assert_eq!(config.defaults.max_hours, 24);
        assert_eq!(config.sweep.interval_secs, 60);
        assert_eq!(config.ui.title_width, 48);
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let config: StackConfig = toml::from_str(
            r#"
[defaults]
max_items = 8

[sweep]
interval_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.defaults.max_items, 8);
        assert_eq!(config.defaults.max_hours, 24);
        assert_eq!(config.sweep.interval_secs, 5);
    }

    #[test]
    fn defaults_convert_to_settings() {
        let d = DefaultsConfig {
            max_items: 3,
            max_hours: 2,
        };
        let s = d.settings();
        assert_eq!(s.max_items, 3);
        assert_eq!(s.max_time_ms, 7_200_000);
    }
}
