use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Default: see src/templates/config.toml
pub const DEFAULT_MAX_ITEMS: usize = 5;

/// Default: 24 hours, in milliseconds
pub const DEFAULT_MAX_TIME_MS: u64 = 24 * 60 * 60 * 1000;

const MS_PER_HOUR: u64 = 60 * 60 * 1000;

/// Smallest usable stack bound; a push must keep the item it adds.
pub const MIN_MAX_ITEMS: usize = 1;

/// Stack bounds, persisted alongside the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Bound on stack length enforced by push
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Expiry threshold in milliseconds
    #[serde(rename = "maxTimeInStack", default = "default_max_time_ms")]
    pub max_time_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_items: DEFAULT_MAX_ITEMS,
            max_time_ms: DEFAULT_MAX_TIME_MS,
        }
    }
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

fn default_max_time_ms() -> u64 {
    DEFAULT_MAX_TIME_MS
}

impl Settings {
    pub fn max_age(&self) -> TimeDelta {
        TimeDelta::milliseconds(i64::try_from(self.max_time_ms).unwrap_or(i64::MAX))
    }

    /// Expiry threshold in whole and fractional hours, for display.
    pub fn max_hours(&self) -> f64 {
        self.max_time_ms as f64 / MS_PER_HOUR as f64
    }

    /// The same settings with `max_items` raised to [`MIN_MAX_ITEMS`].
    /// Returns `None` when nothing needed clamping.
    pub fn clamped(&self) -> Option<Settings> {
        (self.max_items < MIN_MAX_ITEMS).then(|| Settings {
            max_items: MIN_MAX_ITEMS,
            ..*self
        })
    }

    /// Merge a partial update. Returns true if anything changed.
    ///
    /// Lowering `max_items` below the current stack length does not evict;
    /// the bound is only applied on the next push.
    pub fn apply(&mut self, patch: SettingsPatch) -> bool {
        let before = *self;
        if let Some(max_items) = patch.max_items {
            self.max_items = max_items.max(MIN_MAX_ITEMS);
        }
        if let Some(max_time_ms) = patch.max_time_ms {
            self.max_time_ms = max_time_ms;
        }
        *self != before
    }
}

/// Partial settings update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub max_items: Option<usize>,
    pub max_time_ms: Option<u64>,
}

impl SettingsPatch {
    pub fn max_hours(hours: u64) -> Self {
        SettingsPatch {
            max_time_ms: Some(hours.saturating_mul(MS_PER_HOUR)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.max_items.is_none() && self.max_time_ms.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_five_items_one_day() {
        let s = Settings::default();
        assert_eq!(s.max_items, 5);
        assert_eq!(s.max_hours(), 24.0);
    }

    #[test]
    fn record_uses_persisted_key_names() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["maxItems"], 5);
        assert_eq!(json["maxTimeInStack"], 86_400_000u64);
    }

    #[test]
    fn partial_record_fills_defaults() {
        let s: Settings = serde_json::from_str(r#"{"maxItems":3}"#).unwrap();
        assert_eq!(s.max_items, 3);
        assert_eq!(s.max_time_ms, DEFAULT_MAX_TIME_MS);
    }

    #[test]
    fn apply_merges_partial() {
        let mut s = Settings::default();
        assert!(s.apply(SettingsPatch::max_hours(2)));
        assert_eq!(s.max_items, 5);
        assert_eq!(s.max_time_ms, 2 * MS_PER_HOUR);
        assert_eq!(s.max_age(), TimeDelta::hours(2));
    }

    #[test]
    fn zero_bound_is_clamped() {
        let mut s = Settings::default();
        s.apply(SettingsPatch {
            max_items: Some(0),
            ..Default::default()
        });
        assert_eq!(s.max_items, 1);

        let loaded: Settings = serde_json::from_str(r#"{"maxItems":0}"#).unwrap();
        assert_eq!(loaded.clamped().map(|c| c.max_items), Some(1));
        assert_eq!(Settings::default().clamped(), None);
    }

    #[test]
    fn huge_threshold_saturates_max_age() {
        let s = Settings {
            max_items: 5,
            max_time_ms: u64::MAX,
        };
        assert_eq!(s.max_age(), TimeDelta::milliseconds(i64::MAX));
    }

    #[test]
    fn apply_empty_patch_is_noop() {
        let mut s = Settings::default();
        assert!(!s.apply(SettingsPatch::default()));
    }
}
