use chrono::{DateTime, TimeDelta, Utc};

use crate::model::item::Item;
use crate::model::settings::Settings;

/// How long an item has been on the stack. Clock skew reads as zero.
pub fn age(item: &Item, now: DateTime<Utc>) -> TimeDelta {
    (now - item.created_at).max(TimeDelta::zero())
}

pub fn is_expired(item: &Item, settings: &Settings, now: DateTime<Utc>) -> bool {
    age(item, now) >= settings.max_age()
}

/// Remove every item whose age has reached the threshold. Survivors keep
/// their relative order. Returns the removed items, bottom first.
pub fn sweep(items: &mut Vec<Item>, settings: &Settings, now: DateTime<Utc>) -> Vec<Item> {
    let (expired, kept): (Vec<Item>, Vec<Item>) = items
        .drain(..)
        .partition(|item| is_expired(item, settings, now));
    *items = kept;
    expired
}

/// When the item expires. Thresholds past the calendar's end saturate.
pub fn expires_at(item: &Item, settings: &Settings) -> DateTime<Utc> {
    item.created_at
        .checked_add_signed(settings.max_age())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time until the item expires; negative once it is overdue.
pub fn time_left(item: &Item, settings: &Settings, now: DateTime<Utc>) -> TimeDelta {
    expires_at(item, settings) - now
}

/// Remaining fraction of the item's lifetime, clamped to [0, 1].
pub fn fraction_left(item: &Item, settings: &Settings, now: DateTime<Utc>) -> f64 {
    let total = settings.max_age().num_milliseconds();
    if total <= 0 {
        return 0.0;
    }
    let left = total - age(item, now).num_milliseconds();
    (left as f64 / total as f64).clamp(0.0, 1.0)
}

/// Short human form of a time span: `3d`, `5h`, `12m`, `<1m`.
pub fn format_span(span: TimeDelta) -> String {
    let span = span.max(TimeDelta::zero());
    if span.num_days() > 0 {
        format!("{}d", span.num_days())
    } else if span.num_hours() > 0 {
        format!("{}h", span.num_hours())
    } else if span.num_minutes() > 0 {
        format!("{}m", span.num_minutes())
    } else {
        "<1m".to_string()
    }
}
