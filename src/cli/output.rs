use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::item::{Item, link_href};
use crate::model::settings::Settings;
use crate::ops::expiry;
use crate::util::unicode::{fit_to_width, single_line};

/// Width of the expiry progress bar in `list`.
const BAR_CELLS: usize = 10;

/// Characters of the id shown in `list`.
const SHORT_ID_LEN: usize = 8;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ItemJson {
    pub id: String,
    pub title: String,
    pub description: String,
    pub links: Vec<String>,
    pub created_at: String,
    pub expires_at: String,
    /// Negative once the item is overdue for a sweep
    pub seconds_left: i64,
    /// 1 = bottom
    pub position: usize,
    pub top: bool,
    pub selected: bool,
}

#[derive(Serialize)]
pub struct SettingsJson {
    pub max_items: usize,
    pub max_time_ms: u64,
    pub max_hours: f64,
}

#[derive(Serialize)]
pub struct StackJson {
    /// Top first
    pub items: Vec<ItemJson>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    pub settings: SettingsJson,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn item_to_json(
    item: &Item,
    position: usize,
    len: usize,
    settings: &Settings,
    now: DateTime<Utc>,
) -> ItemJson {
    let expires_at = expiry::expires_at(item, settings);
    ItemJson {
        id: item.id.clone(),
        title: item.title.clone(),
        description: item.description.clone(),
        links: item.links.clone(),
        created_at: rfc3339(item.created_at),
        expires_at: rfc3339(expires_at),
        seconds_left: expiry::time_left(item, settings, now).num_seconds(),
        position,
        top: position == len,
        selected: item.selected,
    }
}

pub fn settings_to_json(settings: &Settings) -> SettingsJson {
    SettingsJson {
        max_items: settings.max_items,
        max_time_ms: settings.max_time_ms,
        max_hours: settings.max_hours(),
    }
}

pub fn stack_to_json(
    items: &[Item],
    settings: &Settings,
    selected: Option<&str>,
    now: DateTime<Utc>,
) -> StackJson {
    let len = items.len();
    StackJson {
        items: items
            .iter()
            .enumerate()
            .rev()
            .map(|(idx, item)| item_to_json(item, idx + 1, len, settings, now))
            .collect(),
        count: len,
        selected: selected.map(str::to_string),
        settings: settings_to_json(settings),
    }
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

/// The stack as text, top first, one row per item:
/// `<sel> <pos>  <id>  <title>  [<bar>] <time left>`, then a count footer.
pub fn render_stack(
    items: &[Item],
    settings: &Settings,
    now: DateTime<Utc>,
    title_width: usize,
) -> String {
    let mut out = String::new();
    if items.is_empty() {
        out.push_str("stack is empty\n");
    }
    for (idx, item) in items.iter().enumerate().rev() {
        let marker = if item.selected { '*' } else { '-' };
        let fraction = expiry::fraction_left(item, settings, now);
        out.push_str(&format!(
            "{} {:>2}  {}  {}  [{}] {}\n",
            marker,
            idx + 1,
            short_id(&item.id),
            fit_to_width(&single_line(&item.title), title_width),
            progress_bar(fraction, BAR_CELLS),
            expiry::format_span(expiry::time_left(item, settings, now)),
        ));
    }
    out.push_str(&format!("{} / {} items\n", items.len(), settings.max_items));
    out
}

/// One item in full.
pub fn render_item(
    item: &Item,
    position: usize,
    len: usize,
    settings: &Settings,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("id:        {}\n", item.id));
    out.push_str(&format!("title:     {}\n", item.title));
    if !item.description.is_empty() {
        let mut lines = item.description.lines();
        if let Some(first) = lines.next() {
            out.push_str(&format!("desc:      {}\n", first));
        }
        for line in lines {
            out.push_str(&format!("           {}\n", line));
        }
    }
    for (i, link) in item.links.iter().enumerate() {
        let label = if i == 0 { "links:" } else { "" };
        out.push_str(&format!("{:<11}{}\n", label, link_href(link)));
    }
    out.push_str(&format!(
        "added:     {}\n",
        item.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    let left = expiry::time_left(item, settings, now);
    if left > chrono::TimeDelta::zero() {
        out.push_str(&format!("expires:   in {}\n", expiry::format_span(left)));
    } else {
        out.push_str("expires:   overdue, removed on next sweep\n");
    }
    let place = if position == len { " (top)" } else { "" };
    out.push_str(&format!("position:  {} of {}{}\n", position, len, place));
    if item.selected {
        out.push_str("selected:  yes\n");
    }
    out
}

pub fn render_settings(settings: &Settings) -> String {
    format!(
        "max items: {}\nmax time:  {}h\n",
        settings.max_items,
        format_hours(settings.max_hours())
    )
}

fn format_hours(hours: f64) -> String {
    if hours.fract() == 0.0 {
        format!("{}", hours as u64)
    } else {
        format!("{:.2}", hours)
    }
}

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn progress_bar(fraction: f64, cells: usize) -> String {
    let filled = ((fraction * cells as f64).round() as usize).min(cells);
    let mut bar = "#".repeat(filled);
    bar.push_str(&"-".repeat(cells - filled));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::ItemDraft;
    use chrono::{TimeDelta, TimeZone};
    use insta::assert_snapshot;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn ten_minutes() -> Settings {
        Settings {
            max_items: 5,
            max_time_ms: 10 * 60 * 1000,
        }
    }

    fn sample() -> Vec<Item> {
        let mut alpha = Item::new(
            "aaaaaaaa-1111-4111-8111-111111111111".into(),
            ItemDraft::new("alpha"),
            t0(),
        );
        alpha.selected = true;
        let beta = Item::new(
            "bbbbbbbb-2222-4222-8222-222222222222".into(),
            ItemDraft::new("beta\nwith a second line that runs long"),
            t0() + TimeDelta::seconds(150),
        );
        vec![alpha, beta]
    }

    #[test]
    fn stack_renders_top_first() {
        let out = render_stack(&sample(), &ten_minutes(), t0() + TimeDelta::seconds(150), 12);
        assert_snapshot!(out, @r"
        -  2  bbbbbbbb  beta with a…  [##########] 10m
        *  1  aaaaaaaa  alpha         [########--] 7m
        2 / 5 items
        ");
    }

    #[test]
    fn empty_stack_renders_footer() {
        let out = render_stack(&[], &ten_minutes(), t0(), 12);
        assert_eq!(out, "stack is empty\n0 / 5 items\n");
    }

    #[test]
    fn item_details() {
        let mut item = sample().remove(0);
        item.description = "line one\nline two".into();
        item.links = vec!["example.com".into(), "https://docs.rs".into()];
        let out = render_item(&item, 1, 2, &ten_minutes(), t0() + TimeDelta::seconds(60));
        assert!(out.contains("desc:      line one\n           line two\n"));
        assert!(out.contains("links:     https://example.com\n           https://docs.rs\n"));
        assert!(out.contains("expires:   in 9m\n"));
        assert!(out.contains("position:  1 of 2\n"));
        assert!(out.contains("selected:  yes\n"));
    }

    #[test]
    fn item_details_overdue_top() {
        let item = sample().remove(1);
        let out = render_item(&item, 2, 2, &ten_minutes(), t0() + TimeDelta::hours(1));
        assert!(out.contains("overdue"));
        assert!(out.contains("position:  2 of 2 (top)\n"));
        assert!(!out.contains("selected"));
    }

    #[test]
    fn json_lists_top_first_with_positions() {
        let json = stack_to_json(&sample(), &ten_minutes(), Some("aaaa"), t0());
        assert_eq!(json.count, 2);
        assert_eq!(json.items[0].position, 2);
        assert!(json.items[0].top);
        assert_eq!(json.items[1].position, 1);
        assert!(json.items[1].selected);
        assert_eq!(json.items[1].seconds_left, 600);
        assert_eq!(json.items[1].created_at, "2023-11-14T22:13:20Z");
        assert_eq!(json.items[1].expires_at, "2023-11-14T22:23:20Z");
    }

    #[test]
    fn settings_text() {
        assert_eq!(
            render_settings(&Settings::default()),
            "max items: 5\nmax time:  24h\n"
        );
        assert_eq!(render_settings(&ten_minutes()), "max items: 5\nmax time:  0.17h\n");
    }

    #[test]
    fn short_id_takes_prefix() {
        assert_eq!(short_id("abcdef0123"), "abcdef01");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn progress_bar_rounds() {
        assert_eq!(progress_bar(0.75, 10), "########--");
        assert_eq!(progress_bar(0.0, 4), "----");
        assert_eq!(progress_bar(1.0, 4), "####");
    }
}
