use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry on the stack.
///
/// Field names follow the persisted record layout (`createdAt` as epoch
/// milliseconds), so stacks written by older front ends load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// UUID v4 string
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub selected: bool,
}

impl Item {
    /// Build a fresh, unselected item from a draft.
    pub fn new(id: String, draft: ItemDraft, created_at: DateTime<Utc>) -> Self {
        Item {
            id,
            title: draft.title,
            description: draft.description,
            links: draft.links,
            created_at,
            selected: false,
        }
    }

    /// Apply a partial update. Returns true if any field changed.
    pub fn apply(&mut self, patch: ItemPatch) -> bool {
        let mut changed = false;
        if let Some(title) = patch.title
            && title != self.title
        {
            self.title = title;
            changed = true;
        }
        if let Some(description) = patch.description
            && description != self.description
        {
            self.description = description;
            changed = true;
        }
        if let Some(links) = patch.links {
            let links = normalize_links(links);
            if links != self.links {
                self.links = links;
                changed = true;
            }
        }
        changed
    }
}

/// The user-supplied fields of a new item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub title: String,
    pub description: String,
    pub links: Vec<String>,
}

impl ItemDraft {
    pub fn new(title: impl Into<String>) -> Self {
        ItemDraft {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = normalize_links(links.into_iter().map(Into::into).collect());
        self
    }
}

/// Partial item update. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub links: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.links.is_none()
    }
}

/// Trim links, drop empties and duplicates, keep first-seen order.
pub fn normalize_links(links: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(links.len());
    for link in links {
        let link = link.trim();
        if link.is_empty() || out.iter().any(|l| l == link) {
            continue;
        }
        out.push(link.to_string());
    }
    out
}

/// The URL a link should open. Bare hosts get an `https://` scheme.
pub fn link_href(link: &str) -> String {
    if link.starts_with("http") {
        link.to_string()
    } else {
        format!("https://{}", link)
    }
}
