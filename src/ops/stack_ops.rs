use crate::model::item::{Item, ItemPatch};

/// Error type for resolving user-supplied item ids
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("ambiguous item id {prefix}: matches {count} items")]
    Ambiguous { prefix: String, count: usize },
    #[error("no item selected")]
    NoSelection,
}

// ---------------------------------------------------------------------------
// Push / pop
// ---------------------------------------------------------------------------

/// Append `item` on top, then evict from the bottom until the stack fits
/// `max_items`. Returns the evicted items, oldest first.
/// The new item always survives, even with a bound of zero.
pub fn push(items: &mut Vec<Item>, item: Item, max_items: usize) -> Vec<Item> {
    items.push(item);
    let overflow = items.len().saturating_sub(max_items.max(1));
    items.drain(..overflow).collect()
}

/// Remove the top item. No-op on an empty stack.
pub fn pop(items: &mut Vec<Item>) -> Option<Item> {
    let item = items.pop();
    clear_selection(items);
    item
}

// ---------------------------------------------------------------------------
// Reordering
// ---------------------------------------------------------------------------

/// Swap the item with its successor (toward the top).
/// Returns false if the id is absent or the item is already on top.
pub fn move_up(items: &mut [Item], id: &str) -> bool {
    match position(items, id) {
        Some(idx) if idx + 1 < items.len() => {
            items.swap(idx, idx + 1);
            true
        }
        _ => false,
    }
}

/// Swap the item with its predecessor (toward the bottom).
/// Returns false if the id is absent or the item is already at the bottom.
pub fn move_down(items: &mut [Item], id: &str) -> bool {
    match position(items, id) {
        Some(idx) if idx > 0 => {
            items.swap(idx, idx - 1);
            true
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Edit / delete
// ---------------------------------------------------------------------------

/// Remove an item by id and clear the selection.
pub fn delete(items: &mut Vec<Item>, id: &str) -> Option<Item> {
    let removed = position(items, id).map(|idx| items.remove(idx));
    clear_selection(items);
    removed
}

/// Merge `patch` into the matching item. Returns true if anything changed.
pub fn update(items: &mut [Item], id: &str, patch: ItemPatch) -> bool {
    match items.iter_mut().find(|item| item.id == id) {
        Some(item) => item.apply(patch),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Toggle selection of `id` given the current selection, returning the new one.
///
/// Selecting a new id deselects every other item; selecting the selected id
/// deselects it. An unknown id still becomes the selection, left dangling
/// with no item flagged.
pub fn toggle_selection(items: &mut [Item], current: Option<&str>, id: &str) -> Option<String> {
    let next = if current == Some(id) {
        None
    } else {
        Some(id.to_string())
    };
    for item in items.iter_mut() {
        item.selected = next.as_deref() == Some(item.id.as_str());
    }
    next
}

pub fn clear_selection(items: &mut [Item]) {
    for item in items.iter_mut() {
        item.selected = false;
    }
}

/// The id of the first item flagged as selected, if any.
pub fn selected_id(items: &[Item]) -> Option<&str> {
    items.iter().find(|i| i.selected).map(|i| i.id.as_str())
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

pub fn position(items: &[Item], id: &str) -> Option<usize> {
    items.iter().position(|item| item.id == id)
}

pub fn find<'a>(items: &'a [Item], id: &str) -> Option<&'a Item> {
    items.iter().find(|item| item.id == id)
}

/// Resolve a full id or a unique id prefix to a full id.
pub fn resolve_id(items: &[Item], prefix: &str) -> Result<String, LookupError> {
    if let Some(item) = find(items, prefix) {
        return Ok(item.id.clone());
    }
    let matches: Vec<&Item> = items
        .iter()
        .filter(|item| !prefix.is_empty() && item.id.starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [item] => Ok(item.id.clone()),
        [] => Err(LookupError::NotFound(prefix.to_string())),
        many => Err(LookupError::Ambiguous {
            prefix: prefix.to_string(),
            count: many.len(),
        }),
    }
}
