use std::collections::HashMap;

use crate::item::NewsItem;

/// Keep one item per `url`; on collision the later item wins.
///
/// The survivor sits where the last occurrence of its url was, so the
/// relative order of survivors follows the order of their final sightings.
/// Different communities may attach different snippets to one article, and
/// this makes the most recent one the kept copy.
pub fn dedup_last_wins(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut last_index: HashMap<&str, usize> = HashMap::new();
    for (idx, item) in items.iter().enumerate() {
        last_index.insert(item.url.as_str(), idx);
    }

    let keep: Vec<bool> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| last_index.get(item.url.as_str()) == Some(&idx))
        .collect();

    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, keep)| keep.then_some(item))
        .collect()
}
