use std::cmp::Reverse;

use crate::item::NewsItem;

/// Order items by importance, highest first.
///
/// Ties keep the order the items arrived in (their collection index), so the
/// result does not depend on which enrichment task finished first.
pub fn rank(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut indexed: Vec<(usize, NewsItem)> = items.into_iter().enumerate().collect();
    indexed.sort_by_key(|(idx, item)| (Reverse(item.importance_score), *idx));
    indexed.into_iter().map(|(_, item)| item).collect()
}
