//! Ranker: free, text-only models ordered by preference.

use std::cmp::Ordering;
use std::collections::HashSet;

use thiserror::Error;

use super::ModelDescriptor;

/// Upper bound on the ranked list.
pub const MAX_RANKED_MODELS: usize = 5;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RankError {
    #[error("no suitable models: the catalog has no free text-only models")]
    NoSuitableModels,
}

/// Filters, deduplicates and sorts `candidates` into at most [`MAX_RANKED_MODELS`] ids.
///
/// `candidates` must hold the category listing first, followed by the unfiltered listing.
/// Deduplication keeps the first occurrence, so the category copy of a model wins over its
/// later duplicate. `category_ids` is only consulted for sorting.
///
/// Order: tagged before untagged, then newer `created`, then smaller `context_length`,
/// then id ascending.
pub fn rank_models(
    candidates: &[ModelDescriptor],
    category_ids: &HashSet<String>,
) -> Result<Vec<String>, RankError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut eligible: Vec<&ModelDescriptor> = Vec::new();
    for m in candidates {
        if m.id.is_empty() || !m.is_free() || !m.is_text_only() {
            continue;
        }
        if seen.insert(m.id.as_str()) {
            eligible.push(m);
        }
    }

    eligible.sort_by(|a, b| compare(a, b, category_ids));

    let ranked: Vec<String> = eligible
        .into_iter()
        .take(MAX_RANKED_MODELS)
        .map(|m| m.id.clone())
        .collect();

    if ranked.is_empty() {
        return Err(RankError::NoSuitableModels);
    }
    Ok(ranked)
}

fn compare(a: &ModelDescriptor, b: &ModelDescriptor, category_ids: &HashSet<String>) -> Ordering {
    let tagged_a = category_ids.contains(&a.id);
    let tagged_b = category_ids.contains(&b.id);
    tagged_b
        .cmp(&tagged_a)
        .then_with(|| b.created.unwrap_or(0).cmp(&a.created.unwrap_or(0)))
        .then_with(|| {
            a.context_length
                .unwrap_or(0)
                .cmp(&b.context_length.unwrap_or(0))
        })
        .then_with(|| a.id.cmp(&b.id))
}
