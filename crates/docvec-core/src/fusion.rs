//! Reciprocal Rank Fusion (RRF).
//!
//! Merges ranked result lists from different strategies (ANN distance,
//! BM25 score) whose raw scores are not comparable. Only ranks matter:
//!
//! ```text
//! rrf(d) = Σ_lists 1 / (k + rank(d))      rank is 1-based
//! ```
//!
//! Items ranked in several lists accumulate contributions, so agreement
//! between strategies beats a single strong ranking.

use std::collections::HashMap;

use crate::models::QueryResult;

/// Standard RRF constant (Cormack, Clarke & Buettcher, SIGIR 2009).
pub const DEFAULT_RRF_K: u32 = 60;

/// Fuse ranked lists into one list ordered by descending RRF score.
///
/// Every item from every list appears exactly once, identified by `id`.
/// Equal scores keep discovery order: the first list in order, then items
/// of later lists not seen before. Each fused item keeps the attributes of
/// its first occurrence and carries its fused score in `dist`.
pub fn reciprocal_rank_fusion(lists: &[Vec<QueryResult>], k: u32) -> Vec<QueryResult> {
    let k = f64::from(k);
    let mut fused: Vec<(QueryResult, f64)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (rank, item) in list.iter().enumerate() {
            let contribution = 1.0 / (k + (rank + 1) as f64);
            match positions.get(&item.id) {
                Some(&pos) => fused[pos].1 += contribution,
                None => {
                    positions.insert(item.id.clone(), fused.len());
                    fused.push((item.clone(), contribution));
                }
            }
        }
    }

    // stable: ties stay in discovery order
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    fused
        .into_iter()
        .map(|(mut item, score)| {
            item.dist = Some(score);
            item
        })
        .collect()
}
