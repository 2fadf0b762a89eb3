use std::collections::HashMap;

use crate::domain::matching::RankedMatch;
use crate::domain::researcher::CandidateHit;
use crate::domain::types::ResearcherId;

/// Rescale a raw similarity in `[0, 1]` to an integer score in `0..=100`.
///
/// Out-of-range raw values are clamped and NaN scores as 0.
pub fn rescale_score(raw: f32) -> i32 {
    let scaled = (raw * 100.0).floor();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, 100.0) as i32
}

/// NaN sorts below every number, so a real score always displaces it.
fn outranks(candidate: f32, kept: f32) -> bool {
    candidate > kept || (kept.is_nan() && !candidate.is_nan())
}

/// Collapse hits to one per researcher and order them by score.
///
/// The kept hit per researcher is the one with the highest raw score; on an
/// exact tie the first one seen wins. Equal integer scores keep the order in
/// which each researcher was first seen. At most `limit` matches are returned.
pub fn rank(hits: Vec<CandidateHit>, limit: usize) -> Vec<RankedMatch> {
    let mut best: Vec<CandidateHit> = Vec::new();
    let mut slots: HashMap<ResearcherId, usize> = HashMap::new();

    for hit in hits {
        match slots.get(&hit.researcher.id) {
            Some(&slot) => {
                if outranks(hit.score, best[slot].score) {
                    best[slot] = hit;
                }
            }
            None => {
                slots.insert(hit.researcher.id, best.len());
                best.push(hit);
            }
        }
    }

    let mut ranked: Vec<RankedMatch> = best
        .into_iter()
        .map(|hit| RankedMatch {
            score: rescale_score(hit.score),
            raw_score: hit.score,
            researcher: hit.researcher,
        })
        .collect();

    // stable: ties keep first-seen order
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(limit);
    ranked
}
