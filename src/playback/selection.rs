//! Shuffle sampling and refill selection
//!
//! Pure functions over playlist entries; all randomness comes from
//! `rand::thread_rng` at the call site's expense, so results are uniform but
//! not reproducible.

use crate::playlist::PlaylistEntry;
use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffle a copy of the entries and keep the leading `ceil(n/2)`
///
/// Seeds a shuffled playlist queue with a purposely incomplete window so
/// later refills still have unseen tracks to draw from.
pub fn sample_half(entries: &[PlaylistEntry]) -> Vec<PlaylistEntry> {
    let mut shuffled = entries.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());

    let half = entries.len().div_ceil(2);
    shuffled.truncate(half);
    shuffled
}

/// Uniformly pick an entry whose id is not excluded, None when exhausted
pub fn pick_random_unique(pool: &[PlaylistEntry], exclude: &[i64]) -> Option<PlaylistEntry> {
    let available: Vec<&PlaylistEntry> =
        pool.iter().filter(|e| !exclude.contains(&e.id)).collect();

    if available.is_empty() {
        return None;
    }

    let picked = available[rand::thread_rng().gen_range(0..available.len())];
    Some(picked.clone())
}
