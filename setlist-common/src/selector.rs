//! Quota selector
//!
//! Chooses a non-repeating subset of songs whose running time comes as close
//! as possible to a target without exceeding it. The search is a randomized
//! multi-trial greedy fit: each trial shuffles the library and takes every
//! song that still fits, and the trial with the least slack wins. Randomness
//! is supplied by the caller so results are reproducible under a fixed seed.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

use crate::models::Song;

/// Default number of greedy trials per selection
pub const DEFAULT_TRIALS: usize = 256;

/// Select songs for a setlist.
///
/// - `target == None`: every song, in uniformly random order.
/// - `target == Some(t)`: runs `trials` greedy attempts (at least one) and
///   returns the subset with the smallest slack `t - total`; the earliest
///   attempt wins ties. The returned total never exceeds `t`.
///
/// Songs sharing an id are considered once.
pub fn select<R: Rng + ?Sized>(
    songs: &[Song],
    target: Option<u32>,
    trials: usize,
    rng: &mut R,
) -> Vec<Song> {
    let mut seen = HashSet::new();
    let mut pool: Vec<&Song> = songs.iter().filter(|song| seen.insert(song.id)).collect();

    let Some(target) = target else {
        pool.shuffle(rng);
        return pool.into_iter().cloned().collect();
    };

    let mut best: Option<(u32, Vec<&Song>)> = None;
    for attempt in 0..trials.max(1) {
        pool.shuffle(rng);
        let (total, chosen) = greedy_fit(&pool, target);
        if chosen.is_empty() {
            continue;
        }

        let slack = target - total;
        let improves = best.as_ref().map_or(true, |(best_slack, _)| slack < *best_slack);
        if improves {
            debug!(attempt, slack, songs = chosen.len(), "selector improved");
            best = Some((slack, chosen));
            if slack == 0 {
                break;
            }
        }
    }

    match best {
        Some((_, chosen)) => chosen.into_iter().cloned().collect(),
        None => shortest_fitting(&pool, target).into_iter().cloned().collect(),
    }
}

/// Walk `order` once, taking every song that keeps the total within `target`
fn greedy_fit<'a>(order: &[&'a Song], target: u32) -> (u32, Vec<&'a Song>) {
    let mut total = 0u32;
    let mut chosen = Vec::new();
    for song in order {
        if let Some(next) = total.checked_add(song.duration_seconds) {
            if next <= target {
                total = next;
                chosen.push(*song);
            }
        }
    }
    (total, chosen)
}

fn shortest_fitting<'a>(pool: &[&'a Song], target: u32) -> Option<&'a Song> {
    pool.iter()
        .copied()
        .min_by_key(|song| song.duration_seconds)
        .filter(|song| song.duration_seconds <= target)
}
