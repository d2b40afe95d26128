//! Next/previous planning under shuffle and repeat
//!
//! Linear mode walks the playlist in order and wraps when repeat is on.
//! Shuffle mode draws uniformly among entries that are neither current nor in
//! the history; once every entry has been played it stops (repeat off) or
//! clears the history, reseeds and starts a new cycle.
//!
//! Repeat-one is not handled here: the orchestrator replays the current entry
//! without consulting the planner.

use crate::history::History;
use encore_core::RepeatMode;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Smallest playlist where shuffling has an effect
pub const MIN_SHUFFLE_SIZE: usize = 3;

/// Planned neighbours of the current entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigation {
    pub next: Option<usize>,
    pub prev: Option<usize>,
}

/// Computes [`Navigation`] and owns the shuffle random source
#[derive(Debug)]
pub struct NavigationPlanner {
    rng: StdRng,
    seeded: bool,
}

impl NavigationPlanner {
    /// Create a planner; a seed makes shuffle order reproducible
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self {
                rng: StdRng::seed_from_u64(seed),
                seeded: true,
            },
            None => Self {
                rng: StdRng::from_entropy(),
                seeded: false,
            },
        }
    }

    /// Whether shuffle changes anything for a playlist of this size
    pub fn can_shuffle(size: usize) -> bool {
        size >= MIN_SHUFFLE_SIZE
    }

    /// Plan next/previous for the given position
    ///
    /// May prune or clear `history` (invalid top entries, full-cycle reset).
    pub fn plan(
        &mut self,
        size: usize,
        current: Option<usize>,
        shuffling: bool,
        repeat: RepeatMode,
        history: &mut History,
    ) -> Navigation {
        if size == 0 {
            return Navigation::default();
        }

        let current = match current {
            Some(index) if index >= size => {
                warn!("Current index {} outside playlist of {}, ignoring", index, size);
                None
            }
            other => other,
        };

        if shuffling && Self::can_shuffle(size) {
            self.plan_shuffled(size, current, repeat, history)
        } else {
            Self::plan_linear(size, current, repeat)
        }
    }

    fn plan_linear(size: usize, current: Option<usize>, repeat: RepeatMode) -> Navigation {
        let prev = current.and_then(|c| c.checked_sub(1));
        let candidate = current.map_or(0, |c| c + 1);
        let next = if candidate < size {
            Some(candidate)
        } else if repeat == RepeatMode::Off {
            None
        } else {
            Some(0)
        };

        Navigation { next, prev }
    }

    fn plan_shuffled(
        &mut self,
        size: usize,
        current: Option<usize>,
        repeat: RepeatMode,
        history: &mut History,
    ) -> Navigation {
        let prev = history.drop_invalid_top(size);

        let mut candidates = Self::unplayed(size, current, history);
        if candidates.is_empty() {
            if repeat == RepeatMode::Off {
                return Navigation { next: None, prev };
            }
            debug!("Shuffle cycle complete over {} entries, reshuffling", size);
            history.clear();
            self.reseed();
            candidates = Self::unplayed(size, current, history);
        }

        let next = candidates.choose(&mut self.rng).copied();
        Navigation { next, prev }
    }

    /// Indices that are neither current nor in the history
    fn unplayed(size: usize, current: Option<usize>, history: &History) -> Vec<usize> {
        (0..size)
            .filter(|&i| Some(i) != current && !history.contains(i))
            .collect()
    }

    fn reseed(&mut self) {
        self.rng = if self.seeded {
            StdRng::seed_from_u64(self.rng.gen())
        } else {
            StdRng::from_entropy()
        };
    }
}

impl Default for NavigationPlanner {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn plan(
        size: usize,
        current: Option<usize>,
        shuffling: bool,
        repeat: RepeatMode,
        history: &mut History,
    ) -> Navigation {
        NavigationPlanner::new(Some(7)).plan(size, current, shuffling, repeat, history)
    }

    #[test]
    fn empty_playlist_has_no_neighbours() {
        let nav = plan(0, None, true, RepeatMode::All, &mut History::new());
        assert_eq!(nav, Navigation::default());
    }

    #[test]
    fn linear_middle() {
        let nav = plan(4, Some(2), false, RepeatMode::Off, &mut History::new());
        assert_eq!(nav, Navigation { next: Some(3), prev: Some(1) });
    }

    #[test]
    fn linear_end_without_repeat_stops() {
        let nav = plan(2, Some(1), false, RepeatMode::Off, &mut History::new());
        assert_eq!(nav, Navigation { next: None, prev: Some(0) });
    }

    #[test]
    fn linear_end_with_repeat_wraps() {
        for repeat in [RepeatMode::All, RepeatMode::One] {
            let nav = plan(3, Some(2), false, repeat, &mut History::new());
            assert_eq!(nav.next, Some(0));
        }
    }

    #[test]
    fn linear_without_current_starts_at_zero() {
        let nav = plan(3, None, false, RepeatMode::Off, &mut History::new());
        assert_eq!(nav, Navigation { next: Some(0), prev: None });
    }

    #[test]
    fn out_of_range_current_is_treated_as_none() {
        let nav = plan(3, Some(9), false, RepeatMode::Off, &mut History::new());
        assert_eq!(nav, Navigation { next: Some(0), prev: None });
    }

    #[test]
    fn shuffle_ignored_for_two_entries() {
        let mut history = History::new();
        history.push(1);
        let nav = plan(2, Some(0), true, RepeatMode::Off, &mut history);
        assert_eq!(nav, Navigation { next: Some(1), prev: None });
    }

    #[test]
    fn shuffle_never_picks_current_or_history() {
        let mut planner = NavigationPlanner::new(Some(42));
        let mut history = History::new();
        history.push(0);
        history.push(3);

        for _ in 0..200 {
            let nav = planner.plan(6, Some(1), true, RepeatMode::Off, &mut history);
            let next = nav.next.unwrap();
            assert!(![0, 1, 3].contains(&next));
            assert_eq!(nav.prev, Some(3));
        }
    }

    #[test]
    fn shuffle_prev_skips_removed_indices() {
        let mut history = History::new();
        history.push(1);
        history.push(8);
        history.push(6);

        let nav = plan(5, Some(0), true, RepeatMode::All, &mut history);
        assert_eq!(nav.prev, Some(1));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn shuffle_full_cycle_without_repeat_stops() {
        let mut history = History::new();
        history.push(0);
        history.push(2);

        let nav = plan(3, Some(1), true, RepeatMode::Off, &mut history);
        assert_eq!(nav.next, None);
        assert_eq!(nav.prev, Some(2));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn shuffle_full_cycle_with_repeat_reshuffles() {
        let mut history = History::new();
        history.push(0);
        history.push(2);

        let nav = plan(3, Some(1), true, RepeatMode::All, &mut history);
        assert!(history.is_empty());
        assert!(matches!(nav.next, Some(0) | Some(2)));
        // prev was read before the reset
        assert_eq!(nav.prev, Some(2));
    }

    #[test]
    fn seeded_planners_agree() {
        let mut a = NavigationPlanner::new(Some(99));
        let mut b = NavigationPlanner::new(Some(99));
        let picks = |p: &mut NavigationPlanner| {
            (0..20)
                .map(|_| p.plan(10, Some(0), true, RepeatMode::All, &mut History::new()).next)
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(&mut a), picks(&mut b));
    }

    #[test]
    fn shuffle_draw_covers_every_candidate() {
        let mut planner = NavigationPlanner::new(Some(3));
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let nav = planner.plan(5, Some(2), true, RepeatMode::Off, &mut History::new());
            seen.insert(nav.next.unwrap());
        }
        assert_eq!(seen, HashSet::from([0, 1, 3, 4]));
    }
}
