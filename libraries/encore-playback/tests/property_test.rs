//! Property-based tests for playlist bookkeeping and shuffle planning
//!
//! Uses proptest to check invariants across random operation sequences.

mod common;

use common::Harness;
use encore_core::{MediaEntry, RepeatMode};
use encore_playback::{History, NavigationPlanner, Playlist};
use proptest::prelude::*;
use std::collections::HashSet;

// ===== Helpers =====

#[derive(Debug, Clone)]
enum Op {
    Append,
    InsertNext,
    Remove(usize),
    Move(usize, usize),
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Append),
        Just(Op::InsertNext),
        (0usize..32).prop_map(Op::Remove),
        (0usize..32, 0usize..33).prop_map(|(from, to)| Op::Move(from, to)),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn move_in_model(model: &mut Vec<String>, from: usize, to: usize) {
    let item = model.remove(from);
    model.insert(if to > from { to - 1 } else { to }, item);
}

// ===== Property Tests =====

proptest! {
    /// Property: the current index keeps pointing at the same entry through
    /// additions, removals of other entries and moves
    #[test]
    fn current_entry_survives_structural_changes(
        initial in 1usize..8,
        start in 0usize..8,
        ops in prop::collection::vec(arbitrary_op(), 1..30),
    ) {
        runtime().block_on(async {
            let h = Harness::new();
            let mut model: Vec<String> = (0..initial).map(|i| format!("/m/{}", i)).collect();
            let start = start % initial;
            let entries = model.iter().map(MediaEntry::new).collect();
            h.player.load(entries, start).await.unwrap();
            let current = model[start].clone();
            let mut counter = initial;

            for op in ops {
                let position = model.iter().position(|l| *l == current).unwrap();
                match op {
                    Op::Append => {
                        let location = format!("/m/{}", counter);
                        counter += 1;
                        h.player.append(vec![MediaEntry::new(location.as_str())]).await.unwrap();
                        model.push(location);
                    }
                    Op::InsertNext => {
                        let location = format!("/m/{}", counter);
                        counter += 1;
                        h.player.insert_next(vec![MediaEntry::new(location.as_str())]).await.unwrap();
                        model.insert(position + 1, location);
                    }
                    Op::Remove(index) => {
                        let index = index % model.len();
                        if index == position {
                            continue;
                        }
                        h.player.remove(index).await.unwrap();
                        model.remove(index);
                    }
                    Op::Move(from, to) => {
                        let from = from % model.len();
                        let to = to % (model.len() + 1);
                        h.player.move_entry(from, to).await.unwrap();
                        move_in_model(&mut model, from, to);
                    }
                }

                let status = h.status().await;
                let expected = model.iter().position(|l| *l == current);
                prop_assert_eq!(status.current, expected);
                prop_assert_eq!(status.current_location.as_deref(), Some(current.as_str()));
                prop_assert_eq!(h.player.playlist().locations(), model.clone());
            }

            // Only the initial load reached the engine
            prop_assert_eq!(h.loads().len(), 1);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Property: a shuffle cycle visits every entry exactly once and never
    /// plans an index that is current or already in the history
    #[test]
    fn shuffle_cycle_is_a_permutation(
        size in 3usize..25,
        start in 0usize..25,
        seed in any::<u64>(),
    ) {
        let mut planner = NavigationPlanner::new(Some(seed));
        let mut history = History::new();
        let mut current = start % size;
        let mut visited = vec![current];

        loop {
            let nav = planner.plan(size, Some(current), true, RepeatMode::Off, &mut history);
            let Some(next) = nav.next else { break };
            prop_assert!(next < size);
            prop_assert_ne!(next, current);
            prop_assert!(!history.contains(next));
            history.push(current);
            current = next;
            visited.push(current);
        }

        let unique: HashSet<_> = visited.iter().copied().collect();
        prop_assert_eq!(visited.len(), size);
        prop_assert_eq!(unique.len(), size);
    }

    /// Property: with repeat on, shuffle never runs dry and never replans the
    /// current entry
    #[test]
    fn shuffle_with_repeat_never_runs_dry(
        size in 3usize..12,
        seed in any::<u64>(),
    ) {
        let mut planner = NavigationPlanner::new(Some(seed));
        let mut history = History::new();
        let mut current = 0;

        for _ in 0..(size * 3) {
            let nav = planner.plan(size, Some(current), true, RepeatMode::All, &mut history);
            let next = nav.next;
            prop_assert!(next.is_some());
            let next = next.unwrap_or_default();
            prop_assert_ne!(next, current);
            history.push(current);
            current = next;
        }
    }

    /// Property: moving an entry matches remove-then-insert
    #[test]
    fn move_matches_remove_then_insert(
        len in 1usize..20,
        from in 0usize..20,
        to in 0usize..21,
    ) {
        let playlist = Playlist::new();
        let mut model: Vec<String> = (0..len).map(|i| format!("/m/{}", i)).collect();
        playlist.replace_all(model.iter().map(MediaEntry::new).collect());

        let from = from % len;
        let to = to % (len + 1);
        playlist.move_entry(from, to).unwrap();
        move_in_model(&mut model, from, to);

        prop_assert_eq!(playlist.locations(), model);
    }
}
