//! Local undo/redo over full-collection snapshots.
//!
//! History belongs to one client. Snapshots are never transmitted, and
//! remote deltas applied to the live collection neither push a snapshot nor
//! clear the redo stack, so undo only ever walks back this client's own
//! commits.

use inksync_core::Collection;
use tracing::trace;

/// Default number of undo states kept
pub const DEFAULT_HISTORY_DEPTH: usize = 100;

/// Manages undo/redo with collection snapshots
#[derive(Debug, Clone)]
pub struct History {
    /// Past states, most recent last
    undo_stack: Vec<Collection>,
    /// Undone states, most recent last
    redo_stack: Vec<Collection>,
    max_history: usize,
}

impl History {
    /// Create a history keeping at most `max_history` undo states
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history: max_history.max(1),
        }
    }

    /// Save the pre-mutation state. Call once per committed local mutation.
    pub fn record_snapshot(&mut self, current: &Collection) {
        self.undo_stack.push(current.clone());
        self.redo_stack.clear();

        while self.undo_stack.len() > self.max_history {
            self.undo_stack.remove(0);
        }
        trace!(depth = self.undo_stack.len(), "recorded snapshot");
    }

    /// Restore the previous state. Returns false when there is nothing to
    /// undo.
    pub fn undo(&mut self, current: &mut Collection) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        let replaced = std::mem::replace(current, previous);
        self.redo_stack.push(replaced);
        true
    }

    /// Re-apply the most recently undone state
    pub fn redo(&mut self, current: &mut Collection) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let replaced = std::mem::replace(current, next);
        self.undo_stack.push(replaced);
        true
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of states that can be undone
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of states that can be redone
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inksync_core::{Element, Shape, Style};
    use proptest::prelude::*;

    fn rect(id: &str, w: f64) -> Element {
        Element::with_id(
            id.into(),
            Shape::Rectangle { x: 0.0, y: 0.0, width: w, height: w },
            &Style::default(),
        )
    }

    /// Apply one committed local mutation the way the whiteboard does
    fn commit(history: &mut History, live: &mut Collection, mutation: &Mutation) {
        history.record_snapshot(live);
        match mutation {
            Mutation::Add(n) => {
                live.append(rect(&n.to_string(), *n as f64));
            }
            Mutation::Resize(n, w) => {
                live.merge_update(rect(&n.to_string(), *w));
            }
            Mutation::Delete(n) => {
                live.remove(&n.to_string().into());
            }
            Mutation::Clear => live.clear(),
        }
    }

    #[derive(Debug, Clone)]
    enum Mutation {
        Add(u8),
        Resize(u8, f64),
        Delete(u8),
        Clear,
    }

    fn mutation() -> impl Strategy<Value = Mutation> {
        prop_oneof![
            4 => (0u8..8).prop_map(Mutation::Add),
            2 => ((0u8..8), 1.0f64..100.0).prop_map(|(n, w)| Mutation::Resize(n, w)),
            2 => (0u8..8).prop_map(Mutation::Delete),
            1 => Just(Mutation::Clear),
        ]
    }

    #[test]
    fn undo_on_empty_stack_is_noop() {
        let mut history = History::default();
        let mut live = Collection::new();
        live.append(rect("a", 1.0));
        let before = live.clone();

        assert!(!history.undo(&mut live));
        assert!(!history.redo(&mut live));
        assert_eq!(live, before);
    }

    #[test]
    fn undo_restores_pre_mutation_state() {
        let mut history = History::default();
        let mut live = Collection::new();
        commit(&mut history, &mut live, &Mutation::Add(1));
        let after_first = live.clone();
        commit(&mut history, &mut live, &Mutation::Add(2));

        assert!(history.undo(&mut live));
        assert_eq!(live, after_first);
        assert!(history.can_redo());
    }

    #[test]
    fn new_commit_clears_redo() {
        let mut history = History::default();
        let mut live = Collection::new();
        commit(&mut history, &mut live, &Mutation::Add(1));
        commit(&mut history, &mut live, &Mutation::Add(2));
        history.undo(&mut live);
        history.undo(&mut live);
        assert_eq!(history.redo_count(), 2);

        commit(&mut history, &mut live, &Mutation::Add(3));
        assert_eq!(history.redo_count(), 0);
        assert!(!history.redo(&mut live));
    }

    #[test]
    fn remote_changes_do_not_touch_history() {
        let mut history = History::default();
        let mut live = Collection::new();
        commit(&mut history, &mut live, &Mutation::Add(1));
        history.undo(&mut live);

        // a remote add lands directly on the live collection
        live.append(rect("remote", 5.0));
        assert_eq!(history.undo_count(), 0);
        assert_eq!(history.redo_count(), 1);
    }

    #[test]
    fn depth_is_bounded() {
        let mut history = History::new(3);
        let mut live = Collection::new();
        for n in 0..10 {
            commit(&mut history, &mut live, &Mutation::Add(n));
        }
        assert_eq!(history.undo_count(), 3);
        while history.undo(&mut live) {}
        // oldest reachable state has the first seven adds
        assert_eq!(live.len(), 7);
    }

    proptest! {
        #[test]
        fn undo_after_commit_round_trips(
            setup in proptest::collection::vec(mutation(), 0..10),
            last in mutation(),
        ) {
            let mut history = History::default();
            let mut live = Collection::new();
            for m in &setup {
                commit(&mut history, &mut live, m);
            }
            let before = live.clone();
            commit(&mut history, &mut live, &last);
            prop_assert!(history.undo(&mut live));
            prop_assert_eq!(live, before);
        }

        #[test]
        fn undo_n_then_redo_n_reproduces_final_state(
            mutations in proptest::collection::vec(mutation(), 1..20),
            n in 0usize..20,
        ) {
            let mut history = History::default();
            let mut live = Collection::new();
            for m in &mutations {
                commit(&mut history, &mut live, m);
            }
            let final_state = live.clone();
            let n = n.min(history.undo_count());

            for _ in 0..n {
                prop_assert!(history.undo(&mut live));
            }
            for _ in 0..n {
                prop_assert!(history.redo(&mut live));
            }
            prop_assert_eq!(live, final_state);
        }

        #[test]
        fn commit_always_empties_redo(
            mutations in proptest::collection::vec(mutation(), 1..15),
            undos in 0usize..15,
            next in mutation(),
        ) {
            let mut history = History::default();
            let mut live = Collection::new();
            for m in &mutations {
                commit(&mut history, &mut live, m);
            }
            for _ in 0..undos {
                history.undo(&mut live);
            }
            commit(&mut history, &mut live, &next);
            prop_assert_eq!(history.redo_count(), 0);
        }
    }
}
