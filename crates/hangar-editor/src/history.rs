//! Undo/redo history for the showcase layout editor.
//!
//! Wraps a pure `(state, action) -> state` reducer. Snapshots are held as
//! `Arc<S>` and compared by pointer: a reducer signals "nothing changed" by
//! handing back the same `Arc` it was given, and the engine never looks
//! inside a snapshot.
//!
//! Actions classify themselves through [`Classify`]; the control commands
//! (undo, redo, batch begin/end) are variants of [`Command`] and never reach
//! the inner reducer.

use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of undo steps retained
pub const MAX_HISTORY: usize = 50;

/// How an action interacts with the undo history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Replaces the document and forgets all history (document load)
    FullReplace,
    /// Replaces the document as one undoable step (template apply)
    PreservingReplace,
    /// Continuous edit inside a batch; updates the present only
    Batched,
    /// Discrete edit; one undo step whenever it changes the document
    Tracked,
    /// Never recorded (selection, hover)
    Untracked,
}

/// Implemented by editor actions so the history knows how to record them
pub trait Classify {
    fn kind(&self) -> ActionKind;
}

/// Everything that can be dispatched to an [`UndoableReducer`]
#[derive(Debug, Clone, PartialEq)]
pub enum Command<A> {
    Undo,
    Redo,
    /// Start collapsing subsequent batched actions into one step
    BeginBatch,
    /// Commit the batch as a single undo step
    EndBatch,
    Apply(A),
}

/// Past, present and future snapshots of a document
#[derive(Debug)]
pub struct History<S> {
    past: VecDeque<Arc<S>>,
    present: Arc<S>,
    future: VecDeque<Arc<S>>,
    batch_snapshot: Option<Arc<S>>,
}

impl<S> Clone for History<S> {
    fn clone(&self) -> Self {
        Self {
            past: self.past.clone(),
            present: Arc::clone(&self.present),
            future: self.future.clone(),
            batch_snapshot: self.batch_snapshot.clone(),
        }
    }
}

impl<S> History<S> {
    pub fn new(initial: Arc<S>) -> Self {
        Self {
            past: VecDeque::new(),
            present: initial,
            future: VecDeque::new(),
            batch_snapshot: None,
        }
    }

    pub fn present(&self) -> &Arc<S> {
        &self.present
    }

    /// Oldest first
    pub fn past(&self) -> impl ExactSizeIterator<Item = &Arc<S>> {
        self.past.iter()
    }

    /// Next redo first
    pub fn future(&self) -> impl ExactSizeIterator<Item = &Arc<S>> {
        self.future.iter()
    }

    pub fn batch_snapshot(&self) -> Option<&Arc<S>> {
        self.batch_snapshot.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    fn undo(&mut self) {
        let Some(previous) = self.past.pop_back() else {
            return;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push_front(current);
        self.batch_snapshot = None;
    }

    fn redo(&mut self, limit: usize) {
        let Some(next) = self.future.pop_front() else {
            return;
        };
        let current = std::mem::replace(&mut self.present, next);
        push_bounded(&mut self.past, current, limit);
        self.batch_snapshot = None;
    }

    /// Record `snapshot` as an undo step and drop the redo branch
    fn record(&mut self, snapshot: Arc<S>, limit: usize) {
        push_bounded(&mut self.past, snapshot, limit);
        self.future.clear();
    }
}

fn push_bounded<S>(stack: &mut VecDeque<Arc<S>>, snapshot: Arc<S>, limit: usize) {
    stack.push_back(snapshot);
    while stack.len() > limit {
        stack.pop_front();
    }
}

/// A reducer wrapped with batched and instant undo/redo tracking
pub struct UndoableReducer<S, A, F>
where
    F: Fn(&Arc<S>, &A) -> Arc<S>,
{
    reducer: F,
    limit: usize,
    history: History<S>,
    _action: std::marker::PhantomData<fn(&A)>,
}

impl<S, A, F> UndoableReducer<S, A, F>
where
    A: Classify,
    F: Fn(&Arc<S>, &A) -> Arc<S>,
{
    pub fn new(reducer: F, initial: S) -> Self {
        Self::with_limit(reducer, initial, MAX_HISTORY)
    }

    pub fn with_limit(reducer: F, initial: S, limit: usize) -> Self {
        Self {
            reducer,
            limit,
            history: History::new(Arc::new(initial)),
            _action: std::marker::PhantomData,
        }
    }

    pub fn state(&self) -> &Arc<S> {
        self.history.present()
    }

    pub fn history(&self) -> &History<S> {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn dispatch(&mut self, command: Command<A>) {
        let limit = self.limit;
        let history = &mut self.history;

        match command {
            Command::Undo => history.undo(),
            Command::Redo => history.redo(limit),
            Command::BeginBatch => {
                history.batch_snapshot = Some(Arc::clone(&history.present));
            }
            Command::EndBatch => {
                if let Some(snapshot) = history.batch_snapshot.take()
                    && !Arc::ptr_eq(&snapshot, &history.present)
                {
                    history.record(snapshot, limit);
                }
            }
            Command::Apply(action) => {
                let next = (self.reducer)(&history.present, &action);
                match action.kind() {
                    ActionKind::FullReplace => {
                        *history = History::new(next);
                    }
                    ActionKind::PreservingReplace => {
                        let previous = std::mem::replace(&mut history.present, next);
                        history.record(previous, limit);
                    }
                    ActionKind::Tracked => {
                        if !Arc::ptr_eq(&next, &history.present) {
                            let previous = std::mem::replace(&mut history.present, next);
                            history.record(previous, limit);
                        }
                    }
                    ActionKind::Batched | ActionKind::Untracked => {
                        history.present = next;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Op {
        Set(i32),
        Add(i32),
        Drag(i32),
        Template(i32),
        Hover,
    }

    impl Classify for Op {
        fn kind(&self) -> ActionKind {
            match self {
                Op::Set(_) => ActionKind::FullReplace,
                Op::Template(_) => ActionKind::PreservingReplace,
                Op::Add(_) => ActionKind::Tracked,
                Op::Drag(_) => ActionKind::Batched,
                Op::Hover => ActionKind::Untracked,
            }
        }
    }

    fn reduce(state: &Arc<i32>, op: &Op) -> Arc<i32> {
        match *op {
            Op::Set(v) | Op::Template(v) => Arc::new(v),
            Op::Add(0) | Op::Drag(0) | Op::Hover => Arc::clone(state),
            Op::Add(d) | Op::Drag(d) => Arc::new(**state + d),
        }
    }

    fn editor(initial: i32) -> UndoableReducer<i32, Op, fn(&Arc<i32>, &Op) -> Arc<i32>> {
        UndoableReducer::new(reduce as fn(&Arc<i32>, &Op) -> Arc<i32>, initial)
    }

    fn past_values(e: &UndoableReducer<i32, Op, fn(&Arc<i32>, &Op) -> Arc<i32>>) -> Vec<i32> {
        e.history().past().map(|s| **s).collect()
    }

    #[test]
    fn test_fresh_history_has_nothing_to_undo() {
        let e = editor(0);
        assert!(!e.can_undo());
        assert!(!e.can_redo());
        assert_eq!(**e.state(), 0);
    }

    #[test]
    fn test_tracked_action_records_previous_state() {
        let mut e = editor(0);
        e.dispatch(Command::Apply(Op::Add(5)));
        assert_eq!(**e.state(), 5);
        assert_eq!(past_values(&e), vec![0]);
        assert!(e.can_undo());
    }

    #[test]
    fn test_history_is_bounded_oldest_first() {
        let mut e = editor(0);
        for _ in 0..(MAX_HISTORY + 7) {
            e.dispatch(Command::Apply(Op::Add(1)));
        }
        let past = past_values(&e);
        assert_eq!(past.len(), MAX_HISTORY);
        assert_eq!(past.first(), Some(&7));
        assert_eq!(past.last(), Some(&(MAX_HISTORY as i32 + 6)));
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut e = editor(0);
        let start = Arc::clone(e.state());
        for d in [3, -1, 10, 4] {
            e.dispatch(Command::Apply(Op::Add(d)));
        }
        let end = Arc::clone(e.state());

        for _ in 0..4 {
            e.dispatch(Command::Undo);
        }
        assert!(Arc::ptr_eq(e.state(), &start));
        assert!(!e.can_undo());

        for _ in 0..4 {
            e.dispatch(Command::Redo);
        }
        assert!(Arc::ptr_eq(e.state(), &end));
        assert!(!e.can_redo());
    }

    #[test]
    fn test_undo_and_redo_on_empty_are_noops() {
        let mut e = editor(9);
        e.dispatch(Command::Undo);
        e.dispatch(Command::Redo);
        assert_eq!(**e.state(), 9);
        assert!(!e.can_undo());
        assert!(!e.can_redo());
    }

    #[test]
    fn test_batch_collapses_to_single_step() {
        let mut e = editor(0);
        e.dispatch(Command::BeginBatch);
        for _ in 0..20 {
            e.dispatch(Command::Apply(Op::Drag(1)));
        }
        assert!(e.history().batch_snapshot().is_some());
        e.dispatch(Command::EndBatch);

        assert_eq!(**e.state(), 20);
        assert_eq!(past_values(&e), vec![0]);
        assert!(e.history().batch_snapshot().is_none());

        e.dispatch(Command::Undo);
        assert_eq!(**e.state(), 0);
    }

    #[test]
    fn test_batch_without_change_records_nothing() {
        let mut e = editor(0);
        e.dispatch(Command::BeginBatch);
        e.dispatch(Command::Apply(Op::Drag(0)));
        e.dispatch(Command::EndBatch);
        assert!(!e.can_undo());
        assert!(e.history().batch_snapshot().is_none());
    }

    #[test]
    fn test_end_batch_clears_redo_branch() {
        let mut e = editor(0);
        e.dispatch(Command::Apply(Op::Add(1)));
        e.dispatch(Command::Undo);
        assert!(e.can_redo());

        e.dispatch(Command::BeginBatch);
        e.dispatch(Command::Apply(Op::Drag(2)));
        e.dispatch(Command::EndBatch);
        assert!(!e.can_redo());
    }

    #[test]
    fn test_noop_tracked_action_is_suppressed() {
        let mut e = editor(0);
        e.dispatch(Command::Apply(Op::Add(2)));
        e.dispatch(Command::Undo);
        e.dispatch(Command::Apply(Op::Add(0)));
        assert_eq!(e.history().past().len(), 0);
        // Redo branch survives a no-op
        assert!(e.can_redo());
    }

    #[test]
    fn test_full_replace_discards_history() {
        let mut e = editor(0);
        e.dispatch(Command::Apply(Op::Add(1)));
        e.dispatch(Command::Apply(Op::Add(1)));
        e.dispatch(Command::Undo);
        e.dispatch(Command::Apply(Op::Set(100)));

        assert_eq!(**e.state(), 100);
        assert!(!e.can_undo());
        assert!(!e.can_redo());
    }

    #[test]
    fn test_preserving_replace_is_undoable() {
        let mut e = editor(0);
        e.dispatch(Command::Apply(Op::Add(1)));
        e.dispatch(Command::Undo);
        e.dispatch(Command::Apply(Op::Template(42)));

        assert_eq!(**e.state(), 42);
        assert!(!e.can_redo());
        e.dispatch(Command::Undo);
        assert_eq!(**e.state(), 0);
    }

    #[test]
    fn test_untracked_action_updates_present_only() {
        let mut e = editor(3);
        e.dispatch(Command::Apply(Op::Drag(4)));
        e.dispatch(Command::Apply(Op::Hover));
        assert_eq!(**e.state(), 7);
        assert!(!e.can_undo());
    }

    #[test]
    fn test_undo_clears_open_batch() {
        let mut e = editor(0);
        e.dispatch(Command::Apply(Op::Add(1)));
        e.dispatch(Command::BeginBatch);
        e.dispatch(Command::Undo);
        assert!(e.history().batch_snapshot().is_none());
    }

    #[test]
    fn test_custom_limit() {
        let mut e = UndoableReducer::with_limit(reduce, 0, 2);
        for _ in 0..5 {
            e.dispatch(Command::Apply(Op::Add(1)));
        }
        assert_eq!(e.history().past().len(), 2);

        let mut none = UndoableReducer::with_limit(reduce, 0, 0);
        none.dispatch(Command::Apply(Op::Add(1)));
        assert!(!none.can_undo());
    }
}
