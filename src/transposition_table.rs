use parking_lot::Mutex;

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

/// Records every state produced in one search so that no state is expanded twice
pub trait Transpositions<S> {
    /// Inserts `state`, returning false if it was already present
    fn insert_if_absent(&mut self, state: &S) -> bool;
    fn contains(&self, state: &S) -> bool;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct TranspositionSet<S> {
    states: HashSet<S>,
}

impl<S: Clone + Eq + Hash> TranspositionSet<S> {
    pub fn new() -> Self {
        Self {
            states: HashSet::new(),
        }
    }
}

impl<S: Clone + Eq + Hash> Default for TranspositionSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Eq + Hash> Transpositions<S> for TranspositionSet<S> {
    fn insert_if_absent(&mut self, state: &S) -> bool {
        if self.states.contains(state) {
            return false;
        }
        self.states.insert(state.clone())
    }
    fn contains(&self, state: &S) -> bool {
        self.states.contains(state)
    }
    fn len(&self) -> usize {
        self.states.len()
    }
}

/// A transposition set that can be cloned into several threads.
/// Every clone sees the same states.
#[derive(Clone, Debug)]
pub struct SharedTranspositionSet<S> {
    states: Arc<Mutex<HashSet<S>>>,
}

impl<S: Clone + Eq + Hash> SharedTranspositionSet<S> {
    pub fn new() -> Self {
        Self {
            states: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<S: Clone + Eq + Hash> Default for SharedTranspositionSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Eq + Hash> Transpositions<S> for SharedTranspositionSet<S> {
    fn insert_if_absent(&mut self, state: &S) -> bool {
        let mut states = self.states.lock();
        if states.contains(state) {
            return false;
        }
        states.insert(state.clone())
    }
    fn contains(&self, state: &S) -> bool {
        self.states.lock().contains(state)
    }
    fn len(&self) -> usize {
        self.states.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_write_once() {
        let mut set = TranspositionSet::new();
        assert!(set.insert_if_absent(&7u32));
        assert!(!set.insert_if_absent(&7u32));
        assert!(set.contains(&7));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn shared_clones_see_each_other() {
        let mut first = SharedTranspositionSet::new();
        let mut second = first.clone();
        assert!(first.insert_if_absent(&"a1"));
        assert!(!second.insert_if_absent(&"a1"));
        assert!(second.insert_if_absent(&"b2"));
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn shared_insert_across_threads() {
        let set = SharedTranspositionSet::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mut set = set.clone();
                std::thread::spawn(move || (0..100u32).filter(|i| set.insert_if_absent(i)).count())
            })
            .collect();
        let inserted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(inserted, 100);
        assert_eq!(set.len(), 100);
    }
}
