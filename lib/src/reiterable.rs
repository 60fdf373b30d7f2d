//! A lazily filled, replayable sequence.
//!
//! Query results are produced by one-shot iterators that may sit on top of a
//! network request. A [`Reiterable`] pulls from its producer only on demand and
//! records every item it hands out, so the sequence can be walked any number of
//! times (including several walks interleaved with each other) while the
//! producer itself runs at most once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct State<'a, T> {
    history: Vec<T>,
    source: Option<Box<dyn Iterator<Item = T> + 'a>>,
}

/// Cloning a `Reiterable` yields a second handle onto the same buffer.
pub struct Reiterable<'a, T> {
    state: Rc<RefCell<State<'a, T>>>,
}

impl<'a, T> Clone for Reiterable<'a, T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<'a, T: Clone + 'a> Reiterable<'a, T> {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        Self {
            state: Rc::new(RefCell::new(State {
                history: Vec::new(),
                source: Some(Box::new(items.into_iter())),
            })),
        }
    }

    /// A sequence whose items are all known already.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                history: items,
                source: None,
            })),
        }
    }

    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Starts a traversal: buffered items first, then the producer's remainder.
    pub fn iter(&self) -> Iter<'a, T> {
        Iter {
            state: Rc::clone(&self.state),
            pos: 0,
        }
    }

    pub fn first(&self) -> Option<T> {
        self.iter().next()
    }

    /// Number of items. Drains the producer.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Probes for a single item without draining the producer.
    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    /// Whether the producer has run to completion and been dropped.
    pub fn is_exhausted(&self) -> bool {
        self.state.borrow().source.is_none()
    }

    /// Number of items pulled from the producer so far.
    pub fn buffered(&self) -> usize {
        self.state.borrow().history.len()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<'a, T: Clone + 'a> FromIterator<T> for Reiterable<'a, T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a, T: Clone + 'a> IntoIterator for &Reiterable<'a, T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for Reiterable<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Reiterable")
            .field("buffered", &state.history)
            .field("exhausted", &state.source.is_none())
            .finish()
    }
}

pub struct Iter<'a, T> {
    state: Rc<RefCell<State<'a, T>>>,
    pos: usize,
}

impl<'a, T: Clone> Iterator for Iter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let mut state = self.state.borrow_mut();
        if let Some(item) = state.history.get(self.pos) {
            self.pos += 1;
            return Some(item.clone());
        }
        match state.source.as_mut()?.next() {
            Some(item) => {
                state.history.push(item.clone());
                self.pos += 1;
                Some(item)
            }
            None => {
                state.source = None;
                None
            }
        }
    }
}
