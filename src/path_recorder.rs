//! C2: the backtracking path recorder.
//!
//! A direct port of `original_source/include/Util/PushPopCache.h`'s
//! `PushPopVector`/`PushPopCache`: an append-only vector used as a DFS
//! scratchpad, with a LIFO stack of size checkpoints so a recursive
//! exploration can `push()` on entry and `pop()` on every exit path to
//! restore exactly the state it started with.

/// `PushPopVector<T>`: no uniqueness guarantee, duplicates allowed.
#[derive(Clone, Debug)]
pub struct PathRecorder<T> {
    marks: Vec<usize>,
    items: Vec<T>,
}

impl<T> Default for PathRecorder<T> {
    fn default() -> Self {
        PathRecorder {
            marks: Vec::new(),
            items: Vec::new(),
        }
    }
}

impl<T> PathRecorder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: T) {
        self.items.push(x);
    }

    /// Record the current size as a checkpoint.
    pub fn push(&mut self) {
        self.marks.push(self.items.len());
    }

    /// Truncate to the `n`-th most recent checkpoint, discarding everything
    /// appended since, and pop those `n` marks.
    pub fn pop(&mut self, n: usize) {
        let mut target = self.items.len();
        for _ in 0..n {
            target = self.marks.pop().expect("pop() with no matching push()");
        }
        debug_assert!(target <= self.items.len());
        self.items.truncate(target);
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn top(&self) -> &T {
        self.items.last().expect("top() on an empty path recorder")
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> std::ops::Index<usize> for PathRecorder<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.items[i]
    }
}

/// `PushPopCache<T>`: same contract as [`PathRecorder`], but `add` is a
/// no-op when `x` is already present, and `pop` evicts the uniqueness set
/// entries it removes as well.
#[derive(Clone, Debug)]
pub struct UniquePathRecorder<T: Clone + Eq + std::hash::Hash> {
    inner: PathRecorder<T>,
    seen: std::collections::HashSet<T>,
}

impl<T: Clone + Eq + std::hash::Hash> Default for UniquePathRecorder<T> {
    fn default() -> Self {
        UniquePathRecorder {
            inner: PathRecorder::new(),
            seen: std::collections::HashSet::new(),
        }
    }
}

impl<T: Clone + Eq + std::hash::Hash> UniquePathRecorder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: T) {
        if self.seen.insert(x.clone()) {
            self.inner.add(x);
        }
    }

    pub fn contains(&self, x: &T) -> bool {
        self.seen.contains(x)
    }

    pub fn push(&mut self) {
        self.inner.push();
    }

    pub fn pop(&mut self, n: usize) {
        let before = self.inner.size();
        self.inner.pop(n);
        let after = self.inner.size();
        if after < before {
            for x in &self.inner.items[after..before] {
                self.seen.remove(x);
            }
        }
    }

    pub fn size(&self) -> usize {
        self.inner.size()
    }
}
