use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::marker::PhantomData;

use super::handle::{HandleIndex, HandleLike};

/// `HandlePool` manages a collection of `Handle`s with continuous indices. The
/// lowest free index is always recycled first, and each recycle bumps the
/// version so stale handles stay dead.
///
/// A slot is alive while its version is odd.
pub struct HandlePool<H: HandleLike> {
    versions: Vec<HandleIndex>,
    frees: BinaryHeap<Reverse<HandleIndex>>,
    _phantom: PhantomData<H>,
}

impl<H: HandleLike> Default for HandlePool<H> {
    fn default() -> Self {
        HandlePool::new()
    }
}

impl<H: HandleLike> HandlePool<H> {
    /// Constructs a new, empty `HandlePool`.
    pub fn new() -> Self {
        HandlePool {
            versions: Vec::new(),
            frees: BinaryHeap::new(),
            _phantom: PhantomData,
        }
    }

    /// Creates an unused handle.
    pub fn create(&mut self) -> H {
        match self.frees.pop() {
            Some(Reverse(index)) => {
                let version = &mut self.versions[index as usize];
                *version += 1;
                H::new(index, *version)
            }
            None => {
                self.versions.push(1);
                H::new(self.versions.len() as HandleIndex - 1, 1)
            }
        }
    }

    /// Returns true if this handle was created by this pool and has not been
    /// freed yet.
    #[inline]
    pub fn contains(&self, handle: H) -> bool {
        self.versions
            .get(handle.index() as usize)
            .map(|&v| v & 0x1 == 1 && v == handle.version())
            .unwrap_or(false)
    }

    /// Recycles the handle index, and marks its version as dead.
    pub fn free(&mut self, handle: H) -> bool {
        if !self.contains(handle) {
            return false;
        }

        self.versions[handle.index() as usize] += 1;
        self.frees.push(Reverse(handle.index()));
        true
    }

    /// Returns the total number of alive handles.
    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len() - self.frees.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the alive handles, in index order.
    #[inline]
    pub fn iter(&self) -> Iter<H> {
        Iter {
            versions: &self.versions,
            cursor: 0,
            _phantom: PhantomData,
        }
    }
}

/// Immutable `HandlePool` iterator, created by `HandlePool::iter`.
pub struct Iter<'a, H: HandleLike> {
    versions: &'a [HandleIndex],
    cursor: usize,
    _phantom: PhantomData<H>,
}

impl<'a, H: HandleLike> Iterator for Iter<'a, H> {
    type Item = H;

    fn next(&mut self) -> Option<H> {
        while self.cursor < self.versions.len() {
            let index = self.cursor;
            let version = self.versions[index];
            self.cursor += 1;

            if version & 0x1 == 1 {
                return Some(H::new(index as HandleIndex, version));
            }
        }

        None
    }
}

impl<'a, H: HandleLike> IntoIterator for &'a HandlePool<H> {
    type Item = H;
    type IntoIter = Iter<'a, H>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
