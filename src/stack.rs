//! Fixed-capacity stack used for make/unmake snapshots and repetition history.
//!
//! The capacity is reserved up front and never grows during play; exceeding it is an
//! invariant violation caught by a debug assertion, since game length is bounded.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedStack<T: Copy> {
    items: Vec<T>,
    capacity: usize,
}

impl<T: Copy> BoundedStack<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline(always)]
    pub fn push(&mut self, item: T) {
        debug_assert!(
            self.items.len() < self.capacity,
            "stack overflow: capacity {}",
            self.capacity
        );
        self.items.push(item);
    }

    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    #[inline(always)]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Items from bottom to top.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}
