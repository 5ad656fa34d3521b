//! Arena storage addressed by typed handles.
//!
//! Nodes and edges of the layered and tree graphs reference each other in
//! cycles (a node lists its edges, an edge names its nodes). Instead of shared
//! ownership, every element lives in an [`Arena`] and is addressed by a small
//! copyable handle. A handle type is bound to one kind of element, so a
//! [`NodeId`](super::NodeId) can never index the edge arena.

use std::{
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// A typed index into an [`Arena`].
pub trait Handle: Copy + fmt::Debug {
    /// Wraps a raw index.
    fn from_index(index: usize) -> Self;

    /// Returns the raw index.
    fn index(self) -> usize;
}

/// Declares a handle newtype over `usize`.
macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $crate::structure::arena::Handle for $name {
            fn from_index(index: usize) -> Self {
                Self(index)
            }

            fn index(self) -> usize {
                self.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }
    };
}

pub(crate) use handle;

/// Append-only storage; elements are never removed, so handles stay valid for
/// the lifetime of the owning graph.
#[derive(Debug, Clone)]
pub(crate) struct Arena<H, T> {
    items: Vec<T>,
    _handle: PhantomData<fn(H) -> H>,
}

impl<H: Handle, T> Arena<H, T> {
    /// Creates a new empty arena.
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            _handle: PhantomData,
        }
    }

    /// Stores an element and returns its handle.
    pub(crate) fn push(&mut self, item: T) -> H {
        self.items.push(item);
        H::from_index(self.items.len() - 1)
    }

    /// Returns the element for the given handle, if it exists.
    pub(crate) fn get(&self, handle: H) -> Option<&T> {
        self.items.get(handle.index())
    }

    /// Returns the number of stored elements.
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the handle addresses an element of this arena.
    pub(crate) fn contains(&self, handle: H) -> bool {
        handle.index() < self.items.len()
    }

    /// Returns an iterator over `(handle, element)` pairs in insertion order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (H::from_index(index), item))
    }

    /// Returns a mutable iterator over all elements in insertion order.
    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

impl<H: Handle, T> Default for Arena<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle, T> Index<H> for Arena<H, T> {
    type Output = T;

    /// # Panics
    /// Panics if the handle was issued by another arena.
    fn index(&self, handle: H) -> &T {
        &self.items[handle.index()]
    }
}

impl<H: Handle, T> IndexMut<H> for Arena<H, T> {
    fn index_mut(&mut self, handle: H) -> &mut T {
        &mut self.items[handle.index()]
    }
}
