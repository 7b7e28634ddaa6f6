//! Opaque values exchanged between the engine and its collaborators.
//!
//! The reconciler never inspects component state, context payloads, suspend
//! tokens or ref cells; it only stores, compares and hands them back.
//! Everything here is therefore an opaque, cheaply clonable handle.

use core::any::{Any, type_name};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use std::rc::Rc;

/// Handle to a node in the host platform's native tree.
///
/// Hosts are free to back this with whatever they like (an arena index, a
/// slot in a table of platform objects) as long as the handle stays valid for
/// the lifetime of the node it designates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostId(usize);

impl HostId {
    /// Creates a new [`HostId`] from the raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw index backing this handle.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A reference-counted, type-erased value shared with collaborators.
///
/// Used for context payloads, suspend tokens and error causes. Equality is
/// identity: two handles compare equal only when they point at the same
/// allocation, mirroring the reference-equality contract of the diff.
#[derive(Clone)]
pub struct SharedValue(Rc<dyn Any>);

impl SharedValue {
    /// Wraps a value.
    pub fn new<T: 'static>(value: T) -> Self {
        Self(Rc::new(value))
    }

    /// Attempts to borrow the wrapped value as `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Returns whether both handles point at the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for SharedValue {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for SharedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(type_name::<Self>())
    }
}

/// Handle to a mutable ref cell a host node will be attached to.
///
/// The engine only rotates these (current into previous) so an external
/// concern can sequence detach-before-attach; it never reads through them.
#[derive(Clone)]
pub struct RefTarget(Rc<dyn Any>);

impl RefTarget {
    /// Wraps a ref cell.
    pub fn new<T: 'static>(cell: T) -> Self {
        Self(Rc::new(cell))
    }

    /// Attempts to borrow the wrapped cell as `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl PartialEq for RefTarget {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(type_name::<Self>())
    }
}

/// Identifier of a context provider, allocated once per provider declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a fresh identifier.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A single attribute or property value carried in a description's props.
#[derive(Debug, Clone)]
pub enum PropValue {
    /// A boolean property.
    Bool(bool),
    /// A numeric property.
    Number(f64),
    /// A textual property.
    Text(String),
    /// An opaque payload (event handler, style object), compared by identity.
    Opaque(SharedValue),
}

impl PropValue {
    /// Convenience constructor for text values.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}
