//! Interned labels for graph elements.
//!
//! Node labels are compared and hashed constantly while diagnostics are
//! produced, so they are stored as symbols in a process-wide string interner.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner shared by every [`Id`].
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn interner() -> MutexGuard<'static, DefaultStringInterner> {
    INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Label of a node in a layered or tree graph.
///
/// Labels are purely descriptive: graphs address their nodes through arena
/// handles, so two nodes may carry the same label.
///
/// # Examples
///
/// ```
/// use strata_core::identifier::Id;
///
/// let a = Id::new("router");
/// let b: Id = "router".into();
/// assert_eq!(a, b);
/// assert_eq!(a, "router");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` for the given label, interning it on first use.
    pub fn new(name: &str) -> Self {
        Self(interner().get_or_intern(name))
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interner = interner();
        let label = interner.resolve(self.0).unwrap_or("<unknown>");
        f.write_str(label)
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        interner().resolve(self.0) == Some(other)
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}
