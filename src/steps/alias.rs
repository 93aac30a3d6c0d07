//! Per-grouping aliases for `let` and `subject` declarations
//!
//! Every nested grouping gets a fresh invocation number from the shared
//! [`AliasCounter`]. A declaration named `foo` made in invocation `3` is
//! stored under `foo_3`, so same-named declarations in sibling steps never
//! share a memo slot while each step still refers to its own as `foo`.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Which declaration verb produced an alias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Let,
    Subject,
}

/// Logical name of the implicit subject
pub const SUBJECT: &str = "subject";

/// Invocation counter shared by every builder of one steps group
#[derive(Debug, Clone, Default)]
pub struct AliasCounter(Rc<Cell<usize>>);

impl AliasCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the next invocation number
    pub fn next(&self) -> usize {
        let n = self.0.get() + 1;
        self.0.set(n);
        n
    }

    pub fn current(&self) -> usize {
        self.0.get()
    }
}

/// Generated storage name for `logical` declared in `invocation`
pub fn unique_name(logical: &str, invocation: usize) -> String {
    format!("{}_{}", logical, invocation)
}

/// Immutable logical-name to storage-name map
///
/// Extending a table yields a new table; the scope it was derived from keeps
/// seeing its own entries only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    lets: Rc<BTreeMap<String, String>>,
    subjects: Rc<BTreeMap<String, String>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this table with `logical` mapped to `unique`
    pub fn with_alias(&self, kind: ValueKind, logical: &str, unique: &str) -> Self {
        let mut next = self.clone();
        let map = match kind {
            ValueKind::Let => &mut next.lets,
            ValueKind::Subject => &mut next.subjects,
        };
        Rc::make_mut(map).insert(logical.to_string(), unique.to_string());
        next
    }

    /// Storage name for `name`, or `name` unchanged when not aliased
    pub fn resolve(&self, kind: ValueKind, name: &str) -> String {
        let map = match kind {
            ValueKind::Let => &self.lets,
            ValueKind::Subject => &self.subjects,
        };
        map.get(name).cloned().unwrap_or_else(|| name.to_string())
    }

    /// Resolve against `let` aliases first, then `subject` aliases
    pub fn resolve_any(&self, name: &str) -> String {
        if let Some(unique) = self.lets.get(name) {
            return unique.clone();
        }
        self.resolve(ValueKind::Subject, name)
    }

    pub fn contains(&self, kind: ValueKind, name: &str) -> bool {
        match kind {
            ValueKind::Let => self.lets.contains_key(name),
            ValueKind::Subject => self.subjects.contains_key(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_is_shared_between_clones() {
        let counter = AliasCounter::new();
        let other = counter.clone();
        assert_eq!(counter.next(), 1);
        assert_eq!(other.next(), 2);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn test_unresolved_names_pass_through() {
        let table = AliasTable::new();
        assert_eq!(table.resolve(ValueKind::Let, "helper"), "helper");
        assert_eq!(table.resolve_any("helper"), "helper");
    }

    #[test]
    fn test_extending_leaves_parent_untouched() {
        let parent = AliasTable::new().with_alias(ValueKind::Let, "outer", "outer_0");
        let child = parent.with_alias(ValueKind::Let, "inner", "inner_1");

        assert_eq!(child.resolve(ValueKind::Let, "outer"), "outer_0");
        assert_eq!(child.resolve(ValueKind::Let, "inner"), "inner_1");
        assert!(!parent.contains(ValueKind::Let, "inner"));
    }

    #[test]
    fn test_sibling_scopes_get_distinct_storage() {
        let counter = AliasCounter::new();
        let root = AliasTable::new();
        let first = root.with_alias(ValueKind::Let, "foo", &unique_name("foo", counter.next()));
        let second = root.with_alias(ValueKind::Let, "foo", &unique_name("foo", counter.next()));

        assert_eq!(first.resolve(ValueKind::Let, "foo"), "foo_1");
        assert_eq!(second.resolve(ValueKind::Let, "foo"), "foo_2");
    }

    #[test]
    fn test_lets_shadow_subjects_of_the_same_name() {
        let table = AliasTable::new()
            .with_alias(ValueKind::Subject, "user", "user_1")
            .with_alias(ValueKind::Let, "user", "user_2");
        assert_eq!(table.resolve_any("user"), "user_2");
        assert_eq!(table.resolve(ValueKind::Subject, "user"), "user_1");
    }
}
