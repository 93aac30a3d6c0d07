//! Named, reusable step sequences and example sets
//!
//! Registries are plain values handed to the builders that use them, so
//! separate suites never see each other's entries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::common::Result;

use super::group::StepsBuilder;
use super::runner::StepBuilder;

/// Replays a step sequence onto a steps list
pub type SharedStepsFn<W> = Rc<dyn Fn(&mut StepsBuilder<W>) -> Result<()>>;

/// Replays examples into a step's nested grouping
pub type SharedExamplesFn<W> = Rc<dyn Fn(&mut StepBuilder<W>) -> Result<()>>;

pub type SharedSteps<W> = SharedRegistry<SharedStepsFn<W>>;
pub type SharedExamples<W> = SharedRegistry<SharedExamplesFn<W>>;

/// Name to entry map shared between clones
pub struct SharedRegistry<B> {
    entries: Rc<RefCell<HashMap<String, B>>>,
}

impl<B> Clone for SharedRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<B> Default for SharedRegistry<B> {
    fn default() -> Self {
        Self {
            entries: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl<B: Clone> SharedRegistry<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` under `name`; a later registration replaces an earlier one
    pub fn register(&self, name: &str, entry: B) {
        self.entries.borrow_mut().insert(name.to_string(), entry);
    }

    pub fn get(&self, name: &str) -> Option<B> {
        self.entries.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_visible_through_clones() {
        let registry: SharedRegistry<u32> = SharedRegistry::new();
        let clone = registry.clone();
        registry.register("b", 2);
        registry.register("a", 1);

        assert_eq!(clone.get("a"), Some(1));
        assert!(!clone.contains("c"));
        assert_eq!(clone.names(), ["a", "b"]);
    }

    #[test]
    fn test_separate_registries_are_isolated() {
        let first: SharedRegistry<u32> = SharedRegistry::new();
        let second: SharedRegistry<u32> = SharedRegistry::new();
        first.register("add one", 1);
        assert!(second.get("add one").is_none());
    }
}
