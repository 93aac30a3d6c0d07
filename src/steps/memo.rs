//! Memoized `let`/`subject` values and the shared run context
//!
//! Definitions are registered under their generated storage names while the
//! tree is declared and travel with the declarations that can see them. At
//! run time each value is computed at most once per [`Context`] and cached
//! for the rest of that run.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::common::Result;

use super::proxy::StepContext;

/// A memoized value, type-erased
pub type Value = Rc<dyn Any>;

/// Deferred computation registered for a storage name
pub type ValueFn<W> = Rc<dyn Fn(&mut StepContext<'_, W>) -> Result<Value>>;

fn value_fn<W: 'static, F>(compute: F) -> ValueFn<W>
where
    F: Fn(&mut StepContext<'_, W>) -> Result<Value> + 'static,
{
    Rc::new(compute)
}

/// Memoized-accessor registry keyed by generated storage names
pub struct ValueDefinitions<W> {
    defs: Rc<RefCell<HashMap<String, ValueFn<W>>>>,
}

impl<W> Clone for ValueDefinitions<W> {
    fn clone(&self) -> Self {
        Self {
            defs: Rc::clone(&self.defs),
        }
    }
}

impl<W> Default for ValueDefinitions<W> {
    fn default() -> Self {
        Self {
            defs: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl<W: 'static> ValueDefinitions<W> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `compute` under `unique`, replacing any earlier definition
    pub fn define<T, F>(&self, unique: &str, compute: F)
    where
        T: 'static,
        F: Fn(&mut StepContext<'_, W>) -> Result<T> + 'static,
    {
        let erased = value_fn(move |ctx| Ok(Rc::new(compute(ctx)?) as Value));
        self.defs.borrow_mut().insert(unique.to_string(), erased);
    }

    pub fn get(&self, unique: &str) -> Option<ValueFn<W>> {
        self.defs.borrow().get(unique).cloned()
    }

    pub fn contains(&self, unique: &str) -> bool {
        self.defs.borrow().contains_key(unique)
    }

    pub fn len(&self) -> usize {
        self.defs.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The test-case instance every step of one run shares
///
/// Holds the user's world state plus the memo cache. A fresh context is
/// created for each run of a group.
pub struct Context<W> {
    world: W,
    cache: HashMap<String, Value>,
}

impl<W: 'static> Context<W> {
    pub fn new(world: W) -> Self {
        Self {
            world,
            cache: HashMap::new(),
        }
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn into_world(self) -> W {
        self.world
    }

    /// Whether the value stored under `unique` has been computed yet
    pub fn is_memoized(&self, unique: &str) -> bool {
        self.cache.contains_key(unique)
    }

    pub(crate) fn cached(&self, unique: &str) -> Option<Value> {
        self.cache.get(unique).cloned()
    }

    pub(crate) fn store(&mut self, unique: &str, value: Value) {
        self.cache.insert(unique.to_string(), value);
    }
}

impl<W: Default + 'static> Default for Context<W> {
    fn default() -> Self {
        Self::new(W::default())
    }
}
