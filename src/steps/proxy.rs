//! The object step bodies and hooks receive
//!
//! [`StepContext`] exposes a fixed capability set: the shared world, aliased
//! `let`/`subject` resolution, the current example's metadata, and a few
//! assertion helpers. A name that resolves to no declaration is reported as
//! [`Error::UnknownMember`] instead of being forwarded blindly.

use std::borrow::Borrow;
use std::fmt::Debug;
use std::rc::Rc;

use crate::common::{Error, Result};

use super::alias::{AliasTable, ValueKind, SUBJECT};
use super::memo::{Context, Value, ValueDefinitions};
use super::metadata::Metadata;

/// Execution proxy handed to step bodies, hooks and value definitions
pub struct StepContext<'a, W> {
    context: &'a mut Context<W>,
    definitions: &'a ValueDefinitions<W>,
    aliases: &'a AliasTable,
    metadata: &'a Metadata,
}

impl<'a, W: 'static> StepContext<'a, W> {
    pub fn new(
        context: &'a mut Context<W>,
        definitions: &'a ValueDefinitions<W>,
        aliases: &'a AliasTable,
        metadata: &'a Metadata,
    ) -> Self {
        Self {
            context,
            definitions,
            aliases,
            metadata,
        }
    }

    /// Shared state of the running steps group
    pub fn world(&self) -> &W {
        self.context.world()
    }

    pub fn world_mut(&mut self) -> &mut W {
        self.context.world_mut()
    }

    /// The underlying test-case instance
    pub fn context(&mut self) -> &mut Context<W> {
        self.context
    }

    /// Metadata stamped on the example being run
    pub fn metadata(&self) -> &Metadata {
        self.metadata
    }

    pub fn definitions(&self) -> &ValueDefinitions<W> {
        self.definitions
    }

    pub fn aliases(&self) -> &AliasTable {
        self.aliases
    }

    /// Storage name for a logical `let`/`subject` name
    pub fn resolve(&self, kind: ValueKind, name: &str) -> String {
        self.aliases.resolve(kind, name)
    }

    /// Value of the `let` (or named subject) visible here as `name`
    pub fn get<T: 'static>(&mut self, name: &str) -> Result<Rc<T>> {
        let unique = self.aliases.resolve_any(name);
        let value = self.memoized(&unique, name)?;
        value.downcast::<T>().map_err(|_| Error::value_type::<T>(name))
    }

    /// Value of the implicit subject
    pub fn subject<T: 'static>(&mut self) -> Result<Rc<T>> {
        self.subject_named(SUBJECT)
    }

    pub fn subject_named<T: 'static>(&mut self, name: &str) -> Result<Rc<T>> {
        let unique = self.aliases.resolve(ValueKind::Subject, name);
        let value = self.memoized(&unique, name)?;
        value.downcast::<T>().map_err(|_| Error::value_type::<T>(name))
    }

    /// Compute `name` now if it has not been computed yet
    pub fn force(&mut self, kind: ValueKind, name: &str) -> Result<()> {
        let unique = self.aliases.resolve(kind, name);
        self.memoized(&unique, name).map(|_| ())
    }

    fn memoized(&mut self, unique: &str, logical: &str) -> Result<Value> {
        if let Some(value) = self.context.cached(unique) {
            return Ok(value);
        }
        let compute = self
            .definitions
            .get(unique)
            .ok_or_else(|| Error::unknown_member(logical))?;
        let value = compute(&mut *self)?;
        self.context.store(unique, Rc::clone(&value));
        Ok(value)
    }

    pub fn expect<T: Debug>(&self, actual: T) -> Expectation<T> {
        Expectation::new(actual)
    }

    /// Expectation on the implicit subject
    pub fn is_expected<T: Debug + 'static>(&mut self) -> Result<Expectation<Rc<T>>> {
        Ok(Expectation::new(self.subject::<T>()?))
    }

    pub fn should_eq<T: PartialEq + Debug + 'static>(&mut self, expected: T) -> Result<()> {
        self.is_expected::<T>()?.to_eq(&expected)
    }

    pub fn should_not_eq<T: PartialEq + Debug + 'static>(&mut self, expected: T) -> Result<()> {
        self.is_expected::<T>()?.not_to_eq(&expected)
    }

    /// Failure signal with a message
    pub fn fail(&self, message: &str) -> Error {
        Error::Assertion(message.to_string())
    }

    /// Pending signal with a reason
    pub fn pending(&self, reason: &str) -> Error {
        Error::Pending(reason.to_string())
    }
}

/// Assertion on a single value
#[derive(Debug)]
pub struct Expectation<T> {
    actual: T,
}

impl<T: Debug> Expectation<T> {
    pub fn new(actual: T) -> Self {
        Self { actual }
    }

    pub fn to_eq<U>(&self, expected: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: PartialEq + Debug + ?Sized,
    {
        if Borrow::<U>::borrow(&self.actual) == expected {
            Ok(())
        } else {
            Err(Error::Assertion(format!(
                "expected {:?}, got {:?}",
                expected, self.actual
            )))
        }
    }

    pub fn not_to_eq<U>(&self, expected: &U) -> Result<()>
    where
        T: Borrow<U>,
        U: PartialEq + Debug + ?Sized,
    {
        if Borrow::<U>::borrow(&self.actual) != expected {
            Ok(())
        } else {
            Err(Error::Assertion(format!(
                "expected {:?} not to equal {:?}",
                self.actual, expected
            )))
        }
    }

    pub fn to_satisfy<F>(&self, description: &str, predicate: F) -> Result<()>
    where
        F: FnOnce(&T) -> bool,
    {
        if predicate(&self.actual) {
            Ok(())
        } else {
            Err(Error::Assertion(format!(
                "expected {:?} to {}",
                self.actual, description
            )))
        }
    }
}
