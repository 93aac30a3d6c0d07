//! Step-level declaration DSL
//!
//! A [`StepBuilder`] is driven once, while the steps list is declared. It
//! registers hooks, opens nested groupings and declares aliased values, and
//! turns every `it` into a [`PlannedExample`]. The resulting [`StepPlan`] is
//! the step's action: at run time its examples run in order against the
//! shared context, each wrapped in the hooks captured at declaration.

use tracing::debug;

use crate::common::{Error, Result};
use crate::host::guarded;

use super::alias::{unique_name, AliasCounter, AliasTable, ValueKind, SUBJECT};
use super::hooks::{around_hook, hook, ExampleHooks, Hook, HookRegistry, HookScope, Next};
use super::memo::{Context, ValueDefinitions};
use super::metadata::{merge, Metadata, MetadataStack};
use super::proxy::StepContext;
use super::shared::SharedExamples;

/// Declaration state for one step
pub struct StepBuilder<W> {
    counter: AliasCounter,
    invocation: usize,
    aliases: AliasTable,
    metadata: MetadataStack,
    hooks: HookRegistry<W>,
    definitions: ValueDefinitions<W>,
    shared_examples: SharedExamples<W>,
    path: Vec<String>,
    examples: Vec<PlannedExample<W>>,
}

impl<W: 'static> StepBuilder<W> {
    /// Builder for a step declared with `aliases` already in scope
    ///
    /// Takes its own invocation number from `counter`, so values declared
    /// here never share storage with a sibling step.
    pub fn new(
        description: &str,
        counter: AliasCounter,
        aliases: AliasTable,
        metadata: Metadata,
        definitions: ValueDefinitions<W>,
        shared_examples: SharedExamples<W>,
    ) -> Self {
        let invocation = counter.next();
        Self {
            counter,
            invocation,
            aliases,
            metadata: MetadataStack::new(metadata),
            hooks: HookRegistry::new(),
            definitions,
            shared_examples,
            path: vec![description.to_string()],
            examples: Vec::new(),
        }
    }

    pub fn before<F>(&mut self, scope: HookScope, body: F) -> Result<()>
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        self.hooks.add_before(scope, hook(body))
    }

    pub fn after<F>(&mut self, scope: HookScope, body: F) -> Result<()>
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        self.hooks.add_after(scope, hook(body))
    }

    /// Wrap every later example of this grouping; only `Each` is accepted
    pub fn around<F>(&mut self, scope: HookScope, body: F) -> Result<()>
    where
        F: Fn(&mut StepContext<'_, W>, Next<'_, W>) -> Result<()> + 'static,
    {
        self.hooks.add_around(scope, around_hook(body))
    }

    pub fn describe<F>(&mut self, description: &str, build: F) -> Result<()>
    where
        F: FnOnce(&mut StepBuilder<W>) -> Result<()>,
    {
        self.describe_with(description, Metadata::new(), build)
    }

    /// Declare a nested grouping
    ///
    /// The grouping gets a fresh invocation number and sees the parent's
    /// metadata, hooks and values. Everything it declares is dropped again
    /// on return, whether or not `build` succeeded.
    pub fn describe_with<F>(&mut self, description: &str, metadata: Metadata, build: F) -> Result<()>
    where
        F: FnOnce(&mut StepBuilder<W>) -> Result<()>,
    {
        let invocation = std::mem::replace(&mut self.invocation, self.counter.next());
        let aliases = self.aliases.clone();
        self.metadata.push(&metadata);
        self.hooks.enter();
        self.path.push(description.to_string());

        let result = build(self);

        self.path.pop();
        self.hooks.leave();
        self.metadata.pop();
        self.aliases = aliases;
        self.invocation = invocation;
        result
    }

    pub fn it<F>(&mut self, description: &str, body: F)
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        self.it_with(description, Metadata::new(), body);
    }

    /// Example without a description of its own
    pub fn example<F>(&mut self, body: F)
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        self.declare(None, Metadata::new(), hook(body));
    }

    pub fn it_with<F>(&mut self, description: &str, metadata: Metadata, body: F)
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        self.declare(Some(description), metadata, hook(body));
    }

    fn declare(&mut self, description: Option<&str>, metadata: Metadata, body: Hook<W>) {
        let mut path = self.path.clone();
        path.extend(description.map(str::to_string));
        self.examples.push(PlannedExample {
            description: path.join(" "),
            metadata: merge(self.metadata.current(), &metadata),
            aliases: self.aliases.clone(),
            hooks: self.hooks.take_for_example(),
            body,
        });
    }

    /// Lazily computed value, memoized for the rest of the run
    pub fn let_value<T, F>(&mut self, name: &str, compute: F)
    where
        T: 'static,
        F: Fn(&mut StepContext<'_, W>) -> Result<T> + 'static,
    {
        self.declare_value(ValueKind::Let, name, compute);
    }

    /// Like [`let_value`](Self::let_value), computed before every later example
    pub fn let_eager<T, F>(&mut self, name: &str, compute: F)
    where
        T: 'static,
        F: Fn(&mut StepContext<'_, W>) -> Result<T> + 'static,
    {
        let unique = self.declare_value(ValueKind::Let, name, compute);
        self.hooks
            .add_before_each(hook(move |ctx| ctx.force(ValueKind::Let, &unique)));
    }

    pub fn subject<T, F>(&mut self, compute: F)
    where
        T: 'static,
        F: Fn(&mut StepContext<'_, W>) -> Result<T> + 'static,
    {
        self.declare_value(ValueKind::Subject, SUBJECT, compute);
    }

    /// Named subject, reachable both by `name` and as the implicit subject
    pub fn subject_named<T, F>(&mut self, name: &str, compute: F)
    where
        T: 'static,
        F: Fn(&mut StepContext<'_, W>) -> Result<T> + 'static,
    {
        let unique = self.declare_value(ValueKind::Subject, name, compute);
        self.aliases = self.aliases.with_alias(ValueKind::Subject, SUBJECT, &unique);
    }

    fn declare_value<T, F>(&mut self, kind: ValueKind, name: &str, compute: F) -> String
    where
        T: 'static,
        F: Fn(&mut StepContext<'_, W>) -> Result<T> + 'static,
    {
        let unique = unique_name(name, self.invocation);
        self.definitions.define(&unique, compute);
        self.aliases = self.aliases.with_alias(kind, name, &unique);
        debug!(logical = name, unique = %unique, "declared value");
        unique
    }

    /// Replay the shared examples registered as `name` in a nested grouping
    pub fn it_behaves_like(&mut self, name: &str) -> Result<()> {
        let entry = self
            .shared_examples
            .get(name)
            .ok_or_else(|| Error::UnknownSharedExamples(name.to_string()))?;
        self.describe(name, |builder| entry(builder))
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn finish(self) -> StepPlan<W> {
        let unclaimed = self.hooks.pending_step_hooks();
        if unclaimed > 0 {
            debug!(unclaimed, "step hooks declared after the last example never run");
        }
        StepPlan {
            examples: self.examples,
            definitions: self.definitions,
        }
    }
}

/// An example as declared inside a step
pub struct PlannedExample<W> {
    pub description: String,
    pub metadata: Metadata,
    aliases: AliasTable,
    hooks: ExampleHooks<W>,
    body: Hook<W>,
}

impl<W: 'static> PlannedExample<W> {
    /// Run with its hooks: before step, before each, around(body), after each, after step
    ///
    /// After hooks run even when an earlier phase failed; the first error wins.
    pub fn run(&self, context: &mut Context<W>, definitions: &ValueDefinitions<W>) -> Result<()> {
        let mut ctx = StepContext::new(context, definitions, &self.aliases, &self.metadata);
        debug!(example = %self.description, "running example");

        let mut result = self.hooks.run_before_hooks(HookScope::Step, &mut ctx);
        if result.is_ok() {
            result = self.hooks.run_before_hooks(HookScope::Each, &mut ctx);
        }
        if result.is_ok() {
            let body = &self.body;
            result = guarded(|| self.hooks.run_around_hooks(&mut ctx, &mut |ctx| body(ctx)));
        }
        let after_each = self.hooks.run_after_hooks(HookScope::Each, &mut ctx);
        let after_step = self.hooks.run_after_hooks(HookScope::Step, &mut ctx);
        result.and(after_each).and(after_step)
    }
}

/// Examples declared by one step, in order
pub struct StepPlan<W> {
    examples: Vec<PlannedExample<W>>,
    definitions: ValueDefinitions<W>,
}

impl<W: 'static> StepPlan<W> {
    pub fn examples(&self) -> &[PlannedExample<W>] {
        &self.examples
    }

    /// Run every example in order, stopping at the first failure
    pub fn run(&self, context: &mut Context<W>) -> Result<()> {
        for example in &self.examples {
            example.run(context, &self.definitions)?;
        }
        Ok(())
    }
}
