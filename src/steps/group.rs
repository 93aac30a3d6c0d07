//! Steps groups: the entry point of the DSL
//!
//! [`steps`] declares an ordered list of steps sharing one world value `W`.
//! The result is a [`StepGroup`], which registers one host example per
//! step.

use std::rc::Rc;

use tracing::debug;

use crate::common::{Error, Result};
use crate::host::{ExampleGroup, ExampleRegistry};

use super::alias::{unique_name, AliasCounter, AliasTable, ValueKind, SUBJECT};
use super::hooks::{hook, HookScope};
use super::list::{ListHooks, StepList};
use super::memo::{Context, ValueDefinitions};
use super::metadata::{merge, Metadata};
use super::proxy::StepContext;
use super::runner::StepBuilder;
use super::shared::{SharedExamples, SharedSteps};
use super::step::{action, Step, StepArgs};

/// Invocation number of values declared directly on the group
const GROUP_INVOCATION: usize = 0;

/// Declaration state for a steps list
pub struct StepsBuilder<W> {
    description: String,
    metadata: Metadata,
    counter: AliasCounter,
    aliases: AliasTable,
    definitions: ValueDefinitions<W>,
    hooks: ListHooks<W>,
    steps: Vec<Step<W>>,
    shared_steps: SharedSteps<W>,
    shared_examples: SharedExamples<W>,
}

impl<W: 'static> StepsBuilder<W> {
    pub fn new(description: &str) -> Self {
        Self {
            description: description.to_string(),
            metadata: Metadata::new(),
            counter: AliasCounter::new(),
            aliases: AliasTable::new(),
            definitions: ValueDefinitions::new(),
            hooks: ListHooks::default(),
            steps: Vec::new(),
            shared_steps: SharedSteps::new(),
            shared_examples: SharedExamples::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_shared_steps(mut self, registry: SharedSteps<W>) -> Self {
        self.shared_steps = registry;
        self
    }

    pub fn with_shared_examples(mut self, registry: SharedExamples<W>) -> Self {
        self.shared_examples = registry;
        self
    }

    pub fn it<F>(&mut self, description: &str, body: F)
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        self.it_with(description, Metadata::new(), body);
    }

    /// Anonymous single-closure step
    pub fn example<F>(&mut self, body: F)
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        self.push_closure(StepArgs::anonymous(), Metadata::new(), body);
    }

    pub fn it_with<F>(&mut self, description: &str, metadata: Metadata, body: F)
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        self.push_closure(StepArgs::described(description), metadata, body);
    }

    fn push_closure<F>(&mut self, args: StepArgs, metadata: Metadata, body: F)
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        let metadata = merge(&self.metadata, &metadata);
        let definitions = self.definitions.clone();
        let aliases = self.aliases.clone();
        let stamped = metadata.clone();
        let body = hook(body);
        let step_action = action(move |context: &mut Context<W>| {
            let mut ctx = StepContext::new(context, &definitions, &aliases, &stamped);
            body(&mut ctx)
        });
        self.steps.push(Step::new(args, metadata, step_action));
    }

    pub fn step<F>(&mut self, description: &str, build: F) -> Result<()>
    where
        F: FnOnce(&mut StepBuilder<W>) -> Result<()>,
    {
        self.step_with(description, Metadata::new(), build)
    }

    /// Step whose body is declared with the step-level DSL
    ///
    /// `build` runs now; usage errors surface here rather than at run time.
    pub fn step_with<F>(&mut self, description: &str, metadata: Metadata, build: F) -> Result<()>
    where
        F: FnOnce(&mut StepBuilder<W>) -> Result<()>,
    {
        let metadata = merge(&self.metadata, &metadata);
        let mut builder = StepBuilder::new(
            description,
            self.counter.clone(),
            self.aliases.clone(),
            metadata.clone(),
            self.definitions.clone(),
            self.shared_examples.clone(),
        );
        build(&mut builder)?;
        debug!(step = description, examples = builder.len(), "declared step");

        let plan = builder.finish();
        let step_action = action(move |context: &mut Context<W>| plan.run(context));
        self.steps
            .push(Step::new(StepArgs::described(description), metadata, step_action));
        Ok(())
    }

    /// `Step` runs around every step; `Each` and `All` run once per run
    pub fn before<F>(&mut self, scope: HookScope, body: F)
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        match scope {
            HookScope::Step => self.hooks.before_step.push(hook(body)),
            HookScope::Each | HookScope::All => self.hooks.before_list.push(hook(body)),
        }
    }

    pub fn after<F>(&mut self, scope: HookScope, body: F)
    where
        F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
    {
        match scope {
            HookScope::Step => self.hooks.after_step.push(hook(body)),
            HookScope::Each | HookScope::All => self.hooks.after_list.push(hook(body)),
        }
    }

    /// Value visible to every step declared after this point
    pub fn let_value<T, F>(&mut self, name: &str, compute: F)
    where
        T: 'static,
        F: Fn(&mut StepContext<'_, W>) -> Result<T> + 'static,
    {
        self.declare_value(ValueKind::Let, name, compute);
    }

    /// Like [`let_value`](Self::let_value), computed before the first step
    pub fn let_eager<T, F>(&mut self, name: &str, compute: F)
    where
        T: 'static,
        F: Fn(&mut StepContext<'_, W>) -> Result<T> + 'static,
    {
        let unique = self.declare_value(ValueKind::Let, name, compute);
        self.hooks
            .before_list
            .push(hook(move |ctx| ctx.force(ValueKind::Let, &unique)));
    }

    pub fn subject<T, F>(&mut self, compute: F)
    where
        T: 'static,
        F: Fn(&mut StepContext<'_, W>) -> Result<T> + 'static,
    {
        self.declare_value(ValueKind::Subject, SUBJECT, compute);
    }

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
        let unique = unique_name(name, GROUP_INVOCATION);
        self.definitions.define(&unique, compute);
        self.aliases = self.aliases.with_alias(kind, name, &unique);
        unique
    }

    /// Register a named step sequence for [`perform_steps`](Self::perform_steps)
    pub fn shared_steps<F>(&mut self, name: &str, build: F)
    where
        F: Fn(&mut StepsBuilder<W>) -> Result<()> + 'static,
    {
        self.shared_steps.register(name, Rc::new(build));
    }

    /// Append fresh copies of the steps registered as `name`
    pub fn perform_steps(&mut self, name: &str) -> Result<()> {
        let entry = self
            .shared_steps
            .get(name)
            .ok_or_else(|| Error::UnknownSharedSteps(name.to_string()))?;
        let before = self.steps.len();
        entry(&mut *self)?;
        debug!(shared = name, added = self.steps.len() - before, "performed shared steps");
        Ok(())
    }

    /// Register named examples for `it_behaves_like` inside steps
    pub fn shared_examples<F>(&mut self, name: &str, build: F)
    where
        F: Fn(&mut StepBuilder<W>) -> Result<()> + 'static,
    {
        self.shared_examples.register(name, Rc::new(build));
    }

    /// Nested groupings belong inside a step; always a usage error here
    pub fn describe<F>(&mut self, description: &str, _build: F) -> Result<()>
    where
        F: FnOnce(&mut StepBuilder<W>) -> Result<()>,
    {
        Err(Error::NestedGroup(description.to_string()))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn build(self) -> StepGroup<W> {
        let list = StepList::new(
            self.steps,
            self.hooks,
            self.definitions,
            self.aliases,
            self.metadata,
        );
        StepGroup {
            description: self.description,
            list: Rc::new(list),
        }
    }
}

/// Declare a steps group
pub fn steps<W, F>(description: &str, build: F) -> Result<StepGroup<W>>
where
    W: 'static,
    F: FnOnce(&mut StepsBuilder<W>) -> Result<()>,
{
    let mut builder = StepsBuilder::new(description);
    build(&mut builder)?;
    Ok(builder.build())
}

/// Declare a steps group that resolves `perform_steps` against `registry`
pub fn steps_with_registry<W, F>(description: &str, registry: SharedSteps<W>, build: F) -> Result<StepGroup<W>>
where
    W: 'static,
    F: FnOnce(&mut StepsBuilder<W>) -> Result<()>,
{
    let mut builder = StepsBuilder::new(description).with_shared_steps(registry);
    build(&mut builder)?;
    Ok(builder.build())
}

/// A declared steps group
pub struct StepGroup<W> {
    description: String,
    list: Rc<StepList<W>>,
}

impl<W: 'static> StepGroup<W> {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn list(&self) -> &Rc<StepList<W>> {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Register one example per step, in order, on `registry`
    pub fn define_on<R: ExampleRegistry<Context<W>>>(&self, registry: &mut R) {
        self.list.define_on(registry);
    }
}

impl<W: Default + 'static> StepGroup<W> {
    /// Host group whose runs each start from `W::default()`
    pub fn into_example_group(self) -> ExampleGroup<Context<W>> {
        let mut group = ExampleGroup::new(&self.description, || Context::new(W::default()))
            .with_metadata(self.list.metadata().clone());
        self.define_on(&mut group);
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Status;
    use crate::steps::metadata::metadata;
    use serde_json::json;

    #[derive(Default)]
    struct Counter {
        a: i32,
    }

    #[test]
    fn test_describe_is_rejected_at_group_level() {
        let result = steps::<(), _>("Basic", |g| g.describe("Not allowed", |_| Ok(())));
        assert_eq!(result.err(), Some(Error::NestedGroup("Not allowed".into())));
    }

    #[test]
    fn test_unknown_shared_steps_fail_declaration() {
        let result = steps::<(), _>("Basic", |g| g.perform_steps("missing"));
        assert!(matches!(result, Err(Error::UnknownSharedSteps(_))));
    }

    #[test]
    fn test_injected_registry_is_used() {
        let registry = SharedSteps::<Counter>::new();
        registry.register(
            "add one",
            Rc::new(|g: &mut StepsBuilder<Counter>| {
                g.it("adds one", |ctx| {
                    ctx.world_mut().a += 1;
                    Ok(())
                });
                Ok(())
            }),
        );

        let group = steps_with_registry("Injected", registry, |g| {
            g.perform_steps("add one")?;
            g.perform_steps("add one")
        })
        .unwrap();
        assert_eq!(group.len(), 2);

        let mut host = group.into_example_group();
        let report = host.run();
        assert_eq!(report.passed, 2);
    }

    #[test]
    fn test_step_metadata_inherits_group_metadata() {
        let mut group = StepsBuilder::<()>::new("tagged").with_metadata(metadata(json!({"area": "db"})));
        group.it_with("overrides", metadata(json!({"slow": true})), |ctx| {
            let area = ctx.metadata()["area"].clone();
            ctx.expect(area).to_eq(&json!("db"))
        });
        let mut host = group.build().into_example_group();
        host.run();

        let example = &host.examples[0];
        assert_eq!(example.status(), Status::Passed);
        assert_eq!(example.metadata["slow"], json!(true));
    }
}
