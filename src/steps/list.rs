//! Ordered step list: run-once guard and failure propagation
//!
//! Steps run in declaration order against one shared [`Context`]. The first
//! request for a step runs it (after catching up on any earlier step not yet
//! attempted) and records a [`StepRun`]; later requests read the record.
//! Once a step fails, every later step is recorded as skipped without its
//! action being invoked. A before-list hook that reports pending holds the
//! whole list: every step is recorded pending and none of them runs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::common::{Error, Result};
use crate::host::{example_body, ExampleRegistry};

use super::alias::AliasTable;
use super::hooks::{run_all_hooks, run_hooks, Hook};
use super::memo::{Context, ValueDefinitions};
use super::metadata::Metadata;
use super::proxy::StepContext;
use super::step::{Step, StepOutcome, StepRun};

/// Hooks declared on the list itself rather than inside a step
pub struct ListHooks<W> {
    /// Once per run, before the first step
    pub before_list: Vec<Hook<W>>,
    /// Once per run, after the last step
    pub after_list: Vec<Hook<W>>,
    /// Before every step's action
    pub before_step: Vec<Hook<W>>,
    /// After every step's action, even a failed one
    pub after_step: Vec<Hook<W>>,
}

impl<W> Default for ListHooks<W> {
    fn default() -> Self {
        Self {
            before_list: Vec::new(),
            after_list: Vec::new(),
            before_step: Vec::new(),
            after_step: Vec::new(),
        }
    }
}

pub struct StepList<W> {
    steps: Vec<Step<W>>,
    hooks: ListHooks<W>,
    definitions: ValueDefinitions<W>,
    aliases: AliasTable,
    metadata: Metadata,
    runs: RefCell<Vec<Option<StepRun>>>,
    opened: Cell<bool>,
    held: RefCell<Option<Error>>,
}

impl<W: 'static> StepList<W> {
    pub fn new(
        steps: Vec<Step<W>>,
        hooks: ListHooks<W>,
        definitions: ValueDefinitions<W>,
        aliases: AliasTable,
        metadata: Metadata,
    ) -> Self {
        let runs = RefCell::new(vec![None; steps.len()]);
        Self {
            steps,
            hooks,
            definitions,
            aliases,
            metadata,
            runs,
            opened: Cell::new(false),
            held: RefCell::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step<W>] {
        &self.steps
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Run step `index` unless it already ran
    ///
    /// Earlier steps that were never attempted are run first, so a step
    /// never executes ahead of its predecessors.
    pub fn run_only_once(&self, index: usize, context: &mut Context<W>) {
        if index >= self.steps.len() {
            return;
        }
        for i in 0..=index {
            if self.runs.borrow()[i].is_some() {
                continue;
            }
            let run = self.attempt(i, context);
            self.runs.borrow_mut()[i] = Some(run);
        }
    }

    fn attempt(&self, index: usize, context: &mut Context<W>) -> StepRun {
        let step = &self.steps[index];
        let description = step.description(index);

        if let Some(failed) = self.first_failure_before(index) {
            info!(step = %description, failed_step = failed, "skipping step after failure");
            return StepRun::skipped(failed);
        }

        if !self.opened.replace(true) {
            match self.open(context) {
                Ok(()) => {}
                Err(e) if e.is_pending() => {
                    info!(step = %description, reason = %e, "before hook holds the list");
                    *self.held.borrow_mut() = Some(e);
                }
                Err(e) => {
                    warn!(step = %description, error = %e, "before hook failed");
                    return StepRun::finished(Err(e));
                }
            }
        }

        if let Some(reason) = self.held.borrow().clone() {
            debug!(step = %description, "step held pending");
            return StepRun::held(reason);
        }

        debug!(step = %description, "running step");
        let run = StepRun::finished(self.execute(step, context));
        match (&run.outcome, &run.error) {
            (StepOutcome::Failed, Some(e)) => warn!(step = %description, error = %e, "step failed"),
            (StepOutcome::Pending, Some(e)) => info!(step = %description, reason = %e, "step pending"),
            _ => debug!(step = %description, "step passed"),
        }
        run
    }

    fn first_failure_before(&self, index: usize) -> Option<usize> {
        self.runs.borrow()[..index]
            .iter()
            .enumerate()
            .find_map(|(i, run)| match run {
                Some(run) if run.failed() => Some(i),
                Some(run) => run.failed_step,
                None => None,
            })
    }

    fn open(&self, context: &mut Context<W>) -> Result<()> {
        let mut ctx = StepContext::new(context, &self.definitions, &self.aliases, &self.metadata);
        run_hooks(&self.hooks.before_list, &mut ctx)
    }

    fn execute(&self, step: &Step<W>, context: &mut Context<W>) -> Result<()> {
        let mut ctx = StepContext::new(context, &self.definitions, &self.aliases, &step.metadata);
        let result = match run_hooks(&self.hooks.before_step, &mut ctx) {
            Ok(()) => step.run(ctx.context()),
            Err(e) => Err(e),
        };
        let after = run_all_hooks(&self.hooks.after_step, &mut ctx);
        result.and(after)
    }

    /// Finish a run: run the after-list hooks and clear the recorded runs
    ///
    /// Does nothing when no step was attempted.
    pub fn close(&self, context: &mut Context<W>) -> Result<()> {
        if !self.opened.get() {
            return Ok(());
        }
        let mut ctx = StepContext::new(context, &self.definitions, &self.aliases, &self.metadata);
        let result = run_all_hooks(&self.hooks.after_list, &mut ctx);
        self.reset();
        result
    }

    pub fn reset(&self) {
        self.opened.set(false);
        self.held.borrow_mut().take();
        for run in self.runs.borrow_mut().iter_mut() {
            *run = None;
        }
    }

    /// Recorded result for step `index`
    pub fn result_for(&self, index: usize) -> StepReport {
        let runs = self.runs.borrow();
        let run = runs.get(index).cloned().flatten();
        let failed_description = run
            .as_ref()
            .and_then(|run| run.failed_step)
            .and_then(|failed| self.steps.get(failed).map(|step| step.description(failed)));
        StepReport {
            description: self
                .steps
                .get(index)
                .map(|step| step.description(index))
                .unwrap_or_default(),
            run,
            failed_description,
        }
    }

    /// Register one host example per step plus an after-all hook closing the list
    pub fn define_on<R: ExampleRegistry<Context<W>>>(self: &Rc<Self>, registry: &mut R) {
        for (index, step) in self.steps.iter().enumerate() {
            let list = Rc::clone(self);
            registry.register_example(
                &step.description(index),
                step.metadata.clone(),
                example_body(move |context: &mut Context<W>| {
                    list.run_only_once(index, context);
                    list.result_for(index).into_example_result()
                }),
            );
        }
        let list = Rc::clone(self);
        registry.register_after_all(example_body(move |context: &mut Context<W>| list.close(context)));
    }
}

/// What one step's host example reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub description: String,
    pub run: Option<StepRun>,
    failed_description: Option<String>,
}

impl StepReport {
    /// An earlier step in the same list failed
    pub fn is_after_failed_step(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.failed_step.is_some())
    }

    pub fn executed_successfully(&self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.executed && run.outcome == StepOutcome::Passed)
    }

    /// Host outcome: pending after a failed step, otherwise success or a step failure
    pub fn into_example_result(self) -> Result<()> {
        if self.is_after_failed_step() {
            let failed = self.failed_description.unwrap_or_default();
            return Err(Error::Pending(format!("Previous step '{}' failed", failed)));
        }
        match self.run {
            None => Err(Error::step_failed(&self.description, "step was never run")),
            Some(run) => match (run.outcome, run.error) {
                (StepOutcome::Passed, _) => Ok(()),
                (StepOutcome::Pending, Some(e)) => Err(e),
                (StepOutcome::Pending, None) => Err(Error::Pending(self.description)),
                (StepOutcome::Failed, e) => {
                    let reason = e.map(|e| e.to_string()).unwrap_or_default();
                    Err(Error::step_failed(&self.description, &reason))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::hooks::hook;
    use crate::steps::step::{action, StepArgs};
    use std::cell::Cell;

    fn counting_step(name: &str, calls: &Rc<Cell<u32>>, fails: bool) -> Step<()> {
        let calls = Rc::clone(calls);
        Step::new(
            StepArgs::described(name),
            Metadata::new(),
            action(move |_| {
                calls.set(calls.get() + 1);
                if fails {
                    Err(Error::Assertion(format!("{} failed", calls.get())))
                } else {
                    Ok(())
                }
            }),
        )
    }

    fn list(steps: Vec<Step<()>>, hooks: ListHooks<()>) -> Rc<StepList<()>> {
        Rc::new(StepList::new(
            steps,
            hooks,
            ValueDefinitions::new(),
            AliasTable::new(),
            Metadata::new(),
        ))
    }

    #[test]
    fn test_action_runs_at_most_once() {
        let calls = Rc::new(Cell::new(0));
        let list = list(vec![counting_step("only", &calls, false)], ListHooks::default());
        let mut context = Context::new(());

        list.run_only_once(0, &mut context);
        list.run_only_once(0, &mut context);

        assert_eq!(calls.get(), 1);
        assert!(list.result_for(0).executed_successfully());
    }

    #[test]
    fn test_failure_skips_every_later_step() {
        let first = Rc::new(Cell::new(0));
        let later = Rc::new(Cell::new(0));
        let list = list(
            vec![
                counting_step("fails", &first, true),
                counting_step("second", &later, false),
                counting_step("third", &later, false),
            ],
            ListHooks::default(),
        );
        let mut context = Context::new(());
        for index in 0..3 {
            list.run_only_once(index, &mut context);
        }

        assert_eq!(later.get(), 0);
        assert!(matches!(
            list.result_for(0).into_example_result(),
            Err(Error::StepFailed { .. })
        ));
        let third = list.result_for(2);
        assert!(third.is_after_failed_step());
        assert_eq!(third.run.as_ref().and_then(|run| run.failed_step), Some(0));
        assert_eq!(
            third.into_example_result(),
            Err(Error::Pending("Previous step 'fails' failed".into()))
        );
    }

    #[test]
    fn test_later_step_catches_up_on_earlier_ones() {
        let calls = Rc::new(Cell::new(0));
        let list = list(
            vec![counting_step("a", &calls, false), counting_step("b", &calls, false)],
            ListHooks::default(),
        );
        let mut context = Context::new(());

        list.run_only_once(1, &mut context);
        assert_eq!(calls.get(), 2);
        assert!(list.result_for(0).executed_successfully());
    }

    #[test]
    fn test_failing_before_list_hook_fails_first_step() {
        let calls = Rc::new(Cell::new(0));
        let hooks = ListHooks {
            before_list: vec![hook::<(), _>(|_| Err(Error::Assertion("Testing Error".into())))],
            ..ListHooks::default()
        };
        let list = list(
            vec![counting_step("a", &calls, false), counting_step("b", &calls, false)],
            hooks,
        );
        let mut context = Context::new(());
        list.run_only_once(1, &mut context);

        assert_eq!(calls.get(), 0);
        assert_eq!(list.result_for(0).run.map(|run| run.outcome), Some(StepOutcome::Failed));
        assert!(list.result_for(1).is_after_failed_step());
    }

    #[test]
    fn test_pending_before_list_hook_holds_every_step() {
        let calls = Rc::new(Cell::new(0));
        let hooks = ListHooks {
            before_list: vec![hook::<(), _>(|_| Err(Error::Pending("not ready".into())))],
            ..ListHooks::default()
        };
        let list = list(
            vec![counting_step("a", &calls, false), counting_step("b", &calls, false)],
            hooks,
        );
        let mut context = Context::new(());
        list.run_only_once(0, &mut context);
        list.run_only_once(1, &mut context);

        assert_eq!(calls.get(), 0);
        for index in 0..2 {
            let report = list.result_for(index);
            assert!(!report.is_after_failed_step());
            assert!(report.run.as_ref().is_some_and(|run| !run.executed));
            assert_eq!(report.into_example_result(), Err(Error::Pending("not ready".into())));
        }

        list.close(&mut context).unwrap();
        assert!(list.result_for(0).run.is_none());
    }

    #[test]
    fn test_pending_step_does_not_propagate() {
        let calls = Rc::new(Cell::new(0));
        let pending = Step::new(
            StepArgs::described("later"),
            Metadata::new(),
            action(|_| Err(Error::Pending("not yet".into()))),
        );
        let list = list(vec![pending, counting_step("next", &calls, false)], ListHooks::default());
        let mut context = Context::new(());
        list.run_only_once(1, &mut context);

        assert_eq!(
            list.result_for(0).into_example_result(),
            Err(Error::Pending("not yet".into()))
        );
        assert!(list.result_for(1).executed_successfully());
    }

    #[test]
    fn test_close_runs_after_hooks_and_resets() {
        let calls = Rc::new(Cell::new(0));
        let closed = Rc::new(Cell::new(0));
        let seen = Rc::clone(&closed);
        let hooks = ListHooks {
            after_list: vec![hook::<(), _>(move |_| {
                seen.set(seen.get() + 1);
                Ok(())
            })],
            ..ListHooks::default()
        };
        let list = list(vec![counting_step("a", &calls, false)], hooks);
        let mut context = Context::new(());

        list.close(&mut context).unwrap();
        assert_eq!(closed.get(), 0);

        list.run_only_once(0, &mut context);
        list.close(&mut context).unwrap();
        assert_eq!(closed.get(), 1);
        assert!(list.result_for(0).run.is_none());
    }
}
