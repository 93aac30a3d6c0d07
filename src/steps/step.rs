//! A declared step and the record of its run

use std::rc::Rc;

use crate::common::{Error, Result};
use crate::host::guarded;

use super::memo::Context;
use super::metadata::Metadata;

/// Deferred body of a step, run against the shared context
pub type Action<W> = Rc<dyn Fn(&mut Context<W>) -> Result<()>>;

pub fn action<W: 'static, F>(f: F) -> Action<W>
where
    F: Fn(&mut Context<W>) -> Result<()> + 'static,
{
    Rc::new(f)
}

/// Arguments handed through to the host example
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepArgs {
    pub description: Option<String>,
}

impl StepArgs {
    pub fn described(description: &str) -> Self {
        Self {
            description: Some(description.to_string()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

pub struct Step<W> {
    pub metadata: Metadata,
    pub args: StepArgs,
    action: Action<W>,
}

impl<W: 'static> Step<W> {
    pub fn new(args: StepArgs, metadata: Metadata, action: Action<W>) -> Self {
        Self {
            metadata,
            args,
            action,
        }
    }

    /// Description used for the host example; anonymous steps are numbered from 1
    pub fn description(&self, index: usize) -> String {
        self.args
            .description
            .clone()
            .unwrap_or_else(|| format!("step {}", index + 1))
    }

    /// Run the action, turning a panic into a failure
    pub fn run(&self, context: &mut Context<W>) -> Result<()> {
        guarded(|| (self.action)(context))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Pending,
    Passed,
    Failed,
}

/// Run state attached to a step on its first execution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRun {
    /// The action (or the list prologue in its place) was invoked
    pub executed: bool,
    pub outcome: StepOutcome,
    /// Index of the earlier step whose failure skipped this one
    pub failed_step: Option<usize>,
    pub error: Option<Error>,
}

impl StepRun {
    pub fn finished(result: Result<()>) -> Self {
        let (outcome, error) = match result {
            Ok(()) => (StepOutcome::Passed, None),
            Err(e) if e.is_pending() => (StepOutcome::Pending, Some(e)),
            Err(e) => (StepOutcome::Failed, Some(e)),
        };
        Self {
            executed: true,
            outcome,
            failed_step: None,
            error,
        }
    }

    pub fn skipped(failed_step: usize) -> Self {
        Self {
            executed: false,
            outcome: StepOutcome::Pending,
            failed_step: Some(failed_step),
            error: None,
        }
    }

    /// Not run because the list itself is pending
    pub fn held(reason: Error) -> Self {
        Self {
            executed: false,
            outcome: StepOutcome::Pending,
            failed_step: None,
            error: Some(reason),
        }
    }

    pub fn failed(&self) -> bool {
        self.outcome == StepOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_falls_back_to_position() {
        let step = Step::<()>::new(StepArgs::anonymous(), Metadata::new(), action(|_| Ok(())));
        assert_eq!(step.description(2), "step 3");

        let step = Step::<()>::new(StepArgs::described("sets x"), Metadata::new(), action(|_| Ok(())));
        assert_eq!(step.description(0), "sets x");
    }

    #[test]
    fn test_finished_runs_classify_the_outcome() {
        assert_eq!(StepRun::finished(Ok(())).outcome, StepOutcome::Passed);

        let pending = StepRun::finished(Err(Error::Pending("later".into())));
        assert_eq!(pending.outcome, StepOutcome::Pending);
        assert!(pending.executed);
        assert!(pending.failed_step.is_none());

        let failed = StepRun::finished(Err(Error::Assertion("no".into())));
        assert!(failed.failed());
        assert_eq!(failed.error, Some(Error::Assertion("no".into())));
    }

    #[test]
    fn test_panicking_action_fails() {
        let step = Step::<u8>::new(
            StepArgs::anonymous(),
            Metadata::new(),
            action(|context: &mut Context<u8>| {
                assert_eq!(*context.world(), 1, "world not set");
                Ok(())
            }),
        );
        let mut context = Context::new(0u8);
        assert!(matches!(step.run(&mut context), Err(Error::Panicked(_))));
    }
}
