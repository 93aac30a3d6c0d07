//! Minimal example-group host
//!
//! The step engine registers its generated examples through
//! [`ExampleRegistry`]; [`ExampleGroup`] is the in-process implementation
//! used to run them. Every example of one group run shares a single context
//! value `C`, created fresh for each run.

mod runner;

pub use runner::{RunReport, Runner};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::common::{Error, Result};
use crate::steps::Metadata;

/// Body of a registered example or after-all hook
pub type ExampleBody<C> = Rc<dyn Fn(&mut C) -> Result<()>>;

/// Wrap a closure as an [`ExampleBody`]
pub fn example_body<C, F>(body: F) -> ExampleBody<C>
where
    F: Fn(&mut C) -> Result<()> + 'static,
{
    Rc::new(body)
}

/// Registration surface the step engine binds to
pub trait ExampleRegistry<C> {
    fn register_example(&mut self, description: &str, metadata: Metadata, body: ExampleBody<C>);

    fn register_nested_group(&mut self, description: &str, build: &mut dyn FnMut(&mut Self));

    /// Hook run once after every example of the group has run
    fn register_after_all(&mut self, hook: ExampleBody<C>);
}

/// Final status of an example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    NotRun,
    Passed,
    Failed,
    Pending,
}

/// Execution result recorded on an example
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub status: Status,
    /// Failure message or pending reason
    pub message: Option<String>,
}

impl ExecutionResult {
    fn from_outcome(outcome: Result<()>) -> Self {
        match outcome {
            Ok(()) => Self {
                status: Status::Passed,
                message: None,
            },
            Err(Error::Pending(reason)) => Self {
                status: Status::Pending,
                message: Some(reason),
            },
            Err(e) => Self {
                status: Status::Failed,
                message: Some(e.to_string()),
            },
        }
    }
}

/// A registered example
pub struct Example<C> {
    pub description: String,
    pub metadata: Metadata,
    pub execution_result: ExecutionResult,
    body: ExampleBody<C>,
}

impl<C> Example<C> {
    pub fn status(&self) -> Status {
        self.execution_result.status
    }
}

/// Ordered examples, nested groups and after-all hooks
pub struct ExampleGroup<C> {
    pub description: String,
    pub metadata: Metadata,
    pub examples: Vec<Example<C>>,
    pub children: Vec<ExampleGroup<C>>,
    after_all: Vec<ExampleBody<C>>,
    new_context: Rc<dyn Fn() -> C>,
}

impl<C: 'static> ExampleGroup<C> {
    /// Create a group whose runs start from `new_context()`
    pub fn new<F>(description: &str, new_context: F) -> Self
    where
        F: Fn() -> C + 'static,
    {
        Self::with_factory(description, Metadata::new(), Rc::new(new_context))
    }

    fn with_factory(description: &str, metadata: Metadata, new_context: Rc<dyn Fn() -> C>) -> Self {
        Self {
            description: description.to_string(),
            metadata,
            examples: Vec::new(),
            children: Vec::new(),
            after_all: Vec::new(),
            new_context,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Number of examples in this group and all nested groups
    pub fn size(&self) -> usize {
        self.examples.len() + self.children.iter().map(ExampleGroup::size).sum::<usize>()
    }

    /// Run this group and then its children, in declaration order
    pub fn run(&mut self) -> RunReport {
        let mut report = RunReport::default();
        let mut context = (self.new_context)();

        for example in &mut self.examples {
            let outcome = guarded(|| (example.body)(&mut context));
            example.execution_result = ExecutionResult::from_outcome(outcome);
            report.record(&example.description, &example.execution_result);
        }

        for hook in &self.after_all {
            if let Err(e) = guarded(|| hook(&mut context)) {
                tracing::warn!(group = %self.description, error = %e, "after-all hook failed");
                report.hook_errors.push(e.to_string());
            }
        }

        for child in &mut self.children {
            report.merge(child.run());
        }

        report
    }
}

impl<C: 'static> ExampleRegistry<C> for ExampleGroup<C> {
    fn register_example(&mut self, description: &str, metadata: Metadata, body: ExampleBody<C>) {
        self.examples.push(Example {
            description: description.to_string(),
            metadata,
            execution_result: ExecutionResult::default(),
            body,
        });
    }

    fn register_nested_group(&mut self, description: &str, build: &mut dyn FnMut(&mut Self)) {
        let mut child = Self::with_factory(
            description,
            self.metadata.clone(),
            Rc::clone(&self.new_context),
        );
        build(&mut child);
        self.children.push(child);
    }

    fn register_after_all(&mut self, hook: ExampleBody<C>) {
        self.after_all.push(hook);
    }
}

/// Run `f`, turning a panic into the failure signal
///
/// Lets plain `assert!`/`assert_eq!` act as assertion failures.
pub fn guarded<F>(f: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_group() -> ExampleGroup<Vec<&'static str>> {
        let mut group = ExampleGroup::new("host", Vec::new);
        group.register_example(
            "records",
            Metadata::new(),
            example_body(|seen: &mut Vec<&'static str>| {
                seen.push("first");
                Ok(())
            }),
        );
        group.register_example(
            "sees shared context",
            Metadata::new(),
            example_body(|seen: &mut Vec<&'static str>| {
                assert_eq!(seen.as_slice(), ["first"]);
                Ok(())
            }),
        );
        group
    }

    #[test]
    fn test_examples_share_one_context_per_run() {
        let mut group = counting_group();
        let report = group.run();
        assert_eq!(report.passed, 2);
        assert!(report.success());
    }

    #[test]
    fn test_statuses_follow_body_outcome() {
        let mut group = ExampleGroup::new("statuses", || ());
        group.register_example("ok", Metadata::new(), example_body(|_: &mut ()| Ok(())));
        group.register_example(
            "pending",
            Metadata::new(),
            example_body(|_: &mut ()| Err(Error::Pending("later".into()))),
        );
        group.register_example(
            "panics",
            Metadata::new(),
            example_body(|_: &mut ()| {
                assert_eq!(1, 2, "numbers differ");
                Ok(())
            }),
        );

        let report = group.run();
        let statuses: Vec<Status> = group.examples.iter().map(Example::status).collect();
        assert_eq!(statuses, [Status::Passed, Status::Pending, Status::Failed]);
        assert_eq!(group.examples[1].execution_result.message.as_deref(), Some("later"));
        assert!(!report.success());
    }

    #[test]
    fn test_nested_groups_and_after_all() {
        let mut group = ExampleGroup::new("outer", || 0u32);
        group.register_nested_group("inner", &mut |child| {
            child.register_example("inner example", Metadata::new(), example_body(|_: &mut u32| Ok(())));
        });
        group.register_after_all(example_body(|_: &mut u32| Err(Error::Assertion("cleanup".into()))));

        let report = group.run();
        assert_eq!(group.size(), 1);
        assert_eq!(report.passed, 1);
        assert_eq!(report.hook_errors.len(), 1);
        assert!(!report.success());
    }

    #[test]
    fn test_guarded_reports_panic_message() {
        let err = guarded(|| panic!("boom")).unwrap_err();
        assert_eq!(err, Error::Panicked("boom".into()));
    }
}
