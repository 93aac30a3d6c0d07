//! Ordered, stateful steps
//!
//! A steps group is a list of steps that run in declaration order against
//! one shared world. Each step runs at most once per run, and once a step
//! fails every later step is reported pending instead of running.

pub mod alias;
pub mod group;
pub mod hooks;
pub mod list;
pub mod memo;
pub mod metadata;
pub mod proxy;
pub mod runner;
pub mod shared;
pub mod step;

pub use alias::{AliasCounter, AliasTable, ValueKind};
pub use group::{steps, steps_with_registry, StepGroup, StepsBuilder};
pub use hooks::{HookRegistry, HookScope, Next};
pub use list::{StepList, StepReport};
pub use memo::{Context, ValueDefinitions};
pub use metadata::{metadata, Metadata, MetadataStack};
pub use proxy::{Expectation, StepContext};
pub use runner::{StepBuilder, StepPlan};
pub use shared::{SharedExamples, SharedRegistry, SharedSteps};
pub use step::{Step, StepOutcome, StepRun};
