//! Stepwise - ordered, stateful test steps
//!
//! Steps run sequentially, share state, run at most once, and stop the rest
//! of their list when one fails: later steps are reported pending rather
//! than failed.
//!
//! ```no_run
//! use stepwise::{steps, Runner};
//!
//! #[derive(Default)]
//! struct World {
//!     a: i32,
//! }
//!
//! let group = steps::<World, _>("Test Steps", |g| {
//!     g.it("sets a", |ctx| {
//!         ctx.world_mut().a = 1;
//!         Ok(())
//!     });
//!     g.it("reads a", |ctx| {
//!         let a = ctx.world().a;
//!         ctx.expect(a).to_eq(&1)
//!     });
//!     Ok(())
//! })?;
//!
//! let mut host = group.into_example_group();
//! let report = Runner::default().run(&mut host);
//! assert!(report.success());
//! # Ok::<(), stepwise::Error>(())
//! ```

pub mod common;
pub mod host;
pub mod steps;

pub use common::config::Config;
pub use common::{Error, Result};
pub use host::{ExampleGroup, ExampleRegistry, RunReport, Runner, Status};
pub use steps::{metadata, steps, steps_with_registry, HookScope, Metadata, StepContext, StepGroup};
