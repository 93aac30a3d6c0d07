//! Scoped before/after/around hooks
//!
//! `step` hooks are one-shot: they wait in a pending list and are moved into
//! the next declared example, which consumes them. `each` hooks belong to
//! the grouping frame that declared them and are copied into every example
//! declared inside that frame's subtree; leaving the frame drops them.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::common::{Error, Result};
use crate::host::guarded;

use super::proxy::StepContext;

/// Hook body
pub type Hook<W> = Rc<dyn Fn(&mut StepContext<'_, W>) -> Result<()>>;

/// Continuation handed to an around hook
pub type Next<'n, W> = &'n mut dyn FnMut(&mut StepContext<'_, W>) -> Result<()>;

/// Around hook body; it must call the continuation to run what it wraps
pub type AroundHook<W> = Rc<dyn Fn(&mut StepContext<'_, W>, Next<'_, W>) -> Result<()>>;

pub fn hook<W: 'static, F>(f: F) -> Hook<W>
where
    F: Fn(&mut StepContext<'_, W>) -> Result<()> + 'static,
{
    Rc::new(f)
}

pub fn around_hook<W: 'static, F>(f: F) -> AroundHook<W>
where
    F: Fn(&mut StepContext<'_, W>, Next<'_, W>) -> Result<()> + 'static,
{
    Rc::new(f)
}

/// Hook scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookScope {
    /// Once around the next step or example
    Step,
    /// Around every example in the declaring grouping
    Each,
    /// Once around a whole steps list; only meaningful at list level
    All,
}

impl HookScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Each => "each",
            Self::All => "all",
        }
    }
}

impl fmt::Display for HookScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hooks declared in one grouping frame
struct HookFrame<W> {
    before_each: Vec<Hook<W>>,
    after_each: Vec<Hook<W>>,
    around_each: Vec<AroundHook<W>>,
}

impl<W> HookFrame<W> {
    fn new() -> Self {
        Self {
            before_each: Vec::new(),
            after_each: Vec::new(),
            around_each: Vec::new(),
        }
    }
}

/// Declaration-time hook registry for one step
pub struct HookRegistry<W> {
    frames: Vec<HookFrame<W>>,
    pending_before_step: Vec<Hook<W>>,
    pending_after_step: Vec<Hook<W>>,
}

impl<W: 'static> HookRegistry<W> {
    pub fn new() -> Self {
        Self {
            frames: vec![HookFrame::new()],
            pending_before_step: Vec::new(),
            pending_after_step: Vec::new(),
        }
    }

    pub fn add_before(&mut self, scope: HookScope, hook: Hook<W>) -> Result<()> {
        match scope {
            HookScope::Step => self.pending_before_step.push(hook),
            HookScope::Each => self.add_before_each(hook),
            HookScope::All => return Err(Error::invalid_hook_scope("before", scope.as_str())),
        }
        Ok(())
    }

    /// Before hook for every example of the current frame
    pub fn add_before_each(&mut self, hook: Hook<W>) {
        self.frame().before_each.push(hook);
    }

    pub fn add_after(&mut self, scope: HookScope, hook: Hook<W>) -> Result<()> {
        match scope {
            HookScope::Step => self.pending_after_step.push(hook),
            HookScope::Each => self.frame().after_each.push(hook),
            HookScope::All => return Err(Error::invalid_hook_scope("after", scope.as_str())),
        }
        Ok(())
    }

    pub fn add_around(&mut self, scope: HookScope, hook: AroundHook<W>) -> Result<()> {
        if scope != HookScope::Each {
            return Err(Error::InvalidAroundScope(scope.as_str().to_string()));
        }
        self.frame().around_each.push(hook);
        Ok(())
    }

    /// Open a nested grouping frame
    pub fn enter(&mut self) {
        self.frames.push(HookFrame::new());
    }

    /// Close the innermost frame, dropping its `each` hooks
    pub fn leave(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Hooks for the example being declared now
    ///
    /// Consumes the pending `step` hooks and snapshots the `each` hooks of
    /// every open frame, outermost first.
    pub fn take_for_example(&mut self) -> ExampleHooks<W> {
        let mut hooks = ExampleHooks {
            before_step: std::mem::take(&mut self.pending_before_step),
            after_step: std::mem::take(&mut self.pending_after_step),
            ..ExampleHooks::default()
        };
        for frame in &self.frames {
            hooks.before_each.extend(frame.before_each.iter().cloned());
            hooks.after_each.extend(frame.after_each.iter().cloned());
            hooks.around_each.extend(frame.around_each.iter().cloned());
        }
        hooks
    }

    /// Step hooks declared but not yet claimed by an example
    pub fn pending_step_hooks(&self) -> usize {
        self.pending_before_step.len() + self.pending_after_step.len()
    }

    fn frame(&mut self) -> &mut HookFrame<W> {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

impl<W: 'static> Default for HookRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hooks bound to a single declared example
pub struct ExampleHooks<W> {
    before_step: Vec<Hook<W>>,
    before_each: Vec<Hook<W>>,
    around_each: Vec<AroundHook<W>>,
    after_each: Vec<Hook<W>>,
    after_step: Vec<Hook<W>>,
}

impl<W> Default for ExampleHooks<W> {
    fn default() -> Self {
        Self {
            before_step: Vec::new(),
            before_each: Vec::new(),
            around_each: Vec::new(),
            after_each: Vec::new(),
            after_step: Vec::new(),
        }
    }
}

impl<W: 'static> ExampleHooks<W> {
    /// Run before hooks of `scope` in declaration order, stopping at the first failure
    pub fn run_before_hooks(&self, scope: HookScope, ctx: &mut StepContext<'_, W>) -> Result<()> {
        let hooks = match scope {
            HookScope::Step => &self.before_step,
            HookScope::Each => &self.before_each,
            HookScope::All => return Ok(()),
        };
        run_hooks(hooks, ctx)
    }

    /// Run every after hook of `scope` in declaration order
    ///
    /// A failing hook does not stop the remaining ones; the first error is
    /// returned.
    pub fn run_after_hooks(&self, scope: HookScope, ctx: &mut StepContext<'_, W>) -> Result<()> {
        let hooks = match scope {
            HookScope::Step => &self.after_step,
            HookScope::Each => &self.after_each,
            HookScope::All => return Ok(()),
        };
        run_all_hooks(hooks, ctx)
    }

    /// Run `body` wrapped by the around hooks, outermost first
    pub fn run_around_hooks(&self, ctx: &mut StepContext<'_, W>, body: Next<'_, W>) -> Result<()> {
        run_around(&self.around_each, ctx, body)
    }

    pub fn len(&self, scope: HookScope) -> usize {
        match scope {
            HookScope::Step => self.before_step.len() + self.after_step.len(),
            HookScope::Each => self.before_each.len() + self.after_each.len() + self.around_each.len(),
            HookScope::All => 0,
        }
    }
}

/// Run hooks in order, stopping at the first failure
pub fn run_hooks<W: 'static>(hooks: &[Hook<W>], ctx: &mut StepContext<'_, W>) -> Result<()> {
    for hook in hooks {
        guarded(|| hook(&mut *ctx))?;
    }
    Ok(())
}

/// Run every hook in order and return the first failure
pub fn run_all_hooks<W: 'static>(hooks: &[Hook<W>], ctx: &mut StepContext<'_, W>) -> Result<()> {
    let mut first_error = None;
    for hook in hooks {
        if let Err(e) = guarded(|| hook(&mut *ctx)) {
            debug!(error = %e, "after hook failed");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn run_around<W: 'static>(hooks: &[AroundHook<W>], ctx: &mut StepContext<'_, W>, body: Next<'_, W>) -> Result<()> {
    match hooks.split_first() {
        None => body(ctx),
        Some((outer, inner)) => outer(ctx, &mut |ctx| run_around(inner, ctx, &mut *body)),
    }
}
