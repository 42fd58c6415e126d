//! The line hook: the interpreter's interception seam.
//!
//! An [`Interpreter`](crate::Interpreter) borrows one `&mut dyn LineHook` for
//! the duration of a run and calls it immediately before each source line
//! executes, in whichever frame is running. There is no global hook slot:
//! two interpreters never share a hook.

use crate::interp::{Frame, FrameKind};
use crate::value::{Name, Value};

pub trait LineHook {
    fn on_line(&mut self, ctx: &LineContext<'_>);
}

/// A hook that observes nothing.
pub struct NoopHook;

impl LineHook for NoopHook {
    fn on_line(&mut self, _ctx: &LineContext<'_>) {}
}

impl<F: FnMut(&LineContext<'_>)> LineHook for F {
    fn on_line(&mut self, ctx: &LineContext<'_>) {
        self(ctx)
    }
}

/// The live execution context at one line event.
pub struct LineContext<'a> {
    pub(crate) source_id: &'a str,
    /// Outermost (`<module>`) first.
    pub(crate) frames: &'a [Frame],
}

impl<'a> LineContext<'a> {
    /// Identifies the program being run, e.g. `<string>`.
    pub fn source_id(&self) -> &'a str {
        self.source_id
    }

    /// The line about to execute in the innermost frame.
    pub fn line(&self) -> u32 {
        self.frames.last().map(|f| f.line).unwrap_or(0)
    }

    /// Number of active frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn innermost(&self) -> Option<FrameView<'a>> {
        self.frames.last().map(|frame| FrameView { frame })
    }

    /// Active frames, outermost first. Use `.rev()` to walk from the
    /// innermost frame out through its callers.
    pub fn frames(&self) -> impl DoubleEndedIterator<Item = FrameView<'a>> + ExactSizeIterator + 'a {
        self.frames.iter().map(|frame| FrameView { frame })
    }
}

/// A read-only view of one active frame.
#[derive(Clone, Copy)]
pub struct FrameView<'a> {
    frame: &'a Frame,
}

impl<'a> FrameView<'a> {
    /// `<module>`, a function name, `<lambda>`, or a class name while its
    /// body runs.
    pub fn function(&self) -> &'a str {
        &self.frame.name
    }

    pub fn line(&self) -> u32 {
        self.frame.line
    }

    pub fn is_module(&self) -> bool {
        matches!(self.frame.kind, FrameKind::Module)
    }

    /// The frame's local bindings in binding order; for the module frame
    /// these are the globals. Returns `None` if the bindings are being
    /// mutated right now, which cannot happen between statements.
    pub fn bindings(&self) -> Option<Vec<(Name, Value)>> {
        let locals = self.frame.locals.try_borrow().ok()?;
        Some(locals.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}
