//! Tree-walking interpreter for the traced language.
//!
//! Build an [`Interpreter`] around a [`LineHook`], hand it a module parsed by
//! `steptrace_syntax::parse`, and the hook is called immediately before every
//! source line executes with a [`LineContext`] describing the live frame
//! stack. Uncaught errors of the running program surface as [`Exception`].

pub mod builtins;
pub mod convert;
pub mod error;
pub mod format;
pub mod hook;
mod interp;
mod methods;
mod modules;
mod scope;
mod sort;
pub mod value;

// Re-export commonly used types
pub use error::{ExcKind, Exception, RtResult, TracebackEntry};
pub use hook::{FrameView, LineContext, LineHook, NoopHook};
pub use interp::{Args, Interpreter, InterpreterConfig};
pub use value::Value;
