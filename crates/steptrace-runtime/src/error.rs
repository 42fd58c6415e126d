//! Exceptions raised by traced programs.
//!
//! Every runtime failure of a traced program is an [`Exception`]: an exception
//! object (the value `except ... as e` binds) plus the traceback recorded where
//! it was first raised. Interpreter-internal failures do not exist as a
//! separate category; anything that goes wrong while running a program
//! surfaces as one of the [`ExcKind`] classes below.

use std::fmt;
use std::rc::Rc;

use crate::format::{self, NoHook};
use crate::value::{ExceptionObj, Value};

pub type RtResult<T> = Result<T, Exception>;

/// Built-in exception classes, arranged in the usual single-inheritance
/// hierarchy rooted at `Exception`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExcKind {
    Exception,
    ArithmeticError,
    ZeroDivisionError,
    OverflowError,
    LookupError,
    IndexError,
    KeyError,
    NameError,
    UnboundLocalError,
    TypeError,
    ValueError,
    AttributeError,
    AssertionError,
    RuntimeError,
    RecursionError,
    NotImplementedError,
    StopIteration,
    EOFError,
    ImportError,
    ModuleNotFoundError,
}

impl ExcKind {
    pub const ALL: [ExcKind; 20] = [
        ExcKind::Exception,
        ExcKind::ArithmeticError,
        ExcKind::ZeroDivisionError,
        ExcKind::OverflowError,
        ExcKind::LookupError,
        ExcKind::IndexError,
        ExcKind::KeyError,
        ExcKind::NameError,
        ExcKind::UnboundLocalError,
        ExcKind::TypeError,
        ExcKind::ValueError,
        ExcKind::AttributeError,
        ExcKind::AssertionError,
        ExcKind::RuntimeError,
        ExcKind::RecursionError,
        ExcKind::NotImplementedError,
        ExcKind::StopIteration,
        ExcKind::EOFError,
        ExcKind::ImportError,
        ExcKind::ModuleNotFoundError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExcKind::Exception => "Exception",
            ExcKind::ArithmeticError => "ArithmeticError",
            ExcKind::ZeroDivisionError => "ZeroDivisionError",
            ExcKind::OverflowError => "OverflowError",
            ExcKind::LookupError => "LookupError",
            ExcKind::IndexError => "IndexError",
            ExcKind::KeyError => "KeyError",
            ExcKind::NameError => "NameError",
            ExcKind::UnboundLocalError => "UnboundLocalError",
            ExcKind::TypeError => "TypeError",
            ExcKind::ValueError => "ValueError",
            ExcKind::AttributeError => "AttributeError",
            ExcKind::AssertionError => "AssertionError",
            ExcKind::RuntimeError => "RuntimeError",
            ExcKind::RecursionError => "RecursionError",
            ExcKind::NotImplementedError => "NotImplementedError",
            ExcKind::StopIteration => "StopIteration",
            ExcKind::EOFError => "EOFError",
            ExcKind::ImportError => "ImportError",
            ExcKind::ModuleNotFoundError => "ModuleNotFoundError",
        }
    }

    pub fn from_name(name: &str) -> Option<ExcKind> {
        ExcKind::ALL.iter().copied().find(|k| k.name() == name)
    }

    pub fn parent(self) -> Option<ExcKind> {
        let parent = match self {
            ExcKind::Exception => return None,
            ExcKind::ZeroDivisionError | ExcKind::OverflowError => ExcKind::ArithmeticError,
            ExcKind::IndexError | ExcKind::KeyError => ExcKind::LookupError,
            ExcKind::UnboundLocalError => ExcKind::NameError,
            ExcKind::RecursionError | ExcKind::NotImplementedError => ExcKind::RuntimeError,
            ExcKind::ModuleNotFoundError => ExcKind::ImportError,
            _ => ExcKind::Exception,
        };
        Some(parent)
    }

    /// Whether `self` is `other` or derives from it.
    pub fn is_subclass_of(self, other: ExcKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for ExcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One level of a traceback: the function that was running and its line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracebackEntry {
    pub function: Rc<str>,
    pub line: u32,
}

/// A raised exception on its way up the interpreter stack.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", summary(.value))]
pub struct Exception {
    pub value: Rc<ExceptionObj>,
    /// Outermost frame first. Empty until the exception leaves the statement
    /// that raised it.
    pub traceback: Vec<TracebackEntry>,
}

impl Exception {
    /// Creates an exception of a built-in class with a single message
    /// argument.
    pub fn new(kind: ExcKind, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Exception::from_obj(Rc::new(ExceptionObj::new(
            kind,
            None,
            vec![Value::Str(message.into())],
        )))
    }

    /// Creates an exception of a built-in class with explicit arguments.
    pub fn with_args(kind: ExcKind, args: Vec<Value>) -> Self {
        Exception::from_obj(Rc::new(ExceptionObj::new(kind, None, args)))
    }

    pub fn from_obj(value: Rc<ExceptionObj>) -> Self {
        Exception {
            value,
            traceback: Vec::new(),
        }
    }

    /// The built-in class at the root of this exception's class.
    pub fn kind(&self) -> ExcKind {
        self.value.kind
    }

    /// The class name, user-defined classes included.
    pub fn type_name(&self) -> String {
        self.value.type_name().to_string()
    }

    /// `str(e)`.
    pub fn message(&self) -> String {
        message_of(&self.value)
    }

    /// Renders the traceback the way the traced language prints an uncaught
    /// exception.
    pub fn format_traceback(&self, source_id: &str, source: &str) -> String {
        let lines: Vec<&str> = source.split('\n').collect();
        let mut out = String::from("Traceback (most recent call last):\n");
        for entry in &self.traceback {
            out.push_str(&format!(
                "  File \"{source_id}\", line {}, in {}\n",
                entry.line, entry.function
            ));
            if let Some(text) = entry
                .line
                .checked_sub(1)
                .and_then(|i| lines.get(i as usize))
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
            {
                out.push_str("    ");
                out.push_str(text);
                out.push('\n');
            }
        }
        out.push_str(&summary(&self.value));
        out.push('\n');
        out
    }
}

/// `str(e)` for an exception object: empty without arguments, the single
/// argument's `str` with one, the argument tuple's `repr` otherwise. A
/// `KeyError` shows the missing key's `repr`.
pub(crate) fn message_of(obj: &ExceptionObj) -> String {
    let args = obj.args.borrow();
    match args.as_slice() {
        [] => String::new(),
        [single] if obj.kind == ExcKind::KeyError && obj.class.is_none() => {
            format::repr(single, &mut NoHook).unwrap_or_default()
        }
        [single] => format::to_str(single, &mut NoHook).unwrap_or_default(),
        many => format::repr(&Value::tuple(many.to_vec()), &mut NoHook).unwrap_or_default(),
    }
}

fn summary(obj: &ExceptionObj) -> String {
    let message = message_of(obj);
    if message.is_empty() {
        obj.type_name().to_string()
    } else {
        format!("{}: {message}", obj.type_name())
    }
}

/// Shorthand for `Err(Exception::new(kind, message))`.
pub fn raise<T>(kind: ExcKind, message: impl Into<String>) -> RtResult<T> {
    Err(Exception::new(kind, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy() {
        assert!(ExcKind::ZeroDivisionError.is_subclass_of(ExcKind::ArithmeticError));
        assert!(ExcKind::ZeroDivisionError.is_subclass_of(ExcKind::Exception));
        assert!(ExcKind::KeyError.is_subclass_of(ExcKind::LookupError));
        assert!(!ExcKind::KeyError.is_subclass_of(ExcKind::ArithmeticError));
        assert!(ExcKind::RecursionError.is_subclass_of(ExcKind::RuntimeError));
    }

    #[test]
    fn names_round_trip() {
        for kind in ExcKind::ALL {
            assert_eq!(ExcKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn display_and_message() {
        let exc = Exception::new(ExcKind::ZeroDivisionError, "division by zero");
        assert_eq!(exc.to_string(), "ZeroDivisionError: division by zero");
        assert_eq!(exc.message(), "division by zero");

        let exc = Exception::with_args(ExcKind::KeyError, vec![Value::str("missing")]);
        assert_eq!(exc.message(), "'missing'");

        let exc = Exception::with_args(ExcKind::ValueError, vec![]);
        assert_eq!(exc.to_string(), "ValueError");
    }

    #[test]
    fn traceback_format() {
        let mut exc = Exception::new(ExcKind::ZeroDivisionError, "division by zero");
        exc.traceback = vec![
            TracebackEntry {
                function: "<module>".into(),
                line: 3,
            },
            TracebackEntry {
                function: "f".into(),
                line: 2,
            },
        ];
        let source = "def f():\n    return 1 / 0\nf()\n";
        let text = exc.format_traceback("<string>", source);
        assert_eq!(
            text,
            "Traceback (most recent call last):\n  File \"<string>\", line 3, in <module>\n    f()\n  File \"<string>\", line 2, in f\n    return 1 / 0\nZeroDivisionError: division by zero\n"
        );
    }
}
