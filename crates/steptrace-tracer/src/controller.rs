//! Step Controller.
//!
//! A [`Tracer`] runs each program in a *tracing session*: a freshly spawned
//! thread that owns the interpreter, the [`Recorder`] hook and every runtime
//! value for the duration of one call. Nothing is shared between sessions,
//! so concurrent calls cannot observe each other's steps.

use std::any::Any;
use std::thread;

use serde_json::{Map, Value as Json};
use steptrace_runtime::{convert, Exception, Interpreter, InterpreterConfig, LineContext, LineHook};

use crate::config::TracerConfig;
use crate::error::TracerError;
use crate::schema::{Fault, Trace, TraceEntry};
use crate::snapshot::SnapshotBuilder;

/// Everything one tracing call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceOutcome {
    pub trace: Trace,
    /// The program's `print` output.
    pub output: String,
    /// Module bindings once the program stopped; `None` if it never started.
    pub final_locals: Option<Map<String, Json>>,
}

impl TraceOutcome {
    fn failed(error: impl Into<String>) -> Self {
        TraceOutcome {
            trace: Trace::failed(error),
            output: String::new(),
            final_locals: None,
        }
    }
}

/// The line hook of one session: appends a Step per line event.
struct Recorder<'b, 's> {
    builder: &'b SnapshotBuilder<'s>,
    entries: Vec<TraceEntry>,
}

impl LineHook for Recorder<'_, '_> {
    fn on_line(&mut self, ctx: &LineContext<'_>) {
        self.entries.push(TraceEntry::Step(self.builder.build(ctx)));
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tracer {
    config: TracerConfig,
}

impl Tracer {
    pub fn new(config: TracerConfig) -> Self {
        Tracer { config }
    }

    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Runs `source` as a standalone program, feeding it `inputs`.
    ///
    /// Never panics and never returns an error: compile errors and internal
    /// failures become `Trace::Failed`, runtime faults a trailing [`Fault`].
    pub fn trace(&self, source: &str, inputs: &[Json]) -> TraceOutcome {
        match self.spawn_session(source, inputs) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(error = %err, "tracing session failed");
                TraceOutcome::failed(format!("internal tracer error: {err}"))
            }
        }
    }

    fn spawn_session(&self, source: &str, inputs: &[Json]) -> Result<TraceOutcome, TracerError> {
        thread::scope(|scope| {
            let handle = thread::Builder::new()
                .name("steptrace-session".to_string())
                .stack_size(self.config.stack_size_bytes)
                .spawn_scoped(scope, || self.session(source, inputs))
                .map_err(TracerError::Spawn)?;
            handle
                .join()
                .map_err(|payload| TracerError::Panicked(panic_message(payload.as_ref())))
        })
    }

    fn session(&self, source: &str, inputs: &[Json]) -> TraceOutcome {
        let module = match steptrace_syntax::parse(source) {
            Ok(module) => module,
            Err(err) => {
                tracing::debug!(error = %err, "source did not compile");
                return TraceOutcome::failed(err.to_string());
            }
        };
        let inputs = match inputs.iter().map(convert::from_json).collect::<Result<Vec<_>, _>>() {
            Ok(values) => values,
            Err(exc) => return TraceOutcome::failed(format!("invalid input value: {exc}")),
        };

        let builder = SnapshotBuilder::new(source, self.config.limits());
        let mut recorder = Recorder {
            builder: &builder,
            entries: Vec::new(),
        };
        let interp_config = InterpreterConfig {
            max_recursion_depth: self.config.max_recursion_depth,
            source_id: self.config.source_id.clone(),
        };

        tracing::debug!(source_id = %self.config.source_id, inputs = inputs.len(), "tracing session started");
        let mut interp = Interpreter::new(interp_config, &mut recorder);
        interp.set_inputs(inputs);
        let result = interp.run(&module);
        let output = interp.output().to_string();
        let final_locals = builder.serialize_bindings(&interp.globals());
        let fault = result.err().map(|exc| self.fault(&exc, source));
        interp.reclaim();

        let mut entries = recorder.entries;
        tracing::debug!(
            steps = entries.len(),
            faulted = fault.is_some(),
            "tracing session finished"
        );
        entries.extend(fault.map(TraceEntry::Fault));
        TraceOutcome {
            trace: Trace::Steps { trace: entries },
            output,
            final_locals: Some(final_locals),
        }
    }

    fn fault(&self, exc: &Exception, source: &str) -> Fault {
        Fault {
            error: exc.message(),
            error_type: exc.type_name(),
            traceback: exc.format_traceback(&self.config.source_id, source),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn panic_payloads_are_readable() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[test]
    fn output_is_kept_out_of_the_trace() {
        let outcome = Tracer::default().trace("print('hi')\n", &[]);
        assert_eq!(outcome.output, "hi\n");
        assert_eq!(outcome.trace.steps().count(), 1);
    }

    #[test]
    fn source_id_reaches_frames_and_tracebacks() {
        let tracer = Tracer::new(TracerConfig {
            source_id: "main.py".to_string(),
            ..TracerConfig::default()
        });
        let outcome = tracer.trace("x = 1\ny = x[0]\n", &[]);
        let step = outcome.trace.steps().next().unwrap();
        assert_eq!(step.call_stack[0].filename, "main.py");
        let fault = outcome.trace.fault().unwrap();
        assert_eq!(fault.error_type, "TypeError");
        assert!(fault.traceback.contains("File \"main.py\", line 2, in <module>"));
    }

    #[test]
    fn compile_errors_have_no_final_state() {
        let outcome = Tracer::default().trace("x = (\n", &[]);
        assert!(outcome.trace.error().is_some());
        assert_eq!(outcome.final_locals, None);
    }

    #[test]
    fn final_locals_include_input_data() {
        let outcome = Tracer::default().trace("n = input()\n", &[json!(4)]);
        let locals = outcome.final_locals.unwrap();
        assert_eq!(locals.get("input_data"), Some(&json!([4])));
        assert_eq!(locals.get("n"), Some(&json!("4")));
    }
}
