//! One interpreter session: the scan → parse → resolve → interpret pipeline
//! over a persistent global environment.
//!
//! A script is a single call to [`Lox::run`]; the REPL calls it once per
//! line.  Every call starts from a clean error state.

use std::io::Write;

use log::{debug, info};

use crate::ast::ExprId;
use crate::error::{Diagnostics, LoxError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::scan_tokens;

/// Process exit code for a static (scan, parse or resolve) error.
pub const EXIT_STATIC_ERROR: i32 = 65;

/// Process exit code for a runtime error.
pub const EXIT_RUNTIME_ERROR: i32 = 70;

/// What happened to one execution unit.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Static diagnostics in the order they were found.
    pub diagnostics: Diagnostics,

    /// The runtime error that aborted execution, if any.
    pub runtime_error: Option<LoxError>,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty() && self.runtime_error.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        if self.diagnostics.had_error() {
            EXIT_STATIC_ERROR
        } else if self.runtime_error.is_some() {
            EXIT_RUNTIME_ERROR
        } else {
            0
        }
    }

    /// Every error of this unit, static ones first.
    pub fn errors(&self) -> impl Iterator<Item = &LoxError> {
        self.diagnostics.iter().chain(self.runtime_error.as_ref())
    }
}

pub struct Lox {
    interpreter: Interpreter,
    next_id: usize,
}

impl Default for Lox {
    fn default() -> Self {
        Self::new()
    }
}

impl Lox {
    pub fn new() -> Self {
        Self::from_interpreter(Interpreter::new())
    }

    /// A session whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::from_interpreter(Interpreter::with_output(out))
    }

    fn from_interpreter(interpreter: Interpreter) -> Self {
        Self {
            interpreter,
            next_id: 0,
        }
    }

    /// Run one execution unit.  Later stages only run while the unit is
    /// still free of static errors.
    pub fn run(&mut self, source: &str) -> Outcome {
        let mut outcome = Outcome::default();

        let tokens = scan_tokens(source, &mut outcome.diagnostics);

        let first_id: usize = self.next_id;
        let mut parser = Parser::new(&tokens).with_first_id(first_id);
        let statements = parser.parse(&mut outcome.diagnostics);
        self.next_id = parser.next_id();

        if outcome.diagnostics.had_error() {
            info!(
                "Skipping resolution: {} static error(s)",
                outcome.diagnostics.len()
            );
            return outcome;
        }

        Resolver::new(&mut self.interpreter).resolve(&statements, &mut outcome.diagnostics);

        // Annotations of units that ran stay: their closures may outlive them.
        if outcome.diagnostics.had_error() {
            self.interpreter.forget_locals_from(ExprId(first_id));

            info!(
                "Skipping execution: {} static error(s)",
                outcome.diagnostics.len()
            );
            return outcome;
        }

        if let Err(e) = self.interpreter.interpret(&statements) {
            debug!("Runtime error: {}", e);
            outcome.runtime_error = Some(e);
        }

        outcome
    }
}
