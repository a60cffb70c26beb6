//! Everything a Lox program can call: user functions (closures and bound
//! methods), classes, and host‑provided native functions.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info};

use crate::ast::FunctionExpr;
use crate::class::{Class, Instance};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// A callable runtime value.
#[derive(Debug, Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Class(Rc<Class>),
    Native(Rc<NativeFunction>),
}

impl Callable {
    /// Exact number of arguments a call must supply.
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.arity(),
            Callable::Class(class) => class.arity(),
            Callable::Native(native) => native.arity,
        }
    }

    /// Invoke with already‑evaluated arguments.  Arity has been checked by
    /// the caller; `paren` locates errors raised by native code.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value> {
        match self {
            Callable::Function(function) => function.call(interpreter, arguments),

            Callable::Class(class) => {
                debug!("Instantiating class '{}'", class.name);

                let instance = Rc::new(RefCell::new(Instance::new(Rc::clone(class))));

                if let Some(init) = class.find_method("init") {
                    init.bind(Rc::clone(&instance)).call(interpreter, arguments)?;
                }

                Ok(Value::Instance(instance))
            }

            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);

                (native.func)(&arguments).map_err(|message| LoxError::runtime(paren, message))
            }
        }
    }

    /// Identity comparison.
    pub fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) => match &function.name {
                Some(name) => write!(f, "<fn {}>", name),
                None => write!(f, "<fn>"),
            },
            Callable::Class(class) => write!(f, "{}", class.name),
            Callable::Native(native) => write!(f, "<native fn {}>", native.name),
        }
    }
}

/// A user‑defined function or method together with the environment it
/// closed over.
pub struct Function {
    name: Option<String>,
    declaration: Rc<FunctionExpr>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        name: Option<String>,
        declaration: Rc<FunctionExpr>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            name,
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// A copy of this method whose closure binds `this` to `instance`.
    pub fn bind(&self, instance: Rc<RefCell<Instance>>) -> Function {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(instance));

        Function {
            name: self.name.clone(),
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }

    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!(
            "Calling function '{}' with {} argument(s)",
            self.name().unwrap_or("<anonymous>"),
            arguments.len()
        );

        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let flow = interpreter
            .execute_block(&self.declaration.body, Rc::new(RefCell::new(environment)))?;

        // An initializer always yields its instance, even on a bare or
        // valued `return`.
        if self.is_initializer {
            return Ok(self.closure.borrow().get_here("this").unwrap_or(Value::Nil));
        }

        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Normal | Flow::Break => Value::Nil,
        })
    }
}

impl fmt::Debug for Function {
    // Closures can reach instances that hold this function again; never
    // descend into the environment.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

/// A function implemented by the host.
#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: fn(&[Value]) -> std::result::Result<Value, String>,
}

/// The natives every global environment starts with.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        arity: 0,
        func: clock,
    }]
}

/// Seconds since the Unix epoch, with sub‑second precision.
fn clock(_args: &[Value]) -> std::result::Result<Value, String> {
    let seconds: f64 = Utc::now().timestamp_micros() as f64 / 1_000_000.0;

    info!("Native function 'clock' returned: {}", seconds);

    Ok(Value::Number(seconds))
}
