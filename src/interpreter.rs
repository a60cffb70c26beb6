//! Tree‑walking evaluator.
//!
//! Statements execute for effect and report how control leaves them through
//! [`Flow`]; expressions evaluate to a [`Value`].  Runtime errors are
//! [`LoxError::Runtime`] and unwind to the caller of [`Interpreter::interpret`].
//!
//! Variable accesses consult the side table filled in by the
//! [`Resolver`](crate::resolver::Resolver): a recorded distance addresses an
//! exact ancestor of the current environment, no entry means global.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use log::{debug, info, trace};

use crate::ast::{Expr, ExprId, FunctionDecl, FunctionExpr, Stmt};
use crate::callable::{natives, Callable, Function};
use crate::class::{Class, Instance};
use crate::environment::Environment;
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Deepest nesting of Lox calls before a call fails with `Stack overflow.`
/// The host stack must be large enough for this many nested calls.
pub const MAX_CALL_DEPTH: usize = 1000;

/// How control left a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fell off the end; continue with the next statement.
    Normal,

    /// `break`: unwind to the nearest enclosing loop.
    Break,

    /// `return`: unwind to the nearest enclosing call.
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter printing to stdout, with the native
    /// functions defined as globals.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Same as [`Interpreter::new`] but `print` writes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        for native in natives() {
            debug!("Defining native function '{}'", native.name);

            let name: &str = native.name;
            globals
                .borrow_mut()
                .define(name, Value::Callable(Callable::Native(Rc::new(native))));
        }

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            call_depth: 0,
        }
    }

    /// Record that the reference `id` binds `depth` scopes out.
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        trace!("note_local {:?} -> {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Drop every annotation with an id of `first` or later.  Used when a
    /// unit fails resolution: its tree never runs, so its entries are dead.
    pub fn forget_locals_from(&mut self, first: ExprId) {
        self.locals.retain(|id, _| *id < first);

        trace!("forget_locals_from {:?}, {} left", first, self.locals.len());
    }

    #[cfg(test)]
    pub(crate) fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            // The resolver rejects stray `break`/`return` at top level.
            self.execute(stmt)?;
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Empty => Ok(Flow::Normal),

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                match initializer {
                    Some(expr) => {
                        let value: Value = self.evaluate(expr)?;
                        self.environment.borrow_mut().define(&name.lexeme, value);
                    }
                    None => self.environment.borrow_mut().declare(&name.lexeme),
                }
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Function(FunctionDecl { name, function }) => {
                debug!("Defining function '{}'", name.lexeme);

                let value = self.closure(Some(name.lexeme.clone()), function);
                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Class { name, methods } => {
                debug!("Defining class '{}'", name.lexeme);

                self.environment.borrow_mut().declare(&name.lexeme);

                let methods: HashMap<String, Rc<Function>> = methods
                    .iter()
                    .map(|method| {
                        let function = Function::new(
                            Some(method.name.lexeme.clone()),
                            Rc::clone(&method.function),
                            Rc::clone(&self.environment),
                            method.name.lexeme == "init",
                        );
                        (method.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = Class::new(name.lexeme.clone(), methods);
                self.environment
                    .borrow_mut()
                    .assign(name, Value::Callable(Callable::Class(Rc::new(class))))?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` with `environment` as the current scope.  The
    /// previous scope is restored on every exit path: normal completion,
    /// `break`/`return`, or a runtime error.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        let previous = mem::replace(&mut self.environment, environment);
        let result = self.execute_sequence(statements);
        self.environment = previous;
        result
    }

    fn execute_sequence(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                self.call(callee, paren, values)
            }

            Expr::Function(function) => Ok(self.closure(None, function)),

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }
        }
    }

    /// A function value closing over the current environment.
    fn closure(&self, name: Option<String>, function: &Rc<FunctionExpr>) -> Value {
        let function = Function::new(name, Rc::clone(function), Rc::clone(&self.environment), false);

        Value::Callable(Callable::Function(Rc::new(function)))
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn call(&mut self, callee: Value, paren: &Token, arguments: Vec<Value>) -> Result<Value> {
        let callable: Callable = match callee {
            Value::Callable(callable) => callable,
            other => {
                debug!("Tried to call a {}", other.type_name());

                return Err(LoxError::runtime(
                    paren,
                    "Can only call functions and classes.",
                ));
            }
        };

        if arguments.len() != callable.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    arguments.len()
                ),
            ));
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(LoxError::runtime(paren, "Stack overflow."));
        }

        self.call_depth += 1;
        let result = callable.call(self, arguments, paren);
        self.call_depth -= 1;
        result
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value> {
        let right: Value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(LoxError::runtime(
                    operator,
                    format!("Operand of '{}' must be a number.", operator.lexeme),
                )),
            },

            TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),

            _ => Err(LoxError::runtime(
                operator,
                format!("Invalid unary operator '{}'.", operator.lexeme),
            )),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left: Value = self.evaluate(left)?;
        let right: Value = self.evaluate(right)?;

        trace!("Binary {} {} {}", left, operator.lexeme, right);

        match operator.token_type {
            TokenType::COMMA => Ok(right),

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            TokenType::PLUS => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", left, right)))
                }
                _ => Err(LoxError::runtime(
                    operator,
                    "Operands of '+' must be two numbers or include a string.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Number(a * b))
            }

            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left, &right)?;
                if b == 0.0 {
                    return Err(LoxError::runtime(operator, "Division by zero."));
                }
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;
                Ok(Value::Bool(a <= b))
            }

            _ => Err(LoxError::runtime(
                operator,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            )),
        }
    }
}

fn number_operands(operator: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(LoxError::runtime(
            operator,
            format!("Operands of '{}' must be numbers.", operator.lexeme),
        )),
    }
}
