use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::error::{LoxError, Result};
use crate::token::Token;
use crate::value::Value;

/// One lexical scope at runtime.
///
/// A slot holding `None` was declared but never assigned (`var a;`).
/// Environments are shared (`Rc<RefCell<_>>`) because closures keep their
/// defining scope alive after the block that created it has finished.  The
/// chain only points outward, so it can never form a cycle.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Option<Value>>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind `name` to `value` in this scope, shadowing or replacing.
    pub fn define(&mut self, name: &str, value: Value) {
        trace!("define {} = {}", name, value);

        self.values.insert(name.to_string(), Some(value));
    }

    /// Bind `name` without a value; reading it is an error until assigned.
    pub fn declare(&mut self, name: &str) {
        trace!("declare {}", name);

        self.values.insert(name.to_string(), None);
    }

    /// Value bound to `name` in *this* scope only.
    pub fn get_here(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned().flatten()
    }

    /// Look `name` up through the whole chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        match self.values.get(&name.lexeme) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(unassigned(name)),
            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name),
                None => Err(undefined(name)),
            },
        }
    }

    /// Overwrite the nearest existing binding of `name`.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = Some(value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(undefined(name))
        }
    }

    /// The environment `distance` hops up the chain (0 is `env` itself).
    pub fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Option<Rc<RefCell<Environment>>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` from exactly the scope `distance` hops up.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token) -> Result<Value> {
        let target = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let target = target.borrow();

        match target.values.get(&name.lexeme) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(unassigned(name)),
            None => Err(undefined(name)),
        }
    }

    /// Assign `name` in exactly the scope `distance` hops up.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> Result<()> {
        let target = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let mut target = target.borrow_mut();

        match target.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = Some(value);
                Ok(())
            }
            None => Err(undefined(name)),
        }
    }
}

fn undefined(name: &Token) -> LoxError {
    LoxError::runtime(name, format!("Undefined variable '{}'.", name.lexeme))
}

fn unassigned(name: &Token) -> LoxError {
    LoxError::runtime(
        name,
        format!("Variable '{}' has not been assigned.", name.lexeme),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(env: Environment) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(env))
    }

    #[test]
    fn lookup_walks_outward() {
        let globals = shared(Environment::new());
        globals.borrow_mut().define("a", Value::Number(1.0));

        let inner = Environment::with_enclosing(Rc::clone(&globals));

        let value = inner.get(&Token::synthetic("a", 1)).unwrap();
        assert_eq!(value, Value::Number(1.0));
    }

    #[test]
    fn assign_targets_defining_scope() {
        let globals = shared(Environment::new());
        globals.borrow_mut().define("a", Value::Number(1.0));

        let mut inner = Environment::with_enclosing(Rc::clone(&globals));
        inner
            .assign(&Token::synthetic("a", 1), Value::Number(2.0))
            .unwrap();

        assert_eq!(globals.borrow().get_here("a"), Some(Value::Number(2.0)));
        assert_eq!(inner.get_here("a"), None);
    }

    #[test]
    fn declared_slot_is_distinct_from_missing_name() {
        let mut env = Environment::new();
        env.declare("a");

        let unassigned = env.get(&Token::synthetic("a", 3)).unwrap_err();
        let missing = env.get(&Token::synthetic("b", 3)).unwrap_err();

        assert_eq!(
            unassigned.message(),
            Some("Variable 'a' has not been assigned.")
        );
        assert_eq!(missing.message(), Some("Undefined variable 'b'."));
    }

    #[test]
    fn get_at_reads_exact_ancestor() {
        let outer = shared(Environment::new());
        outer.borrow_mut().define("x", Value::String("outer".into()));

        let inner = shared(Environment::with_enclosing(Rc::clone(&outer)));
        inner.borrow_mut().define("x", Value::String("inner".into()));

        let name = Token::synthetic("x", 1);
        assert_eq!(
            Environment::get_at(&inner, 0, &name).unwrap(),
            Value::String("inner".into())
        );
        assert_eq!(
            Environment::get_at(&inner, 1, &name).unwrap(),
            Value::String("outer".into())
        );

        Environment::assign_at(&inner, 1, &name, Value::Nil).unwrap();
        assert_eq!(outer.borrow().get_here("x"), Some(Value::Nil));
    }
}
