//! Parenthesised, Lisp‑like rendering of the syntax tree.  Used by
//! `rox parse` and by tests that compare tree shapes.

use crate::ast::{Expr, FunctionExpr, LiteralValue, Stmt};

pub struct Ast;

impl Ast {
    pub fn print(&self, expr: &Expr) -> String {
        match expr {
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(&operator.lexeme, &[left.as_ref(), right.as_ref()]),

            Expr::Unary { operator, right } => self.parenthesize(&operator.lexeme, &[right.as_ref()]),

            Expr::Literal(value) => match value {
                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }

                LiteralValue::Str(s) => s.to_string(),

                LiteralValue::True => "true".to_string(),

                LiteralValue::False => "false".to_string(),

                LiteralValue::Nil => "nil".to_string(),
            },

            Expr::Grouping(expr) => self.parenthesize("group", &[expr.as_ref()]),

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => self.parenthesize(
                "?:",
                &[condition.as_ref(), then_branch.as_ref(), else_branch.as_ref()],
            ),

            Expr::Variable { name, .. } => name.lexeme.to_string(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out = format!("(call {}", self.print(callee));
                for argument in arguments {
                    out.push(' ');
                    out.push_str(&self.print(argument));
                }
                out.push(')');
                out
            }

            Expr::Function(function) => format!("(fun {})", self.function(function)),

            Expr::Get { object, name } => format!("(. {} {})", self.print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                self.print(object),
                name.lexeme,
                self.print(value)
            ),

            Expr::This { .. } => "this".to_string(),
        }
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Empty => "(empty)".to_string(),

            Stmt::Expression(expr) => format!("(; {})", self.print(expr)),

            Stmt::Print(expr) => format!("(print {})", self.print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, self.print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => format!("(block{})", self.stmts(statements)),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                self.print(condition),
                self.print_stmt(body)
            ),

            Stmt::Break { .. } => "(break)".to_string(),

            Stmt::Function(decl) => {
                format!("(fun {} {})", decl.name.lexeme, self.function(&decl.function))
            }

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", self.print(value)),
                None => "(return)".to_string(),
            },

            Stmt::Class { name, methods } => {
                let mut out = format!("(class {}", name.lexeme);
                for method in methods {
                    out.push_str(&format!(
                        " ({} {})",
                        method.name.lexeme,
                        self.function(&method.function)
                    ));
                }
                out.push(')');
                out
            }
        }
    }

    fn function(&self, function: &FunctionExpr) -> String {
        let params: Vec<&str> = function.params.iter().map(|p| p.lexeme.as_str()).collect();

        format!("({}){}", params.join(" "), self.stmts(&function.body))
    }

    fn stmts(&self, statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(|s| format!(" {}", self.print_stmt(s)))
            .collect()
    }

    fn parenthesize(&self, name: &str, exprs: &[&Expr]) -> String {
        let mut out = format!("({}", name);
        for expr in exprs {
            out.push(' ');
            out.push_str(&self.print(expr));
        }
        out.push(')');
        out
    }
}
