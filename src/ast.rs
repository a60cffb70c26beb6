//! Syntax tree produced by the [`Parser`](crate::parser::Parser) and consumed
//! by the resolver and the interpreter.
//!
//! Nodes are immutable once built.  The three node kinds that name a variable
//! (`Variable`, `Assign`, `This`) carry an [`ExprId`] so the resolver can
//! annotate them out of band.

use std::rc::Rc;

use crate::token::Token;

/// Identity of a variable‑referencing expression node.  Ids are handed out
/// sequentially by the parser and are unique within one interpreter session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,
    False,
    Nil,
}

/// Parameter list and body shared by named declarations, methods and
/// anonymous `fun` expressions.  Reference counted so that runtime function
/// values can keep their body alive after the program tree is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    /// The `fun` keyword or the declaration's name, for diagnostics.
    pub keyword: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// A name bound to a function literal: `fun name(...) { ... }` or a method.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub function: Rc<FunctionExpr>,
}

/// **Abstract‑Syntax‑Tree node** representing every kind of *expression*.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix unary operator expression, `!ready` or `-42`.
    Unary {
        operator: Token,
        right: Box<Expr>,
    },

    /// Infix binary operator expression, including the comma operator.
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// `condition ? then_branch : else_branch`
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Variable access.
    Variable { id: ExprId, name: Token },

    /// `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Function‑ or method‑call expression.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// Anonymous function literal.
    Function(Rc<FunctionExpr>),

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },
}

/// **Abstract‑Syntax‑Tree node** for *statements*.  A program is a sequence
/// of these nodes returned by [`Parser::parse`](crate::parser::Parser::parse).
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Placeholder left where a malformed statement was discarded.
    Empty,

    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Print(Expr),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Token,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop.  `for` loops are desugared into this as well.
    While { condition: Expr, body: Box<Stmt> },

    Break { keyword: Token },

    Function(FunctionDecl),

    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class {
        name: Token,
        methods: Vec<FunctionDecl>,
    },
}

