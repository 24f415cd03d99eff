//! Syntax tree produced by the parser and consumed by the resolver, the
//! interpreter, and the tree printer.
//!
//! Nodes are plain tagged unions; downstream phases dispatch with exhaustive
//! `match` rather than a visitor.  Expression nodes that name a binding
//! (`Variable`, `Assign`, `This`, `Super`, and the superclass clause of a
//! class declaration) carry a process-unique [`ExprId`] stamped at parse
//! time.  The resolver keys its scope-distance table by that id, so merging
//! tables from successive inputs (the REPL case) can never collide.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

/// Identity of a resolvable expression node.  Ids come from a single
/// process-wide counter, so every parsed node is distinct for the lifetime
/// of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    /// Mint the next unused id.
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Literal payload captured from the token stream.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    Str(String),
    True,
    False,
    Nil,
}

/// Expression nodes.  Operator-carrying variants keep a reference to the
/// operator token so runtime faults can report the source line.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    /// A literal value: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Prefix operator application: `!x` or `-x`.
    Unary {
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Infix arithmetic, comparison, or equality.
    Binary {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Short-circuiting `and` / `or`.
    Logical {
        left: Box<Expr<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expr<'a>>,
    },

    /// Parenthesised sub-expression.
    Grouping(Box<Expr<'a>>),

    /// Read of a named binding.
    Variable { id: ExprId, name: &'a Token<'a> },

    /// Assignment to a named binding; evaluates to the assigned value.
    Assign {
        id: ExprId,
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// Call expression.  `paren` is the closing parenthesis, kept for
    /// arity- and callability-fault line numbers.
    Call {
        callee: Box<Expr<'a>>,
        paren: &'a Token<'a>,
        arguments: Vec<Expr<'a>>,
    },

    /// Property read: `object.name`.
    Get {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
    },

    /// Property write: `object.name = value`.
    Set {
        object: Box<Expr<'a>>,
        name: &'a Token<'a>,
        value: Box<Expr<'a>>,
    },

    /// The `this` keyword inside a method body.
    This { id: ExprId, keyword: &'a Token<'a> },

    /// `super.method` inside a subclass method body.
    Super {
        id: ExprId,
        keyword: &'a Token<'a>,
        method: &'a Token<'a>,
    },
}

/// Statement nodes.  `for` loops never appear here; the parser desugars them
/// into `Block`/`While` combinations.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'a> {
    /// Expression evaluated for its side effects.
    Expression(Expr<'a>),

    /// `print expr;`
    Print(Expr<'a>),

    /// `var name = initializer;` with an optional initializer.
    Var {
        name: &'a Token<'a>,
        initializer: Option<Expr<'a>>,
    },

    /// `{ ... }` block introducing a fresh scope.
    Block(Vec<Stmt<'a>>),

    /// `if` with an optional `else` branch.
    If {
        condition: Expr<'a>,
        then_branch: Box<Stmt<'a>>,
        else_branch: Option<Box<Stmt<'a>>>,
    },

    /// `while` loop.
    While {
        condition: Expr<'a>,
        body: Box<Stmt<'a>>,
    },

    /// Named function declaration.  The declaration is shared behind an `Rc`
    /// so the closures built from it can outlive the statement list.
    Function(Rc<FunctionDecl<'a>>),

    /// `return` with an optional value expression.
    Return {
        keyword: &'a Token<'a>,
        value: Option<Expr<'a>>,
    },

    /// Class declaration with an optional superclass clause.
    Class {
        name: &'a Token<'a>,
        superclass: Option<SuperclassRef<'a>>,
        methods: Vec<Rc<FunctionDecl<'a>>>,
    },
}

/// Shared body of a function or method declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl<'a> {
    pub name: &'a Token<'a>,
    pub params: Vec<&'a Token<'a>>,
    pub body: Vec<Stmt<'a>>,
}

/// The `< Superclass` clause of a class declaration.  Resolves like a
/// variable read, hence the id.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperclassRef<'a> {
    pub id: ExprId,
    pub name: &'a Token<'a>,
}
