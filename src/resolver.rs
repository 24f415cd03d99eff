//! Static resolver pass for the **Lox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking
//!    declared/defined).
//! 2. Report static errors (redeclaration, forward-read in initializer,
//!    invalid `return`, misplaced `this`/`super`, self-inheritance),
//!    accumulating every violation instead of stopping at the first.
//! 3. Record, for *each* resolvable occurrence, the scope distance from its
//!    use site; occurrences absent from the table are globals.  The table is
//!    handed to the interpreter afterwards, so resolving twice from the same
//!    tree yields the same table.
//!
//! The walk itself never mutates the tree and the interpreter never sees a
//! partially-resolved program: either the table comes back clean or the
//! caller gets every error at once and must not execute.

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::error::LoxError;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// Are we inside a class body?  Used to validate `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances keyed by expression id.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    locals: HashMap<ExprId, usize>,
    errors: Vec<LoxError>,
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top-level statements.  On success the scope-distance table
    /// comes back; otherwise every static error found in the pass.
    pub fn resolve(
        mut self,
        statements: &[Stmt<'a>],
    ) -> std::result::Result<HashMap<ExprId, usize>, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            Ok(self.locals)
        } else {
            Err(self.errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt<'a>) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // var declaration: declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // function declaration: name is visible *inside* its own body
                self.declare(declaration.name);
                self.define(declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;

                self.declare(name);
                self.define(name);

                if let Some(superclass) = superclass {
                    if name.lexeme == superclass.name.lexeme {
                        self.error(superclass.name, "A class can't inherit from itself.");
                    }

                    self.current_class = ClassType::Subclass;
                    self.resolve_local(superclass.id, superclass.name.lexeme);

                    // Methods of a subclass see `super` one scope out.
                    self.begin_scope();
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert("super", true);
                    }
                }

                // Every method sees `this` in the scope around its body.
                self.begin_scope();
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert("this", true);
                }

                for method in methods {
                    let kind = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };

                    self.resolve_function(method, kind);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr<'a>) {
        debug!("Resolving expr: {:?}", expr);

        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // A variable may not be read while its own initializer runs.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme) == Some(&false) {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }

                self.resolve_local(*id, name.lexeme);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name.lexeme);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword.lexeme);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                    }
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                    }
                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword.lexeme);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, declaration: &FunctionDecl<'a>, kind: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for &param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Mark `name` as declared (but not yet usable) in the innermost scope.
    /// Global-level declarations are unrestricted and tracked nowhere.
    fn declare(&mut self, name: &Token<'a>) {
        if self.scopes.is_empty() {
            return;
        }

        let already_defined = self
            .scopes
            .last()
            .map_or(false, |scope| scope.get(name.lexeme) == Some(&true));

        if already_defined {
            self.error(name, "Already a variable with this name in this scope.");
        }

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, false);
        }
    }

    fn define(&mut self, name: &Token<'a>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    fn error(&mut self, token: &Token<'_>, message: &str) {
        self.errors.push(LoxError::resolve(token, message));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as either:
    ///  - a local at depth `d`, or
    ///  - a global if not found in *any* scope (no table entry).
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        // 1. check innermost → outermost
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' at depth {}", name, depth);

                self.locals.insert(id, depth);
                return;
            }
        }

        // 2. not found in any local scope ⇒ global
        debug!("Resolved '{}' as global", name);
    }
}
