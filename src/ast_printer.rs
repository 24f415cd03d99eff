use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};

/// Converts syntax trees to the Crafting-Interpreters prefix form
/// (no heap allocations except `String` joins for output).
///
/// The `parse` subcommand prints one line per top-level statement, which
/// also makes the `for` desugaring directly observable.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr<'_>) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3.0 → 3.0 (one forced decimal)
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            // ── grouping ────────────────────────────────────────────────
            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            // ── unary operator ──────────────────────────────────────────
            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            // ── binary / logical operators ──────────────────────────────
            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            // ── bindings ────────────────────────────────────────────────
            Expr::Variable { name, .. } => name.lexeme.into(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            // ── calls and properties ────────────────────────────────────
            Expr::Call {
                callee, arguments, ..
            } => {
                let mut s = format!("(call {}", Self::print(callee));
                for arg in arguments {
                    s.push(' ');
                    s.push_str(&Self::print(arg));
                }
                s.push(')');
                s
            }

            Expr::Get { object, name } => {
                format!("(get {} {})", Self::print(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(set {} {} {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            // ── class keywords ──────────────────────────────────────────
            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    pub fn print_stmt(stmt: &Stmt<'_>) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(init) => format!("(var {} {})", name.lexeme, Self::print(init)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Block(statements) => {
                let mut s = String::from("(block");
                for statement in statements {
                    s.push(' ');
                    s.push_str(&Self::print_stmt(statement));
                }
                s.push(')');
                s
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),

            Stmt::Function(declaration) => Self::print_function(declaration),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut s = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    s.push_str(" < ");
                    s.push_str(superclass.name.lexeme);
                }
                for method in methods {
                    s.push(' ');
                    s.push_str(&Self::print_function(method));
                }
                s.push(')');
                s
            }
        }
    }

    fn print_function(declaration: &FunctionDecl<'_>) -> String {
        let mut s = format!("(fun {} (", declaration.name.lexeme);

        for (i, param) in declaration.params.iter().enumerate() {
            if i > 0 {
                s.push(' ');
            }
            s.push_str(param.lexeme);
        }
        s.push(')');

        for statement in &declaration.body {
            s.push(' ');
            s.push_str(&Self::print_stmt(statement));
        }
        s.push(')');
        s
    }
}
