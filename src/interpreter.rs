//! Tree-walking evaluator.
//!
//! Statements execute against a chain of [`Environment`] scopes; expressions
//! reduce to [`Value`]s.  Variable reads and writes consult the resolver's
//! distance table first and fall back to the global scope when the table has
//! no entry.  `return` travels as [`InterpretError::ReturnSignal`] through the
//! same `Result` channel as runtime faults and is caught exactly once, at the
//! call frame that invoked the function.

use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};
use thiserror::Error;

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt, SuperclassRef};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::token::{Token, TokenType};
use crate::value::{LoxClass, LoxFunction, LoxInstance, Value};

/// Anything that can unwind out of statement execution: a genuine runtime
/// fault, or the value a `return` statement is carrying back to its caller.
#[derive(Error, Debug)]
pub enum InterpretError<'a> {
    #[error(transparent)]
    Fault(#[from] RuntimeError),

    #[error("Return signal with value: {0}")]
    ReturnSignal(Value<'a>),
}

/// Convenient alias for interpreter results.
pub type IResult<'a, T> = Result<T, InterpretError<'a>>;

/// Sink for `print` statement output.  The CLI prints to stdout; tests
/// substitute a capturing sink.
pub trait Output {
    fn print(&mut self, text: &str);
}

/// Default sink: one line on stdout per printed value.
pub struct StdoutOutput;

impl Output for StdoutOutput {
    fn print(&mut self, text: &str) {
        println!("{}", text);
    }
}

/// Executes resolved programs.  Holds the global scope, the currently active
/// scope, and the resolver's distance table; lives for a whole session so the
/// REPL can accumulate state across lines.
pub struct Interpreter<'a> {
    globals: Rc<RefCell<Environment<'a>>>,
    environment: Rc<RefCell<Environment<'a>>>,
    locals: HashMap<ExprId, usize>,
    output: Rc<RefCell<dyn Output>>,
}

impl<'a> Interpreter<'a> {
    /// Creates a new Interpreter printing to stdout, with native functions
    /// such as `clock` pre-defined.
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(StdoutOutput)))
    }

    /// Creates a new Interpreter with a caller-supplied output sink.
    pub fn with_output(output: Rc<RefCell<dyn Output>>) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();

                    Ok(Value::Number(timestamp))
                },
            },
        );

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Installs the resolver's distance table.  Tables from successive
    /// resolutions (one per REPL line) merge without collisions because
    /// expression ids are process-unique.
    pub fn add_locals(&mut self, locals: HashMap<ExprId, usize>) {
        debug!("Adding {} resolved local distances", locals.len());

        self.locals.extend(locals);
    }

    /// Interprets a list of statements (a "program").
    pub fn interpret(&mut self, statements: &[Stmt<'a>]) -> Result<(), RuntimeError> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(InterpretError::Fault(fault)) => return Err(fault),
                Err(InterpretError::ReturnSignal(_)) => {
                    unreachable!("return signal escaped all call frames")
                }
            }
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Executes a single statement.
    fn execute(&mut self, stmt: &Stmt<'a>) -> IResult<'a, ()> {
        match stmt {
            Stmt::Expression(expr) => {
                let _ = self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.output.borrow_mut().print(&value.to_string());

                debug!("Printed value: {}", value);

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {}", name.lexeme, value);

                self.environment.borrow_mut().define(name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(self.environment.clone());

                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // The current environment becomes the closure, so the body
                // sees every binding visible at the declaration site.
                let function =
                    LoxFunction::new(declaration.clone(), self.environment.clone(), false);
                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Err(InterpretError::ReturnSignal(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Executes `statements` inside `environment`, then restores the previous
    /// scope.  The caller's environment comes back on every path, including
    /// when a fault or a return signal is unwinding through here.
    fn execute_block(
        &mut self,
        statements: &[Stmt<'a>],
        environment: Rc<RefCell<Environment<'a>>>,
    ) -> IResult<'a, ()> {
        let previous = mem::replace(&mut self.environment, environment);

        let mut result: IResult<'a, ()> = Ok(());
        for stmt in statements {
            result = self.execute(stmt);
            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    /// Builds a class object and binds it in the current scope.
    fn execute_class(
        &mut self,
        name: &Token<'a>,
        superclass: Option<&SuperclassRef<'a>>,
        methods: &[Rc<FunctionDecl<'a>>],
    ) -> IResult<'a, ()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass_value: Option<Rc<LoxClass<'a>>> = match superclass {
            Some(clause) => {
                let value = self.look_up_variable(clause.name, clause.id)?;
                let Value::Class(class) = value else {
                    return Err(
                        RuntimeError::type_error(clause.name, "Superclass must be a class.").into(),
                    );
                };

                Some(class)
            }
            None => None,
        };

        // Two-step binding: the name exists (as nil) while the methods are
        // compiled, then the finished class is assigned over it.
        self.environment.borrow_mut().define(name.lexeme, Value::Nil);

        // Methods of a subclass close over one extra scope holding `super`.
        let method_closure: Rc<RefCell<Environment<'a>>> = match &superclass_value {
            Some(class) => {
                let mut environment = Environment::with_enclosing(self.environment.clone());
                environment.define("super", Value::Class(class.clone()));

                Rc::new(RefCell::new(environment))
            }
            None => self.environment.clone(),
        };

        let mut method_map: HashMap<String, Rc<LoxFunction<'a>>> = HashMap::new();
        for method in methods {
            let is_initializer: bool = method.name.lexeme == "init";
            let function = LoxFunction::new(method.clone(), method_closure.clone(), is_initializer);
            method_map.insert(method.name.lexeme.to_string(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.to_string(), superclass_value, method_map);
        self.environment
            .borrow_mut()
            .assign(name.lexeme, Value::Class(Rc::new(class)), name.line)?;

        info!("Class '{}' defined", name.lexeme);

        Ok(())
    }

    /// Reads a binding: at the resolved distance when the table has one,
    /// otherwise from the global scope.
    fn look_up_variable(&self, name: &Token<'_>, id: ExprId) -> IResult<'a, Value<'a>> {
        if let Some(&distance) = self.locals.get(&id) {
            Ok(Environment::get_at(&self.environment, distance, name.lexeme))
        } else {
            Ok(self.globals.borrow().get(name.lexeme, name.line)?)
        }
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr<'a>) -> IResult<'a, Value<'a>> {
        let value: Value<'a> = match expr {
            Expr::Literal(literal) => literal_value(literal),

            Expr::Grouping(inner) => self.evaluate(inner)?,

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right)?,

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right)?,

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right)?,

            Expr::Variable { id, name } => self.look_up_variable(name, *id)?,

            Expr::Assign {
                id,
                name,
                value: rhs,
            } => {
                let value = self.evaluate(rhs)?;

                debug!("Assigning {} to '{}'", value, name.lexeme);

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(
                            &self.environment,
                            distance,
                            name.lexeme,
                            value.clone(),
                        );
                    }
                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(name.lexeme, value.clone(), name.line)?;
                    }
                }

                value
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments)?,

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;

                let Value::Instance(instance) = object else {
                    return Err(
                        RuntimeError::type_error(name, "Only instances have properties.").into(),
                    );
                };

                LoxInstance::get(&instance, name)?
            }

            Expr::Set {
                object,
                name,
                value: rhs,
            } => {
                // The object is evaluated (and vetted) before the value.
                let object = self.evaluate(object)?;

                let Value::Instance(instance) = object else {
                    return Err(
                        RuntimeError::type_error(name, "Only instances have fields.").into(),
                    );
                };

                let value = self.evaluate(rhs)?;
                instance.set(name, value.clone());

                value
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id)?,

            Expr::Super { id, method, .. } => self.evaluate_super(*id, method)?,
        };

        Ok(value)
    }

    /// Evaluates a unary expression.
    fn evaluate_unary(&mut self, operator: &Token<'_>, right: &Expr<'a>) -> IResult<'a, Value<'a>> {
        let right: Value<'a> = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => {
                if let Value::Number(n) = right {
                    Ok(Value::Number(-n))
                } else {
                    Err(RuntimeError::type_error(operator, "Operand must be a number").into())
                }
            }
            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),
            _ => unreachable!("parser produced a non-unary operator"),
        }
    }

    /// Evaluates a binary expression.  Both operands evaluate (left first)
    /// before the operator is applied.
    fn evaluate_binary(
        &mut self,
        left: &Expr<'a>,
        operator: &Token<'_>,
        right: &Expr<'a>,
    ) -> IResult<'a, Value<'a>> {
        let left: Value<'a> = self.evaluate(left)?;
        let right: Value<'a> = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                // String on the left coerces a numeric right operand; the
                // reverse stays an error.
                (Value::String(a), Value::Number(b)) => {
                    Ok(Value::String(format!("{}{}", a, Value::Number(b))))
                }
                _ => Err(RuntimeError::type_error(
                    operator,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },
            TokenType::MINUS => {
                let (a, b) = check_number_operands(operator, &left, &right)?;

                Ok(Value::Number(a - b))
            }
            TokenType::STAR => {
                let (a, b) = check_number_operands(operator, &left, &right)?;

                Ok(Value::Number(a * b))
            }
            TokenType::SLASH => {
                let (a, b) = check_number_operands(operator, &left, &right)?;

                if b == 0.0 {
                    Err(
                        RuntimeError::type_error(operator, "Right operand must not be zero.")
                            .into(),
                    )
                } else {
                    Ok(Value::Number(a / b))
                }
            }
            TokenType::GREATER => {
                let (a, b) = check_number_operands(operator, &left, &right)?;

                Ok(Value::Bool(a > b))
            }
            TokenType::GREATER_EQUAL => {
                let (a, b) = check_number_operands(operator, &left, &right)?;

                Ok(Value::Bool(a >= b))
            }
            TokenType::LESS => {
                let (a, b) = check_number_operands(operator, &left, &right)?;

                Ok(Value::Bool(a < b))
            }
            TokenType::LESS_EQUAL => {
                let (a, b) = check_number_operands(operator, &left, &right)?;

                Ok(Value::Bool(a <= b))
            }
            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left, &right))),
            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left, &right))),
            _ => unreachable!("parser produced a non-binary operator"),
        }
    }

    /// Evaluates `and` / `or`.  The right operand only evaluates when the
    /// left one does not decide the result; either way the operand value
    /// itself comes back, not a coerced boolean.
    fn evaluate_logical(
        &mut self,
        left: &Expr<'a>,
        operator: &Token<'_>,
        right: &Expr<'a>,
    ) -> IResult<'a, Value<'a>> {
        let left: Value<'a> = self.evaluate(left)?;

        if operator.token_type == TokenType::OR {
            if is_truthy(&left) {
                return Ok(left);
            }
        } else if !is_truthy(&left) {
            return Ok(left);
        }

        self.evaluate(right)
    }

    /// Evaluates a call expression: callee first, then the arguments left to
    /// right, then the dispatch on what the callee turned out to be.
    fn evaluate_call(
        &mut self,
        callee: &Expr<'a>,
        paren: &Token<'_>,
        arguments: &[Expr<'a>],
    ) -> IResult<'a, Value<'a>> {
        let callee: Value<'a> = self.evaluate(callee)?;

        let mut argument_values: Vec<Value<'a>> = Vec::with_capacity(arguments.len());
        for argument in arguments {
            argument_values.push(self.evaluate(argument)?);
        }

        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                check_arity(arity, argument_values.len(), paren)?;

                match func(&argument_values) {
                    Ok(value) => Ok(value),
                    Err(message) => Err(RuntimeError::type_error(paren, message).into()),
                }
            }

            Value::Function(function) => {
                check_arity(function.arity(), argument_values.len(), paren)?;

                self.call_function(&function, argument_values)
            }

            Value::Class(class) => {
                check_arity(class.arity(), argument_values.len(), paren)?;

                self.instantiate(&class, argument_values)
            }

            _ => {
                Err(RuntimeError::type_error(paren, "Can only call functions and classes.").into())
            }
        }
    }

    /// Calls a user-defined function: parameters bind in a fresh scope whose
    /// parent is the function's closure, never the caller's scope.
    fn call_function(
        &mut self,
        function: &LoxFunction<'a>,
        arguments: Vec<Value<'a>>,
    ) -> IResult<'a, Value<'a>> {
        debug!("Calling function '{}'", function.declaration.name.lexeme);

        let mut environment = Environment::with_enclosing(function.closure.clone());
        for (param, argument) in function.declaration.params.iter().zip(arguments) {
            environment.define(param.lexeme, argument);
        }

        let result = self.execute_block(
            &function.declaration.body,
            Rc::new(RefCell::new(environment)),
        );

        match result {
            Ok(()) => {
                if function.is_initializer {
                    Ok(Environment::get_at(&function.closure, 0, "this"))
                } else {
                    Ok(Value::Nil)
                }
            }
            Err(InterpretError::ReturnSignal(value)) => {
                // A bare `return` inside `init` still hands back the instance.
                if function.is_initializer {
                    Ok(Environment::get_at(&function.closure, 0, "this"))
                } else {
                    Ok(value)
                }
            }
            Err(fault) => Err(fault),
        }
    }

    /// Instantiates a class: fresh instance, then `init` runs bound to it
    /// when the class has one.
    fn instantiate(
        &mut self,
        class: &Rc<LoxClass<'a>>,
        arguments: Vec<Value<'a>>,
    ) -> IResult<'a, Value<'a>> {
        debug!("Instantiating class '{}'", class.name);

        let instance = Rc::new(LoxInstance::new(class.clone()));

        if let Some(initializer) = class.find_method("init") {
            let bound = initializer.bind(&instance);
            self.call_function(&bound, arguments)?;
        }

        Ok(Value::Instance(instance))
    }

    /// Evaluates `super.method`: the superclass sits at the resolved
    /// distance, `this` one scope closer, and the found method binds to the
    /// current instance rather than to the superclass.
    fn evaluate_super(&mut self, id: ExprId, method: &Token<'_>) -> IResult<'a, Value<'a>> {
        let distance: usize = self
            .locals
            .get(&id)
            .copied()
            .expect("'super' reached evaluation without a resolved distance");

        let Value::Class(superclass) = Environment::get_at(&self.environment, distance, "super")
        else {
            unreachable!("'super' is bound to a non-class value");
        };

        let Value::Instance(object) = Environment::get_at(&self.environment, distance - 1, "this")
        else {
            unreachable!("no 'this' beneath a 'super' binding");
        };

        match superclass.find_method(method.lexeme) {
            Some(found) => Ok(Value::Function(Rc::new(found.bind(&object)))),
            None => Err(RuntimeError::undefined_property(method).into()),
        }
    }
}

/// Builds the runtime value for a literal node.
fn literal_value<'a>(literal: &LiteralValue) -> Value<'a> {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// `nil` and `false` are falsy; every other value, including `0` and `""`,
/// is truthy.
fn is_truthy(value: &Value<'_>) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

fn is_equal<'a>(left: &Value<'a>, right: &Value<'a>) -> bool {
    left == right
}

fn check_number_operands(
    operator: &Token<'_>,
    left: &Value<'_>,
    right: &Value<'_>,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::type_error(operator, "Operands must be numbers")),
    }
}

fn check_arity(expected: usize, actual: usize, paren: &Token<'_>) -> Result<(), RuntimeError> {
    if actual != expected {
        return Err(RuntimeError::arity(paren, expected, actual));
    }

    Ok(())
}
