//! Runtime values: the small immutable kinds plus the three heap-shared
//! callable/instance kinds (`LoxFunction`, `LoxClass`, `LoxInstance`).
//!
//! Functions, classes, and instances compare by identity (`Rc::ptr_eq`), so
//! cloning a `Value` clones a handle, never the object behind it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::token::Token;

#[derive(Debug, Clone)]
pub enum Value<'a> {
    NativeFunction {
        name: String,
        arity: usize,
        func: fn(&[Value<'a>]) -> Result<Value<'a>, String>,
    },
    Function(Rc<LoxFunction<'a>>),
    Class(Rc<LoxClass<'a>>),
    Instance(Rc<LoxInstance<'a>>),
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl<'a> PartialEq for Value<'a> {
    /// Lox `==`: `nil` equals only `nil`, numbers/strings/bools compare by
    /// value, everything callable or instance-shaped compares by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::NativeFunction { name: a, .. }, Value::NativeFunction { name: b, .. }) => {
                a == b
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<'a> fmt::Display for Value<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(function) => {
                write!(f, "<fn {}>", function.declaration.name.lexeme)
            }

            Value::Class(class) => write!(f, "{}", class.name),

            Value::Instance(instance) => write!(f, "{} instance", instance.class.name),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Nil => write!(f, "nil"),
        }
    }
}

/// A user-declared function or method: the shared declaration plus the
/// environment it closed over.
pub struct LoxFunction<'a> {
    pub declaration: Rc<FunctionDecl<'a>>,
    pub closure: Rc<RefCell<Environment<'a>>>,
    pub is_initializer: bool,
}

impl<'a> LoxFunction<'a> {
    pub fn new(
        declaration: Rc<FunctionDecl<'a>>,
        closure: Rc<RefCell<Environment<'a>>>,
        is_initializer: bool,
    ) -> Self {
        LoxFunction {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy whose closure is a one-entry scope binding `this` to
    /// `instance`, wrapped around the original closure.  Each property
    /// access that finds a method binds anew, so two bound copies of the
    /// same method are distinct values.
    pub fn bind(&self, instance: &Rc<LoxInstance<'a>>) -> LoxFunction<'a> {
        let mut environment = Environment::with_enclosing(self.closure.clone());
        environment.define("this", Value::Instance(instance.clone()));

        LoxFunction {
            declaration: self.declaration.clone(),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }
}

// `closure` would recurse back into this function, so Debug stays shallow.
impl<'a> fmt::Debug for LoxFunction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.declaration.name.lexeme)
    }
}

/// A class object: methods by name plus the optional superclass, fixed at
/// declaration time.
pub struct LoxClass<'a> {
    pub name: String,
    pub superclass: Option<Rc<LoxClass<'a>>>,
    methods: HashMap<String, Rc<LoxFunction<'a>>>,
}

impl<'a> LoxClass<'a> {
    pub fn new(
        name: String,
        superclass: Option<Rc<LoxClass<'a>>>,
        methods: HashMap<String, Rc<LoxFunction<'a>>>,
    ) -> Self {
        LoxClass {
            name,
            superclass,
            methods,
        }
    }

    /// Own methods first, then the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction<'a>>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Calling a class takes as many arguments as its `init` (possibly
    /// inherited), or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

impl<'a> fmt::Debug for LoxClass<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.name)
    }
}

/// An instance: a handle to its class plus its own mutable field table.
/// Fields live behind a `RefCell` because every alias of the instance sees
/// writes through any other alias.
pub struct LoxInstance<'a> {
    pub class: Rc<LoxClass<'a>>,
    fields: RefCell<HashMap<String, Value<'a>>>,
}

impl<'a> LoxInstance<'a> {
    pub fn new(class: Rc<LoxClass<'a>>) -> Self {
        LoxInstance {
            class,
            fields: RefCell::new(HashMap::new()),
        }
    }

    /// Property read: fields shadow methods; a found method is bound to the
    /// instance on the way out.
    pub fn get(
        instance: &Rc<LoxInstance<'a>>,
        name: &Token<'_>,
    ) -> Result<Value<'a>, RuntimeError> {
        if let Some(value) = instance.fields.borrow().get(name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = instance.class.find_method(name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(instance))));
        }

        Err(RuntimeError::undefined_property(name))
    }

    /// Property write: unconditionally creates or overwrites the field.
    pub fn set(&self, name: &Token<'_>, value: Value<'a>) {
        self.fields.borrow_mut().insert(name.lexeme.to_string(), value);
    }
}

impl<'a> fmt::Debug for LoxInstance<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
