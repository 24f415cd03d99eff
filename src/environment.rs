use crate::error::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One lexical scope: name → value bindings plus an optional link to the
/// enclosing scope.  Scopes are shared through `Rc<RefCell<..>>` handles
/// because closures, bound methods, and active call frames may all alias
/// the same ancestor.
#[derive(Debug)]
pub struct Environment<'a> {
    values: HashMap<String, Value<'a>>,
    enclosing: Option<Rc<RefCell<Environment<'a>>>>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'a>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Bind (or rebind) `name` in this scope.  Redefinition is legal at the
    /// global level; blocks are policed by the resolver instead.
    pub fn define(&mut self, name: &str, value: Value<'a>) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup walking the chain outwards.  Only used for names the
    /// resolver left unresolved, i.e. globals.
    pub fn get(&self, name: &str, line: usize) -> Result<Value<'a>, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(RuntimeError::undefined_variable(name, line))
        }
    }

    /// Dynamic assignment walking the chain outwards.  Never creates a
    /// binding; assignment to an unbound name is a fault.
    pub fn assign(&mut self, name: &str, value: Value<'a>, line: usize) -> Result<(), RuntimeError> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(RuntimeError::undefined_variable(name, line))
        }
    }

    /// Walk exactly `distance` enclosing links.  Distances come from the
    /// resolver; running past the global scope means the resolution table
    /// and the environment chain disagree, which is a driver bug.
    fn ancestor(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
    ) -> Rc<RefCell<Environment<'a>>> {
        let mut current = env.clone();

        for _ in 0..distance {
            let next = current
                .borrow()
                .enclosing
                .as_ref()
                .expect("No enclosing environment?")
                .clone();

            current = next;
        }

        current
    }

    /// Read `name` in the scope exactly `distance` hops out.  A missing
    /// entry reads as `nil` rather than a fault; the resolver only emits
    /// distances for names it saw declared.
    pub fn get_at(env: &Rc<RefCell<Environment<'a>>>, distance: usize, name: &str) -> Value<'a> {
        Self::ancestor(env, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .unwrap_or(Value::Nil)
    }

    /// Write `name` in the scope exactly `distance` hops out.
    pub fn assign_at(
        env: &Rc<RefCell<Environment<'a>>>,
        distance: usize,
        name: &str,
        value: Value<'a>,
    ) {
        Self::ancestor(env, distance)
            .borrow_mut()
            .values
            .insert(name.to_string(), value);
    }
}
