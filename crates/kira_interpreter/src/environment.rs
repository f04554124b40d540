use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::builtin::Builtin;
use crate::error::RuntimeError;
use crate::object::Object;

#[derive(Debug)]
struct Binding {
    value: Rc<Object>,
    mutable: bool,
}

/// One frame in the scope chain. Lookups and assignments walk outward
/// through `outer`; definitions always land in the current frame.
#[derive(Debug)]
pub struct Environment {
    store: HashMap<String, Binding>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            store: HashMap::new(),
            outer: None,
        }
    }

    /// Create a new environment that is enclosed by a given outer environment
    pub fn new_enclosed(outer: Rc<RefCell<Environment>>) -> Self {
        Environment {
            store: HashMap::new(),
            outer: Some(outer),
        }
    }

    /// Create the top-level environment for a program: a fresh frame whose
    /// parent is a sealed root holding every builtin as a const binding.
    pub fn new_global() -> Rc<RefCell<Environment>> {
        let mut root = Environment::new();
        for builtin in Builtin::ALL {
            root.store.insert(
                builtin.name().to_string(),
                Binding {
                    value: Rc::new(Object::Builtin(builtin)),
                    mutable: false,
                },
            );
        }

        Rc::new(RefCell::new(Environment::new_enclosed(Rc::new(
            RefCell::new(root),
        ))))
    }

    pub fn get(&self, name: &str) -> Option<Rc<Object>> {
        match self.store.get(name) {
            Some(binding) => Some(Rc::clone(&binding.value)),
            // If not found in this environment, look for it in the outer environment
            None => match self.outer {
                Some(ref outer) => outer.borrow().get(name),
                None => None,
            },
        }
    }

    /// Create a binding in the current frame. Shadowing an outer binding is
    /// fine; a second definition in the same frame is not.
    pub fn define(&mut self, name: &str, value: Rc<Object>, mutable: bool) -> Result<(), RuntimeError> {
        if self.store.contains_key(name) {
            return Err(RuntimeError::name_error(format!(
                "'{}' is already defined",
                name
            )));
        }

        self.store.insert(name.to_string(), Binding { value, mutable });
        Ok(())
    }

    /// Bind without the duplicate check, overwriting any existing binding in
    /// the current frame. Used for function parameters and loop variables,
    /// which land in frames of their own.
    pub fn bind(&mut self, name: &str, value: Rc<Object>) {
        self.store.insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
            },
        );
    }

    /// Update an existing binding, walking the chain to the defining frame.
    /// Assignment never creates bindings; only `let`/`const` do.
    pub fn assign(&mut self, name: &str, value: Rc<Object>) -> Result<(), RuntimeError> {
        match self.store.get_mut(name) {
            Some(binding) => {
                if !binding.mutable {
                    return Err(RuntimeError::const_error(format!(
                        "cannot reassign constant '{}'",
                        name
                    )));
                }
                binding.value = value;
                Ok(())
            }
            None => match self.outer {
                Some(ref outer) => outer.borrow_mut().assign(name, value),
                None => Err(RuntimeError::name_error(format!(
                    "undefined variable '{}'",
                    name
                ))),
            },
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}
