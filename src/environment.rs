use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::rc::Rc;

use thiserror::Error;

use crate::prelude::*;

/// A name's current value and the type it was declared with.
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub declared: TypeTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("'{0}' is not defined")]
    Undefined(String),
    #[error("'{0}' is already defined in this scope")]
    AlreadyDeclared(String),
    #[error("'{name}' was declared as {previous}, cannot redeclare it as {requested}")]
    Redeclared { name: String, previous: TypeTag, requested: TypeTag },
    #[error("cannot convert {found} to {expected}")]
    Incompatible { expected: TypeTag, found: TypeTag },
}

/// One scope frame. Bindings keep their insertion order so namespaces print
/// their members in the order they were defined.
#[derive(Default)]
pub struct Environment {
    pub enclosing: Option<Rc<RefCell<Environment>>>,
    slots: Vec<(String, Binding)>,
    index: HashMap<String, usize>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(self, enclosing: Rc<RefCell<Environment>>) -> Self {
        Self { enclosing: Some(enclosing), ..self }
    }

    pub fn as_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    /// Add a typed binding to this frame. The name must not already be bound
    /// here; shadowing a binding from an enclosing frame is fine.
    pub fn declare(&mut self, name: &str, value: Value, declared: TypeTag) -> Result<(), EnvError> {
        if let Some(existing) = self.local(name) {
            return Err(if existing.declared == declared {
                EnvError::AlreadyDeclared(name.to_owned())
            } else {
                EnvError::Redeclared {
                    name: name.to_owned(),
                    previous: existing.declared,
                    requested: declared,
                }
            });
        }

        check(declared, &value)?;
        self.insert(name, Binding { value, declared });
        Ok(())
    }

    /// Bind or rebind `name` in this frame, typed by the value itself.
    pub fn define(&mut self, name: &str, value: Value) {
        let declared = value.type_tag();
        self.insert(name, Binding { value, declared });
    }

    /// Update the nearest existing binding for `name`, wherever in the chain
    /// it lives.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), EnvError> {
        if let Some(slot) = self.index.get(name).copied() {
            let binding = &mut self.slots[slot].1;
            check(binding.declared, &value)?;
            binding.value = value;
            return Ok(());
        }

        // Ask one level above if possible
        match self.enclosing {
            Some(ref e) => e.borrow_mut().assign(name, value),
            None => Err(EnvError::Undefined(name.to_owned())),
        }
    }

    /// Insert-or-overwrite in this frame only. An existing binding keeps its
    /// declared type.
    pub fn set_local(&mut self, name: &str, value: Value) -> Result<(), EnvError> {
        if let Some(slot) = self.index.get(name).copied() {
            let binding = &mut self.slots[slot].1;
            check(binding.declared, &value)?;
            binding.value = value;
        } else {
            self.define(name, value);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Value, EnvError> {
        if let Some(binding) = self.local(name) {
            return Ok(binding.value.clone());
        }

        // Ask one level above if possible
        match self.enclosing {
            Some(ref e) => e.borrow().get(name),
            None => Err(EnvError::Undefined(name.to_owned())),
        }
    }

    pub fn get_local(&self, name: &str) -> Option<Binding> {
        self.local(name).cloned()
    }

    /// This frame's bindings in definition order.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        self.slots.iter().map(|(name, binding)| (name.clone(), binding.value.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn local(&self, name: &str) -> Option<&Binding> {
        self.index.get(name).and_then(|&slot| self.slots.get(slot)).map(|(_, binding)| binding)
    }

    fn insert(&mut self, name: &str, binding: Binding) {
        match self.index.get(name).copied() {
            Some(slot) => self.slots[slot].1 = binding,
            None => {
                self.index.insert(name.to_owned(), self.slots.len());
                self.slots.push((name.to_owned(), binding));
            }
        }
    }
}

fn check(expected: TypeTag, value: &Value) -> Result<(), EnvError> {
    if expected.accepts(value) {
        Ok(())
    } else {
        Err(EnvError::Incompatible { expected, found: value.type_tag() })
    }
}

// Values can point back at the frame that holds them (closures, namespaces),
// so only names are printed.
impl Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.slots.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("enclosed", &self.enclosing.is_some())
            .finish()
    }
}
