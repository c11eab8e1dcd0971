use crate::interpreter::value::Value;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct Binding {
    pub name: Rc<str>,
    pub value: Value,
}

// Most functions have ≤4 params and locals, so inline storage avoids a heap alloc
type Bindings = SmallVec<[Binding; 4]>;

/// One scope record. Lookups walk the `enclosing` chain outward; a function-call environment
/// encloses the global environment directly.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    enclosing: Option<Rc<Environment>>,
    values: RefCell<Bindings>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_enclosing(enclosing: Rc<Environment>) -> Self {
        Self {
            enclosing: Some(enclosing),
            values: RefCell::new(SmallVec::new()),
        }
    }

    /// Create a function-call environment pre-populated with arguments.
    pub fn new_for_call(enclosing: Rc<Environment>, params: &[String], args: Vec<Value>) -> Self {
        let env = Self::new_with_enclosing(enclosing);
        for (name, value) in params.iter().zip(args) {
            env.define(name, value);
        }
        env
    }

    /// Binds `name` in this scope, replacing an existing binding of the same name.
    pub fn define(&self, name: &str, value: Value) {
        let mut values = self.values.borrow_mut();
        match values.iter_mut().find(|b| b.name.as_ref() == name) {
            Some(binding) => binding.value = value,
            None => values.push(Binding {
                name: Rc::from(name),
                value,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let local = self
            .values
            .borrow()
            .iter()
            .find(|b| b.name.as_ref() == name)
            .map(|b| b.value.clone());

        match (local, &self.enclosing) {
            (Some(value), _) => Some(value),
            (None, Some(enclosing)) => enclosing.get(name),
            (None, None) => None,
        }
    }

    /// Updates the nearest binding of `name`. Returns false if no scope in the chain has it.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        {
            let mut values = self.values.borrow_mut();
            if let Some(binding) = values.iter_mut().find(|b| b.name.as_ref() == name) {
                binding.value = value;
                return true;
            }
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.assign(name, value),
            None => false,
        }
    }

    /// Assignment with the permissive policy: an unknown name is created in this scope.
    pub fn assign_or_define(&self, name: &str, value: Value) {
        if self.contains(name) {
            self.assign(name, value);
        } else {
            self.define(name, value);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.borrow().iter().any(|b| b.name.as_ref() == name)
            || self
                .enclosing
                .as_ref()
                .is_some_and(|enclosing| enclosing.contains(name))
    }

    pub fn current_scope_len(&self) -> usize {
        self.values.borrow().len()
    }
}
