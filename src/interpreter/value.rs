use crate::stack::ensure_sufficient_stack;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

pub type Array = Rc<RefCell<Elements>>;

type ArrayPtr = *const RefCell<Elements>;

/// Backing storage of an array. Nested arrays are freed with a worklist
/// instead of recursive drops, so arbitrarily deep nesting can't overflow the stack.
#[derive(Debug, Default)]
pub struct Elements(Vec<Value>);

impl Deref for Elements {
    type Target = Vec<Value>;

    fn deref(&self) -> &Vec<Value> {
        &self.0
    }
}

impl DerefMut for Elements {
    fn deref_mut(&mut self) -> &mut Vec<Value> {
        &mut self.0
    }
}

impl Drop for Elements {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.0);
        while let Some(value) = pending.pop() {
            // only the last handle owns the children; shared arrays are just released
            if let Value::Array(handle) = value {
                if let Ok(cell) = Rc::try_unwrap(handle) {
                    let mut children = cell.into_inner();
                    pending.append(&mut children.0);
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Num(f64),
    Str(Rc<str>),
    Bool(bool),
    // a handle: cloning the Value shares the underlying vector
    Array(Array),
    Null,
}

impl Value {
    pub fn new_array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(Elements(elements))))
    }

    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Array(_) => "array",
            Value::Null => "null",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) => true,
        }
    }

    /// Numeric view used by the relational operators.
    pub fn coerce_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            Value::Array(_) | Value::Null => None,
        }
    }

    /// Integer view of a number, if it has no fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Num(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    fn write_text(&self, f: &mut fmt::Formatter<'_>, open: &mut HashSet<ArrayPtr>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{}", format_num(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Array(elements) => {
                let ptr = Rc::as_ptr(elements);
                if !open.insert(ptr) {
                    return write!(f, "[...]");
                }
                write!(f, "[")?;
                for (i, val) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    ensure_sufficient_stack(|| val.write_text(f, open))?;
                }
                open.remove(&ptr);
                write!(f, "]")
            }
        }
    }

    // Pairs of arrays already being compared count as equal, so cycles terminate.
    fn eq_inner(&self, other: &Self, comparing: &mut HashSet<(ArrayPtr, ArrayPtr)>) -> bool {
        match (self, other) {
            (Self::Str(s1), Self::Str(s2)) => s1 == s2,
            (Self::Num(n1), Self::Num(n2)) => n1 == n2,
            (Self::Bool(b1), Self::Bool(b2)) => b1 == b2,
            (Self::Null, Self::Null) => true,
            (Self::Array(a1), Self::Array(a2)) => {
                if Rc::ptr_eq(a1, a2) {
                    return true;
                }
                let pair = (Rc::as_ptr(a1), Rc::as_ptr(a2));
                let (e1, e2) = (a1.borrow(), a2.borrow());
                if e1.len() != e2.len() {
                    return false;
                }
                if !comparing.insert(pair) {
                    return true;
                }
                let mut equal = true;
                for (v1, v2) in e1.iter().zip(e2.iter()) {
                    if !ensure_sufficient_stack(|| v1.eq_inner(v2, comparing)) {
                        equal = false;
                        break;
                    }
                }
                comparing.remove(&pair);
                equal
            }
            (_, _) => false,
        }
    }
}

// minimal decimal form: integral values print without ".0", and -0 prints as 0
pub fn format_num(n: f64) -> String {
    if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_inner(other, &mut HashSet::new())
    }
}

/// The value-to-text rule used by `print`, `join` and string concatenation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f, &mut HashSet::new())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}
