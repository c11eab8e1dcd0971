//! The built-in library: a fixed, process-wide table of native functions.
//!
//! Entries are plain function pointers, so the table is an immutable `static` that any number
//! of interpreters can share. Built-ins are resolved before user functions at every call site,
//! and the parser refuses user declarations that reuse one of these names.

use super::value::{Array, Value};
use super::{RuntimeError, RuntimeErrorKind};
use std::fmt;

/// Lines produced by `print` during one run.
pub type Output = Vec<String>;

pub type NativeFn = fn(&[Value], &mut Output) -> Result<Value, RuntimeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    Variadic,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(1) => write!(f, "1 argument"),
            Arity::Exact(n) => write!(f, "{} arguments", n),
            Arity::Range(min, max) => write!(f, "{} to {} arguments", min, max),
            Arity::Variadic => write!(f, "any number of arguments"),
        }
    }
}

#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: Arity,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn call(&self, args: &[Value], output: &mut Output) -> Result<Value, RuntimeError> {
        if !self.arity.accepts(args.len()) {
            return Err(RuntimeError::new(
                RuntimeErrorKind::ArgumentCountMismatch,
                format!(
                    "{} expects {}, but got {}",
                    self.name,
                    self.arity,
                    args.len()
                ),
            ));
        }
        (self.func)(args, output)
    }
}

pub static BUILTINS: &[NativeFunction] = &[
    native("print", Arity::Variadic, native_print),
    native("len", Arity::Exact(1), native_len),
    native("push", Arity::Exact(2), native_push),
    native("pop", Arity::Exact(1), native_pop),
    native("slice", Arity::Range(2, 3), native_slice),
    native("join", Arity::Exact(2), native_join),
    native("indexOf", Arity::Exact(2), native_index_of),
    native("trim", Arity::Exact(1), native_trim),
    native("toUpper", Arity::Exact(1), native_to_upper),
    native("toLower", Arity::Exact(1), native_to_lower),
    native("split", Arity::Exact(2), native_split),
    native("substring", Arity::Range(2, 3), native_substring),
    native("replace", Arity::Exact(3), native_replace),
    native("startsWith", Arity::Exact(2), native_starts_with),
    native("endsWith", Arity::Exact(2), native_ends_with),
    native("contains", Arity::Exact(2), native_contains),
];

const fn native(name: &'static str, arity: Arity, func: NativeFn) -> NativeFunction {
    NativeFunction { name, arity, func }
}

pub fn lookup(name: &str) -> Option<&'static NativeFunction> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

pub fn is_builtin(name: &str) -> bool {
    lookup(name).is_some()
}

// ── argument helpers ─────────────────────────────────────────────────────────

fn type_mismatch(function: &str, expected: &str, got: &Value) -> RuntimeError {
    RuntimeError::new(
        RuntimeErrorKind::TypeMismatch,
        format!("{} expects {}, got {}", function, expected, got.type_name()),
    )
}

fn array_arg<'a>(function: &str, args: &'a [Value], i: usize) -> Result<&'a Array, RuntimeError> {
    match &args[i] {
        Value::Array(elements) => Ok(elements),
        other => Err(type_mismatch(function, "an array", other)),
    }
}

fn str_arg<'a>(function: &str, args: &'a [Value], i: usize) -> Result<&'a str, RuntimeError> {
    match &args[i] {
        Value::Str(s) => Ok(s),
        other => Err(type_mismatch(function, "a string", other)),
    }
}

fn num_arg(function: &str, args: &[Value], i: usize) -> Result<f64, RuntimeError> {
    match &args[i] {
        Value::Num(n) => Ok(*n),
        other => Err(type_mismatch(function, "a number", other)),
    }
}

// truncates toward zero, then clamps into 0..=len
fn clamp_index(n: f64, len: usize) -> usize {
    if n.is_nan() || n <= 0.0 {
        0
    } else if n >= len as f64 {
        len
    } else {
        n.trunc() as usize
    }
}

// half-open [start, end) from the optional start/end arguments at `from`
fn clamped_range(
    function: &str,
    args: &[Value],
    from: usize,
    len: usize,
) -> Result<(usize, usize), RuntimeError> {
    let start = clamp_index(num_arg(function, args, from)?, len);
    let end = match args.get(from + 1) {
        Some(_) => clamp_index(num_arg(function, args, from + 1)?, len),
        None => len,
    };
    Ok((start, end.max(start)))
}

// ── output ───────────────────────────────────────────────────────────────────

fn native_print(args: &[Value], output: &mut Output) -> Result<Value, RuntimeError> {
    let line = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    output.push(line);
    Ok(Value::Null)
}

// ── arrays ───────────────────────────────────────────────────────────────────

fn native_len(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Array(elements) => Ok(Value::Num(elements.borrow().len() as f64)),
        Value::Str(s) => Ok(Value::Num(s.chars().count() as f64)),
        other => Err(type_mismatch("len", "an array or a string", other)),
    }
}

fn native_push(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let elements = array_arg("push", args, 0)?;
    elements.borrow_mut().push(args[1].clone());
    Ok(args[1].clone())
}

fn native_pop(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let elements = array_arg("pop", args, 0)?;
    let popped = elements.borrow_mut().pop();
    Ok(popped.unwrap_or(Value::Null))
}

fn native_slice(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let elements = array_arg("slice", args, 0)?.borrow();
    let (start, end) = clamped_range("slice", args, 1, elements.len())?;
    Ok(Value::new_array(elements[start..end].to_vec()))
}

fn native_join(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let elements = array_arg("join", args, 0)?;
    let separator = str_arg("join", args, 1)?;
    let joined = elements
        .borrow()
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(separator);
    Ok(Value::from(joined))
}

fn native_index_of(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let elements = array_arg("indexOf", args, 0)?;
    let position = elements.borrow().iter().position(|e| *e == args[1]);
    Ok(Value::Num(position.map_or(-1.0, |i| i as f64)))
}

// ── strings ──────────────────────────────────────────────────────────────────

fn native_trim(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    Ok(Value::str(str_arg("trim", args, 0)?.trim()))
}

fn native_to_upper(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    Ok(Value::from(str_arg("toUpper", args, 0)?.to_uppercase()))
}

fn native_to_lower(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    Ok(Value::from(str_arg("toLower", args, 0)?.to_lowercase()))
}

fn native_split(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let s = str_arg("split", args, 0)?;
    let separator = str_arg("split", args, 1)?;

    let parts: Vec<Value> = if separator.is_empty() {
        s.chars().map(|c| Value::from(c.to_string())).collect()
    } else {
        s.split(separator).map(Value::str).collect()
    };

    Ok(Value::new_array(parts))
}

fn native_substring(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let chars: Vec<char> = str_arg("substring", args, 0)?.chars().collect();
    let (start, end) = clamped_range("substring", args, 1, chars.len())?;
    Ok(Value::from(chars[start..end].iter().collect::<String>()))
}

fn native_replace(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let s = str_arg("replace", args, 0)?;
    let search = str_arg("replace", args, 1)?;
    let replacement = str_arg("replace", args, 2)?;

    if search.is_empty() {
        return Ok(args[0].clone());
    }
    Ok(Value::from(s.replace(search, replacement)))
}

fn native_starts_with(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let s = str_arg("startsWith", args, 0)?;
    Ok(Value::Bool(s.starts_with(str_arg("startsWith", args, 1)?)))
}

fn native_ends_with(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let s = str_arg("endsWith", args, 0)?;
    Ok(Value::Bool(s.ends_with(str_arg("endsWith", args, 1)?)))
}

fn native_contains(args: &[Value], _output: &mut Output) -> Result<Value, RuntimeError> {
    let s = str_arg("contains", args, 0)?;
    Ok(Value::Bool(s.contains(str_arg("contains", args, 1)?)))
}
