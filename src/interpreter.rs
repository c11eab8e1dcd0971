pub mod environment;
pub mod native_function;
pub mod value;

use crate::config::RuntimeConfig;
use crate::interpreter::environment::Environment;
use crate::interpreter::native_function::Output;
use crate::interpreter::value::Value;
use crate::parser::ast::{BinaryOp, Expr, ExprKind, Function, Program, Stmt, StmtKind, UnaryOp};
use crate::span::Span;
use crate::stack::ensure_sufficient_stack;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    UndefinedVariable,
    UndefinedFunction,
    ArgumentCountMismatch,
    TypeMismatch,
    IndexOutOfRange,
    StackOverflow,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuntimeErrorKind::UndefinedVariable => "UndefinedVariable",
            RuntimeErrorKind::UndefinedFunction => "UndefinedFunction",
            RuntimeErrorKind::ArgumentCountMismatch => "ArgumentCountMismatch",
            RuntimeErrorKind::TypeMismatch => "TypeMismatch",
            RuntimeErrorKind::IndexOutOfRange => "IndexOutOfRange",
            RuntimeErrorKind::StackOverflow => "StackOverflow",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub span: Span,
}

impl RuntimeError {
    /// An error without a location yet; the call site fills it in with [`RuntimeError::or_at`].
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Self::at(kind, Span::default(), message)
    }

    pub fn at(kind: RuntimeErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    fn or_at(mut self, span: Span) -> Self {
        if self.span == Span::default() {
            self.span = span;
        }
        self
    }
}

// NOT public: `return` is the only non-local exit, and it never escapes a call.
#[derive(Debug, Clone)]
enum ControlFlow {
    Normal,
    Return(Value),
}

// Stop the current statement list if a `return` went off inside it
macro_rules! prop {
    ($expr:expr) => {
        if let ControlFlow::Return(v) = $expr? {
            return Ok(ControlFlow::Return(v));
        }
    };
}

/// Tree-walking evaluator for one run. Function declarations are borrowed from the
/// [`Program`], so the interpreter can't outlive it.
pub struct Interpreter<'p> {
    functions: HashMap<&'p str, &'p Function>,
    globals: Rc<Environment>,
    // innermost environment: `globals` at top level, the call environment inside a function
    env: Rc<Environment>,
    output: Output,
    depth: usize,
    runtime_config: RuntimeConfig,
}

impl<'p> Interpreter<'p> {
    pub fn new(runtime_config: RuntimeConfig) -> Self {
        let globals = Rc::new(Environment::new());
        Self {
            functions: HashMap::new(),
            env: Rc::clone(&globals),
            globals,
            output: Vec::new(),
            depth: 0,
            runtime_config,
        }
    }

    /// Lines printed so far. Still valid after `interpret` failed.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn into_output(self) -> Output {
        self.output
    }

    pub fn interpret(&mut self, program: &'p Program) -> Result<(), RuntimeError> {
        // later declarations replace earlier ones
        for function in program.functions() {
            self.functions.insert(function.name.as_str(), function);
        }
        tracing::debug!(functions = self.functions.len(), "registered functions");

        if let Some(main) = self.functions.get("main").copied() {
            tracing::debug!("entering main");
            self.call_function(main, Vec::new(), main.span)?;
            return Ok(());
        }

        tracing::debug!("no main, running top-level statements");
        for stmt in program.statements() {
            if let ControlFlow::Return(_) = self.execute(stmt)? {
                break;
            }
        }
        Ok(())
    }

    fn execute_block(&mut self, statements: &[Stmt]) -> Result<ControlFlow, RuntimeError> {
        for stmt in statements {
            prop!(self.execute(stmt));
        }
        Ok(ControlFlow::Normal)
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<ControlFlow, RuntimeError> {
        match &stmt.kind {
            StmtKind::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                self.env.define(name, value);
            }
            StmtKind::Assign { target, value } => {
                let value = self.evaluate(value)?;
                self.assign(target, value)?;
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute_block(then_branch);
                }
                if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }
            StmtKind::For {
                init,
                condition,
                step,
                body,
            } => {
                prop!(self.execute(init));
                while self.evaluate(condition)?.is_truthy() {
                    prop!(self.execute_block(body));
                    prop!(self.execute(step));
                }
            }
            StmtKind::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    prop!(self.execute_block(body));
                }
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                return Ok(ControlFlow::Return(value));
            }
            StmtKind::Expr(expr) => {
                self.evaluate(expr)?;
            }
            StmtKind::Block(statements) => return self.execute_block(statements),
        }
        Ok(ControlFlow::Normal)
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Result<(), RuntimeError> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                self.env.assign_or_define(name, value);
                Ok(())
            }
            ExprKind::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                match object {
                    Value::Array(elements) => {
                        let mut elements = elements.borrow_mut();
                        let i = checked_index(&index, elements.len(), target.span)?;
                        elements[i] = value;
                        Ok(())
                    }
                    other => Err(RuntimeError::at(
                        RuntimeErrorKind::TypeMismatch,
                        target.span,
                        format!("cannot assign by index into {}", other.type_name()),
                    )),
                }
            }
            // the parser only produces identifier and index targets
            _ => Err(RuntimeError::at(
                RuntimeErrorKind::TypeMismatch,
                target.span,
                "invalid assignment target",
            )),
        }
    }

    fn evaluate(&mut self, expression: &Expr) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| self.evaluate_expression(expression))
    }

    fn evaluate_expression(&mut self, expression: &Expr) -> Result<Value, RuntimeError> {
        match &expression.kind {
            // primary
            ExprKind::Num(n) => Ok(Value::Num(*n)),
            ExprKind::Str(s) => Ok(Value::str(s)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Array { elements } => {
                let mut array = Vec::with_capacity(elements.len());
                for element in elements {
                    array.push(self.evaluate(element)?);
                }
                Ok(Value::new_array(array))
            }
            ExprKind::Identifier(name) => self.env.get(name).ok_or_else(|| {
                RuntimeError::at(
                    RuntimeErrorKind::UndefinedVariable,
                    expression.span,
                    format!("undefined variable '{}'", name),
                )
            }),

            ExprKind::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                index_value(&object, &index, expression.span)
            }

            ExprKind::Call { callee, arguments } => {
                self.call(callee, arguments, expression.span)
            }

            // unary
            ExprKind::Unary { operator, operand } => {
                let operand_value = self.evaluate(operand)?;
                match (operator, operand_value) {
                    (UnaryOp::Negate, Value::Num(n)) => Ok(Value::Num(-n)),
                    (UnaryOp::Negate, v) => Err(RuntimeError::at(
                        RuntimeErrorKind::TypeMismatch,
                        expression.span,
                        format!("cannot negate {}", v.type_name()),
                    )),
                }
            }

            // binary
            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;
                let right_value = self.evaluate(right)?;
                binary(*operator, left_value, right_value, expression.span)
            }
        }
    }

    fn call(&mut self, callee: &str, arguments: &[Expr], span: Span) -> Result<Value, RuntimeError> {
        if let Some(native) = native_function::lookup(callee) {
            let args = self.evaluate_arguments(arguments)?;
            return native
                .call(&args, &mut self.output)
                .map_err(|e| e.or_at(span));
        }

        // resolve before evaluating arguments, so an unknown name has no side effects
        let function = self.functions.get(callee).copied().ok_or_else(|| {
            RuntimeError::at(
                RuntimeErrorKind::UndefinedFunction,
                span,
                format!("undefined function '{}'", callee),
            )
        })?;
        let args = self.evaluate_arguments(arguments)?;
        self.call_function(function, args, span)
    }

    fn evaluate_arguments(&mut self, arguments: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(arguments.len());
        for arg in arguments {
            values.push(self.evaluate(arg)?);
        }
        Ok(values)
    }

    fn call_function(
        &mut self,
        function: &'p Function,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if function.params.len() != args.len() {
            return Err(RuntimeError::at(
                RuntimeErrorKind::ArgumentCountMismatch,
                span,
                format!(
                    "function '{}' expects {} arguments, but got {}",
                    function.name,
                    function.params.len(),
                    args.len()
                ),
            ));
        }

        if self.depth >= self.runtime_config.max_call_depth {
            tracing::warn!(function = %function.name, depth = self.depth, "call depth limit reached");
            return Err(RuntimeError::at(
                RuntimeErrorKind::StackOverflow,
                span,
                format!(
                    "maximum call depth of {} exceeded calling '{}'",
                    self.runtime_config.max_call_depth, function.name
                ),
            ));
        }

        // no closures: a function body sees its own locals and the globals, nothing in between
        let call_env = Rc::new(Environment::new_for_call(
            Rc::clone(&self.globals),
            &function.params,
            args,
        ));
        let previous = std::mem::replace(&mut self.env, call_env);
        self.depth += 1;
        tracing::trace!(function = %function.name, depth = self.depth, "call");

        let result = ensure_sufficient_stack(|| self.execute_block(&function.body));

        self.depth -= 1;
        self.env = previous;

        match result? {
            ControlFlow::Return(v) => Ok(v),
            ControlFlow::Normal => Ok(Value::Null),
        }
    }
}

fn binary(op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value, RuntimeError> {
    let mismatch = |left: &Value, right: &Value| {
        RuntimeError::at(
            RuntimeErrorKind::TypeMismatch,
            span,
            format!(
                "cannot apply '{}' to {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ),
        )
    };

    match op {
        // string on either side turns '+' into concatenation
        BinaryOp::Add => match (&left, &right) {
            (Value::Num(n1), Value::Num(n2)) => Ok(Value::Num(n1 + n2)),
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::from(format!("{}{}", left, right))),
            _ => Err(mismatch(&left, &right)),
        },
        BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
            let (Value::Num(n1), Value::Num(n2)) = (&left, &right) else {
                return Err(mismatch(&left, &right));
            };
            Ok(Value::Num(match op {
                BinaryOp::Subtract => n1 - n2,
                BinaryOp::Multiply => n1 * n2,
                _ if *n2 == 0.0 => {
                    tracing::debug!(%span, "division by zero evaluates to 0");
                    0.0
                }
                _ => n1 / n2,
            }))
        }
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let (Some(n1), Some(n2)) = (left.coerce_num(), right.coerce_num()) else {
                return Err(mismatch(&left, &right));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Less => n1 < n2,
                BinaryOp::LessEqual => n1 <= n2,
                BinaryOp::Greater => n1 > n2,
                _ => n1 >= n2,
            }))
        }
    }
}

fn checked_index(index: &Value, len: usize, span: Span) -> Result<usize, RuntimeError> {
    let Value::Num(n) = index else {
        return Err(RuntimeError::at(
            RuntimeErrorKind::TypeMismatch,
            span,
            format!("index must be a number, got {}", index.type_name()),
        ));
    };
    let Some(i) = index.as_integer() else {
        return Err(RuntimeError::at(
            RuntimeErrorKind::TypeMismatch,
            span,
            format!("index must be an integer, got {}", index),
        ));
    };
    if i < 0 || i as usize >= len {
        return Err(RuntimeError::at(
            RuntimeErrorKind::IndexOutOfRange,
            span,
            format!("index {} out of range for length {}", value::format_num(*n), len),
        ));
    }
    Ok(i as usize)
}

fn index_value(object: &Value, index: &Value, span: Span) -> Result<Value, RuntimeError> {
    match object {
        Value::Array(elements) => {
            let elements = elements.borrow();
            let i = checked_index(index, elements.len(), span)?;
            Ok(elements[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = checked_index(index, chars.len(), span)?;
            Ok(Value::from(chars[i].to_string()))
        }
        other => Err(RuntimeError::at(
            RuntimeErrorKind::TypeMismatch,
            span,
            format!("cannot index into {}", other.type_name()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::scanner::tokenize;
    use pretty_assertions::assert_eq;

    fn run_with(source: &str, config: RuntimeConfig) -> (Vec<String>, Result<(), RuntimeError>) {
        let program = parse(tokenize(source).unwrap()).unwrap();
        let mut interpreter = Interpreter::new(config);
        let result = interpreter.interpret(&program);
        (interpreter.into_output(), result)
    }

    fn run(source: &str) -> (Vec<String>, Result<(), RuntimeError>) {
        run_with(source, RuntimeConfig::default())
    }

    #[test]
    fn output_is_readable_after_failure() {
        let program = parse(tokenize("print(\"before\")\nprint(missing)").unwrap()).unwrap();
        let mut interpreter = Interpreter::new(RuntimeConfig::default());
        assert!(interpreter.interpret(&program).is_err());
        assert_eq!(interpreter.output().to_vec(), vec!["before"]);
    }

    #[test]
    fn main_is_the_entry_point() {
        let (output, result) = run(r#"
            print("top level is ignored")
            func main() { print("in main") }
        "#);
        assert!(result.is_ok());
        assert_eq!(output, vec!["in main"]);
    }

    #[test]
    fn last_declaration_wins() {
        let (output, _) = run(r#"
            func greet() { return "first" }
            func greet() { return "second" }
            print(greet())
        "#);
        assert_eq!(output, vec!["second"]);
    }

    #[test]
    fn function_without_return_yields_null() {
        let (output, _) = run("func nothing() { var x = 1 }\nprint(nothing())");
        assert_eq!(output, vec!["null"]);
    }

    #[test]
    fn return_unwinds_nested_loops() {
        let (output, _) = run(r#"
            func find(target) {
                for (var i = 0; i < 10; i = i + 1) {
                    var j = 0
                    while (true) {
                        if (i * 10 + j == target) { return [i, j] }
                        j = j + 1
                        if (j == 10) { return "reset" }
                    }
                }
                return null_never_reached
            }
            print(find(7))
        "#);
        assert_eq!(output, vec!["[0, 7]"]);
    }

    #[test]
    fn top_level_return_stops_program() {
        let (output, result) = run("print(1)\nreturn\nprint(2)");
        assert!(result.is_ok());
        assert_eq!(output, vec!["1"]);
    }

    #[test]
    fn functions_see_globals_but_not_callers_locals() {
        let (output, result) = run(r#"
            var g = "global"
            func show() { print(g) print(local) }
            func caller() { var local = 1; show() }
            caller()
        "#);
        assert_eq!(output, vec!["global"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UndefinedVariable);
        assert_eq!(err.message, "undefined variable 'local'");
    }

    #[test]
    fn assignment_inside_function_updates_global() {
        let (output, _) = run(r#"
            var counter = 0
            func bump() { counter = counter + 1 }
            bump() bump()
            print(counter)
        "#);
        assert_eq!(output, vec!["2"]);
    }

    #[test]
    fn undeclared_assignment_creates_local() {
        let (output, result) = run(r#"
            func make() { fresh = 5; return fresh }
            print(make())
            print(fresh)
        "#);
        assert_eq!(output, vec!["5"]);
        assert_eq!(result.unwrap_err().kind, RuntimeErrorKind::UndefinedVariable);
    }

    #[test]
    fn block_variables_leak_into_enclosing_function() {
        let (output, _) = run("if (true) { var inner = 3 }\nprint(inner)");
        assert_eq!(output, vec!["3"]);
    }

    #[test]
    fn arrays_are_shared_across_calls() {
        let (output, _) = run(r#"
            func fill(a) { push(a, 1); a[0] = 9 }
            var list = [0]
            fill(list)
            print(list)
        "#);
        assert_eq!(output, vec!["[9, 1]"]);
    }

    #[test]
    fn string_indexing() {
        let (output, result) = run("var s = \"héllo\"\nprint(s[1])\nprint(s[5])");
        assert_eq!(output, vec!["é"]);
        assert_eq!(result.unwrap_err().kind, RuntimeErrorKind::IndexOutOfRange);
    }

    #[test]
    fn index_errors() {
        let cases = [
            ("print([1][1])", RuntimeErrorKind::IndexOutOfRange),
            ("print([1][-1])", RuntimeErrorKind::IndexOutOfRange),
            ("print([1][0.5])", RuntimeErrorKind::TypeMismatch),
            ("print([1][\"0\"])", RuntimeErrorKind::TypeMismatch),
            ("print(5[0])", RuntimeErrorKind::TypeMismatch),
            ("var s = \"ab\"\ns[0] = \"c\"", RuntimeErrorKind::TypeMismatch),
        ];
        for (source, kind) in cases {
            let (_, result) = run(source);
            assert_eq!(result.unwrap_err().kind, kind, "source: {}", source);
        }
    }

    #[test]
    fn operator_semantics() {
        let (output, result) = run(r#"
            print(7 / 2, 5 / 0, -(3 - 5), 2 * 3 + 1)
            print("a" + 1 + 2, 1 + 2 + "a", "n=" + null_free + "")
        "#);
        assert_eq!(output, vec!["3.5 0 2 7"]);
        assert_eq!(result.unwrap_err().kind, RuntimeErrorKind::UndefinedVariable);

        let (output, _) = run(r#"
            print("a" + 1 + 2, 1 + 2 + "a", [1, 2] + "!", true + "")
            print(1 == 1, 1 == "1", "x" != "y", [1, [2]] == [1, [2]], false == 0)
            print(2 < 10, "2" < "10", true > false, "3" >= 3)
        "#);
        assert_eq!(
            output,
            vec![
                "a12 3a [1, 2]! true",
                "true false true true false",
                "true true true true",
            ]
        );
    }

    #[test]
    fn type_mismatches() {
        let cases = [
            "print(1 + true)",
            "print([1] + [2])",
            "print(\"a\" - 1)",
            "print(-\"a\")",
            "print(\"abc\" < 1)",
            "print([1] < 2)",
        ];
        for source in cases {
            let (output, result) = run(source);
            assert!(output.is_empty());
            assert_eq!(result.unwrap_err().kind, RuntimeErrorKind::TypeMismatch, "source: {}", source);
        }
    }

    #[test]
    fn unknown_function_has_no_side_effects() {
        let (output, result) = run("missing(print(\"side effect\"))");
        assert!(output.is_empty());
        let err = result.unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::UndefinedFunction);
        assert_eq!(err.span, Span { line: 1, col: 1, length: 7 });
    }

    #[test]
    fn argument_count_checked() {
        let (_, result) = run("func f(a, b) { }\nf(1)");
        let err = result.unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::ArgumentCountMismatch);
        assert_eq!(err.message, "function 'f' expects 2 arguments, but got 1");

        let (_, result) = run("func main(args) { }");
        assert_eq!(result.unwrap_err().kind, RuntimeErrorKind::ArgumentCountMismatch);
    }

    #[test]
    fn builtin_errors_carry_call_span() {
        let (_, result) = run("var x = 1\n  len(x)");
        let err = result.unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::TypeMismatch);
        assert_eq!(err.span.line, 2);
        assert_eq!(err.span.col, 3);
    }

    #[test]
    fn runaway_recursion_is_stack_overflow() {
        let config = RuntimeConfig { max_call_depth: 64 };
        let (output, result) = run_with("func down(n) { return down(n + 1) }\nprint(\"start\")\ndown(0)", config);
        assert_eq!(output, vec!["start"]);
        assert_eq!(result.unwrap_err().kind, RuntimeErrorKind::StackOverflow);
    }

    #[test]
    fn recursion_within_limit_succeeds() {
        let config = RuntimeConfig { max_call_depth: 64 };
        let (output, result) = run_with(
            "func sum(n) { if (n == 0) { return 0 } return n + sum(n - 1) }\nprint(sum(60))",
            config,
        );
        assert!(result.is_ok());
        assert_eq!(output, vec!["1830"]);
    }
}
