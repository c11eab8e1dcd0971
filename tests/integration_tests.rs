use mrt::config::RuntimeConfig;
use mrt::interpreter::RuntimeErrorKind;
use mrt::{ErrorKind, Execution, execute, execute_with_config};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// Run a program and hand back its output, or the error kind and message
fn eval(source: &str) -> Result<Vec<String>, String> {
    execute(source)
        .into_result()
        .map_err(|e| format!("{}: {}", e.kind(), e))
}

fn lines(expected: &[&str]) -> Vec<String> {
    expected.iter().map(|s| s.to_string()).collect()
}

fn error_kind(execution: &Execution) -> ErrorKind {
    match &execution.error {
        Some(e) => e.kind(),
        None => panic!("expected an error, got output {:?}", execution.output),
    }
}

#[test]
fn test_bare_top_level_print() {
    assert_eq!(eval(r#"print("hi")"#), Ok(lines(&["hi"])));
}

#[test]
fn test_main_scenario() {
    let code = r#"func main() { var a = [1,2,3]; push(a, 4); print(join(a, "-")) }"#;
    assert_eq!(eval(code), Ok(lines(&["1-2-3-4"])));
}

#[test]
fn test_main_ignores_top_level_statements() {
    let code = r#"
    print("never")
    func main() {
        print("only this")
    }
    print("nor this")
    "#;
    assert_eq!(eval(code), Ok(lines(&["only this"])));
}

#[test]
fn test_division_by_zero_is_zero() {
    assert_eq!(eval("print(5 / 0)"), Ok(lines(&["0"])));
    assert_eq!(eval("print(-5 / 0)"), Ok(lines(&["0"])));
}

#[test]
fn test_mixed_concatenation() {
    assert_eq!(eval(r#"print("x=" + 5)"#), Ok(lines(&["x=5"])));
    assert_eq!(eval(r#"print("pi=" + 3.5, 0.5 + "!")"#), Ok(lines(&["pi=3.5 0.5!"])));
}

#[test]
fn test_undefined_variable_has_no_output() {
    let execution = execute("print(y)");
    assert!(execution.output.is_empty());
    assert_eq!(
        error_kind(&execution),
        ErrorKind::Runtime(RuntimeErrorKind::UndefinedVariable)
    );
}

#[test]
fn test_partial_output_kept_on_runtime_error() {
    let code = r#"
    print("one")
    print("two")
    var a = [1]
    print(a[3])
    print("three")
    "#;
    let execution = execute(code);
    assert_eq!(execution.output, lines(&["one", "two"]));
    assert_eq!(
        error_kind(&execution),
        ErrorKind::Runtime(RuntimeErrorKind::IndexOutOfRange)
    );
    assert_eq!(execution.error.unwrap().span().line, 5);
}

#[test]
fn test_lex_and_parse_errors_run_nothing() {
    let execution = execute("print(\"fine\")\nprint(\"oops)");
    assert!(execution.output.is_empty());
    assert_eq!(error_kind(&execution), ErrorKind::Lex);

    let execution = execute("print(\"fine\")\nvar = 3");
    assert!(execution.output.is_empty());
    assert_eq!(error_kind(&execution), ErrorKind::Parse);
}

#[test]
fn test_builtin_cannot_be_redefined() {
    let execution = execute("func len(x) { return 0 }");
    assert_eq!(error_kind(&execution), ErrorKind::Parse);
    assert_eq!(
        execution.error.unwrap().to_string(),
        "expected a function name that is not a built-in, found built-in 'len'"
    );
}

#[test]
fn test_error_kinds() {
    let cases = [
        ("nope()", RuntimeErrorKind::UndefinedFunction),
        ("len([1], [2])", RuntimeErrorKind::ArgumentCountMismatch),
        ("func f(a) { }\nf()", RuntimeErrorKind::ArgumentCountMismatch),
        ("print(1 - \"a\")", RuntimeErrorKind::TypeMismatch),
        ("var a = []\na[0] = 1", RuntimeErrorKind::IndexOutOfRange),
        ("func f() { return f() }\nf()", RuntimeErrorKind::StackOverflow),
    ];
    for (source, kind) in cases {
        let execution = execute(source);
        assert_eq!(error_kind(&execution), ErrorKind::Runtime(kind), "{}", source);
    }
}

#[test]
fn test_stack_overflow_respects_config() {
    let code = r#"
    func depth(n) {
        if (n == 0) { return 0 }
        return 1 + depth(n - 1)
    }
    print(depth(50))
    print(depth(500))
    "#;
    let config = RuntimeConfig { max_call_depth: 100 };
    let execution = execute_with_config(code, &config);
    assert!(!execution.is_ok());
    assert_eq!(execution.output, lines(&["50"]));
    assert_eq!(
        error_kind(&execution),
        ErrorKind::Runtime(RuntimeErrorKind::StackOverflow)
    );

    assert_eq!(eval(code), Ok(lines(&["50", "500"])));
}

#[test]
fn test_subtraction_is_left_associative() {
    assert_eq!(eval("print(10-2-3, 10 - 2 - 3, 2*3-1)"), Ok(lines(&["5 5 5"])));
    assert_eq!(eval("var n = 4\nprint(n-1, n -1, -n)"), Ok(lines(&["3 3 -4"])));
}

#[test]
fn test_else_if_chain() {
    let code = r#"
    func grade(score) {
        if (score >= 90) { return "A" }
        else if (score >= 80) { return "B" }
        else { return "C" }
    }
    print(grade(95), grade(85), grade(10))
    "#;
    assert_eq!(eval(code), Ok(lines(&["A B C"])));
}

#[test]
fn test_while_and_for_loops() {
    let code = r#"
    var total = 0
    for (var i = 1; i <= 4; i = i + 1) { total = total + i }
    var n = 3
    while (n) { n = n - 1 }
    print(total, n, i)
    "#;
    assert_eq!(eval(code), Ok(lines(&["10 0 5"])));
}

#[test]
fn test_array_aliasing() {
    let code = r#"
    var a = [1, 2]
    var b = a
    push(b, 3)
    b[0] = 100
    print(a)
    print(a == b, [1] == [1])
    "#;
    assert_eq!(eval(code), Ok(lines(&["[100, 2, 3]", "true true"])));
}

#[test]
fn test_nested_array_formatting() {
    let code = r#"
    var a = [1, "two", true, [3.5, []]]
    print(a)
    var none
    print(none, len(a))
    "#;
    assert_eq!(
        eval(code),
        Ok(lines(&["[1, two, true, [3.5, []]]", "null 4"]))
    );
}

#[test]
fn test_self_containing_array_prints() {
    let code = "var a = [1]\npush(a, a)\nprint(a)";
    assert_eq!(eval(code), Ok(lines(&["[1, [...]]"])));
}

#[test]
fn test_self_containing_arrays_compare() {
    let code = r#"
    var a = [1]
    push(a, a)
    var b = [1]
    push(b, b)
    print(a == b, a != b)
    print(indexOf([a], b), indexOf([0, b], a))
    "#;
    assert_eq!(eval(code), Ok(lines(&["true false", "0 1"])));
}

#[test]
fn test_deeply_nested_array_survives_print_and_drop() {
    let code = r#"
    var a = []
    for (var i = 0; i < 20000; i = i + 1) { a = [a] }
    var b = []
    for (var i = 0; i < 20000; i = i + 1) { b = [b] }
    print(len(a), a == b)
    var text = "" + a
    print(len(text))
    "#;
    let execution = execute(code);
    assert!(execution.is_ok());
    assert_eq!(execution.output, lines(&["1 true", "40002"]));
}

#[test]
fn test_fibonacci_example() {
    let code = r#"
func fibonacci(n) {
    if (n <= 1) {
        return n
    }
    return fibonacci(n - 1) + fibonacci(n - 2)
}

func main() {
    print("First 8 Fibonacci numbers:")
    for (var i = 0; i < 8; i = i + 1) {
        print("F(" + i + ") =", fibonacci(i))
    }
    print(fibonacci(8))
}
"#;
    assert_eq!(
        eval(code),
        Ok(lines(&[
            "First 8 Fibonacci numbers:",
            "F(0) = 0",
            "F(1) = 1",
            "F(2) = 1",
            "F(3) = 2",
            "F(4) = 3",
            "F(5) = 5",
            "F(6) = 8",
            "F(7) = 13",
            "21",
        ]))
    );
}

#[test]
fn test_array_operations_example() {
    let code = r#"
func main() {
    var numbers = [1, 2, 3, 4, 5]

    push(numbers, 6)
    print("After push:", numbers)

    var last = pop(numbers)
    print("Popped:", last)

    var subset = slice(numbers, 1, 4)
    print("Slice [1:4]:", subset)

    print("Joined:", join(numbers, " -> "))
}
"#;
    assert_eq!(
        eval(code),
        Ok(lines(&[
            "After push: [1, 2, 3, 4, 5, 6]",
            "Popped: 6",
            "Slice [1:4]: [2, 3, 4]",
            "Joined: 1 -> 2 -> 3 -> 4 -> 5",
        ]))
    );
}

#[test]
fn test_string_processing_example() {
    let code = r#"
func main() {
    var text = "  Hello, MRT World!  "

    print("Original:", text)
    print("Trimmed:", trim(text))
    print("Uppercase:", toUpper(text))
    print("Lowercase:", toLower(text))

    var words = split(trim(text), " ")
    print("Words:", words)
    print("First word:", words[0])

    print("Contains 'MRT':", contains(text, "MRT"))
    print("Starts with 'Hello':", startsWith(trim(text), "Hello"))
}
"#;
    assert_eq!(
        eval(code),
        Ok(lines(&[
            "Original:   Hello, MRT World!  ",
            "Trimmed: Hello, MRT World!",
            "Uppercase:   HELLO, MRT WORLD!  ",
            "Lowercase:   hello, mrt world!  ",
            "Words: [Hello,, MRT, World!]",
            "First word: Hello,",
            "Contains 'MRT': true",
            "Starts with 'Hello': true",
        ]))
    );
}

#[test]
fn test_calculator_example() {
    let code = r#"
func calculator(a, b, op) {
    if (op == "+") {
        return a + b
    } else if (op == "-") {
        return a - b
    } else if (op == "*") {
        return a * b
    } else if (op == "/") {
        if (b == 0) {
            print("Error: Division by zero")
            return 0
        }
        return a / b
    }
    return 0
}

func main() {
    print("Calculator Demo:")
    print("5 + 3 =", calculator(5, 3, "+"))
    print("10 - 4 =", calculator(10, 4, "-"))
    print("6 * 2 =", calculator(6, 2, "*"))
    print("15 / 3 =", calculator(15, 3, "/"))
    print("1 / 0 =", calculator(1, 0, "/"))
}
"#;
    assert_eq!(
        eval(code),
        Ok(lines(&[
            "Calculator Demo:",
            "5 + 3 = 8",
            "10 - 4 = 6",
            "6 * 2 = 12",
            "15 / 3 = 5",
            "Error: Division by zero",
            "1 / 0 = 0",
        ]))
    );
}

#[test]
fn test_string_builtins() {
    let code = r#"
    var s = "a,b,,c"
    print(split(s, ","), len(split(s, ",")))
    print(substring("hello", 1, 3), substring("hello", 3), substring("hello", -2, 99))
    print(replace("a-b-c", "-", "+"), indexOf(["x", 2, "y"], 2), indexOf([1], "1"))
    print(endsWith("file.mrt", ".mrt"), contains("abc", "d"), len("héllo"))
    "#;
    assert_eq!(
        eval(code),
        Ok(lines(&[
            "[a, b, , c] 4",
            "el lo hello",
            "a+b+c 1 -1",
            "true false 5",
        ]))
    );
}

#[test]
fn test_comments_and_semicolons() {
    let code = r#"
    /* block
       comment */
    var a = 1; var b = 2;; // trailing
    print(a + b);
    "#;
    assert_eq!(eval(code), Ok(lines(&["3"])));
}

#[test]
fn test_determinism() {
    let code = r#"
    func square(x) { return x * x }
    var acc = []
    for (var i = 0; i < 5; i = i + 1) { push(acc, square(i)) }
    print(join(acc, ","))
    "#;
    assert_eq!(execute(code), execute(code));
}

#[test]
fn test_push_pop_round_trip() {
    let code = r#"
    var a = [1, 2, 3]
    push(a, "new")
    var popped = pop(a)
    print(popped, len(a), a)
    print(pop([]))
    "#;
    assert_eq!(eval(code), Ok(lines(&["new 3 [1, 2, 3]", "null"])));
}

proptest! {
    #[test]
    fn prop_join_split_round_trip(s in "[a-z ,:-]{0,20}", sep in prop::sample::select(vec![",", ":", "-", "::", " ", ""])) {
        let code = format!(
            "var s = \"{}\"\nprint(join(split(s, \"{}\"), \"{}\") == s)",
            s, sep, sep
        );
        prop_assert_eq!(eval(&code), Ok(lines(&["true"])));
    }

    #[test]
    fn prop_slice_length(
        elements in prop::collection::vec(0i32..100, 0..10),
        i in -5i32..15,
        j in -5i32..15,
    ) {
        let array = elements.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ");
        let code = format!(
            "var a = [{}]\nvar b = slice(a, {}, {})\nprint(len(b))\nprint(len(a))",
            array, i, j
        );
        let len = elements.len() as i32;
        let expected = (j.min(len) - i.max(0)).max(0);
        prop_assert_eq!(
            eval(&code),
            Ok(vec![expected.to_string(), len.to_string()])
        );
    }
}
