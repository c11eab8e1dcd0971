use crate::interpreter::RuntimeErrorKind;
use crate::span::Span;
use crate::{Error, ErrorKind};
use std::fmt::Write;

/// Render an error in the usual compiler layout:
///
/// ```text
/// error[TypeMismatch]: cannot apply '+' to array and array
///  --> line 2:9
///   |
/// 2 | print([1] + [2])
///   |           ^
/// ```
pub fn render(source: &str, kind: &str, span: Span, message: &str, hint: Option<&str>) -> String {
    let source_line = source.lines().nth(span.line.saturating_sub(1)).unwrap_or("");
    let gutter = span.line.to_string().len();
    let blank = " ";

    let padding: String = source_line
        .chars()
        .take(span.col.saturating_sub(1))
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    let carets = "^".repeat(span.length.max(1));

    let mut out = String::new();
    // writing into a String can't fail
    let _ = writeln!(out, "error[{}]: {}", kind, message);
    let _ = writeln!(out, "{blank:>gutter$}--> line {}:{}", span.line, span.col);
    let _ = writeln!(out, "{blank:>gutter$} |");
    let _ = writeln!(out, "{:>gutter$} | {}", span.line, source_line);
    let _ = writeln!(out, "{blank:>gutter$} | {}{}", padding, carets);

    if let Some(hint) = hint {
        let _ = writeln!(out, "{blank:>gutter$} |");
        let _ = writeln!(out, "{blank:>gutter$} = hint: {}", hint);
    }

    out
}

pub fn render_error(source: &str, error: &Error) -> String {
    let hint = suggest_hint(error);
    render(
        source,
        &error.kind().to_string(),
        error.span(),
        &error.to_string(),
        hint.as_deref(),
    )
}

pub fn suggest_hint(error: &Error) -> Option<String> {
    let message = error.to_string();

    match error.kind() {
        ErrorKind::Lex if message.contains("'!'") => {
            Some("there is no '!' operator; use '!=' to compare, or '== false' to negate".into())
        }
        ErrorKind::Lex if message.starts_with("Unterminated string") => {
            Some("close the string with a matching '\"'".into())
        }
        ErrorKind::Parse if message.contains("built-in") => {
            Some("built-in functions can't be redefined; pick another name".into())
        }
        ErrorKind::Parse if message.contains("only allowed at top level") => {
            Some("move the function declaration out of the enclosing block".into())
        }
        ErrorKind::Runtime(RuntimeErrorKind::TypeMismatch)
            if message.contains("'+'") && message.contains("array") =>
        {
            Some("use join(array, separator) to turn an array into a string".into())
        }
        ErrorKind::Runtime(RuntimeErrorKind::TypeMismatch) if message.contains("integer") => {
            Some("indices must be whole numbers".into())
        }
        ErrorKind::Runtime(RuntimeErrorKind::UndefinedVariable) => {
            Some("declare it with 'var' before using it".into())
        }
        ErrorKind::Runtime(RuntimeErrorKind::UndefinedFunction) => {
            Some("functions are declared at top level with 'func'".into())
        }
        ErrorKind::Runtime(RuntimeErrorKind::IndexOutOfRange) => {
            Some("valid indices run from 0 to len(value) - 1".into())
        }
        ErrorKind::Runtime(RuntimeErrorKind::StackOverflow) => {
            Some("check that the recursion has a base case".into())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_caret_under_span() {
        let source = "var a = 1\nprint(a + [1])";
        let error = execute(source).error.unwrap();
        let rendered = render_error(source, &error);
        assert_eq!(
            rendered,
            "error[TypeMismatch]: cannot apply '+' to number and array\n \
             --> line 2:9\n  |\n2 | print(a + [1])\n  |         ^\n  |\n  \
             = hint: use join(array, separator) to turn an array into a string\n"
        );
    }

    #[test]
    fn hint_for_bang() {
        let error = execute("if (!x) {}").error.unwrap();
        assert_eq!(error.kind(), ErrorKind::Lex);
        assert!(suggest_hint(&error).unwrap().contains("'!='"));
    }

    #[test]
    fn no_hint_for_plain_parse_error() {
        let error = execute("print(1 2)").error.unwrap();
        assert_eq!(suggest_hint(&error), None);
    }
}
