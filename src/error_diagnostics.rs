//! Error diagnostics for pattern text
//!
//! Turns "the parser stopped here" into something a live coder can act on:
//! - Line and column of the first unparsed character
//! - Detection of unbalanced brackets and misplaced operators
//! - A hint showing the correct form

use std::fmt;

/// Diagnostic error with line number and context
#[derive(Debug, Clone)]
pub struct DiagnosticError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub hint: Option<String>,
    pub source_line: Option<String>,
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "❌ Parse Error at line {}:{}", self.line, self.column)?;
        writeln!(f)?;

        if let Some(source) = &self.source_line {
            writeln!(f, "  {}", source)?;
            writeln!(f, "  {}^", " ".repeat(self.column.saturating_sub(1)))?;
        }

        writeln!(f)?;
        writeln!(f, "Error: {}", self.message)?;

        if let Some(hint) = &self.hint {
            writeln!(f)?;
            writeln!(f, "💡 Hint: {}", hint)?;
        }

        Ok(())
    }
}

/// Locate where parsing stopped and explain the failure
pub fn diagnose_parse_failure(original_input: &str, remaining: &str) -> DiagnosticError {
    let parsed_len = original_input.len().saturating_sub(remaining.len());

    let lines: Vec<&str> = original_input.lines().collect();
    let mut current_len = 0;
    let mut error_line = 0;
    let mut error_column = 0;
    let mut source_line = String::new();

    for (i, line) in lines.iter().enumerate() {
        let line_len = line.len() + 1; // +1 for newline
        if current_len + line_len > parsed_len {
            error_line = i + 1;
            error_column = parsed_len - current_len + 1;
            source_line = line.to_string();
            break;
        }
        current_len += line_len;
    }

    // Stopped at EOF
    if error_line == 0 {
        error_line = lines.len().max(1);
        error_column = lines.last().map(|l| l.len()).unwrap_or(0) + 1;
        source_line = lines.last().map(|s| s.to_string()).unwrap_or_default();
    }

    let problem_text = remaining.trim();
    let problem_preview: String = if problem_text.chars().count() > 50 {
        format!("{}...", problem_text.chars().take(50).collect::<String>())
    } else {
        problem_text.to_string()
    };

    let (message, hint) = detect_common_error(original_input, problem_text);

    DiagnosticError {
        line: error_line,
        column: error_column,
        message: if message.is_empty() {
            format!("Could not parse: '{}'", problem_preview)
        } else {
            message
        },
        hint,
        source_line: Some(source_line),
    }
}

fn detect_common_error(input: &str, text: &str) -> (String, Option<String>) {
    for (open, close, name) in [('(', ')', "list"), ('[', ']', "subdivision"), ('<', '>', "cycle"), ('{', '}', "expression")] {
        let opened = input.chars().filter(|c| *c == open).count();
        let closed = input.chars().filter(|c| *c == close).count();
        if opened > closed {
            return (
                format!("Unclosed {} '{}'", name, open),
                Some(format!("Every '{}' needs a matching '{}'", open, close)),
            );
        }
        if closed > opened {
            return (
                format!("Unexpected '{}' without an opening '{}'", close, open),
                None,
            );
        }
    }

    if let Some(first) = text.chars().next() {
        if "+*/%@".contains(first) {
            return (
                format!("Operator '{}' must follow a list", first),
                Some(format!(
                    "❌ Wrong: 1 2 {}3\n\
                      ✅ Correct: (1 2){}3",
                    first, first
                )),
            );
        }

        if first == ':' {
            return (
                "Repeat marker ':' outside of [: :] or (: :)".to_string(),
                Some("Example: [: 1 2 :3]".to_string()),
            );
        }

        if first.is_ascii_lowercase() && !"ivr".contains(first) {
            return (
                format!("'{}' is not followed by a pitch", first),
                Some(
                    "Duration characters prefix a pitch (q1) or stand alone before a space (q 1 2)"
                        .to_string(),
                ),
            );
        }
    }

    (String::new(), None)
}

/// Check the entire input for common mistakes and return warnings
pub fn check_for_common_mistakes(input: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    for (i, line) in input.lines().enumerate() {
        let trimmed = line.trim();

        let opened = trimmed.matches('(').count();
        let closed = trimmed.matches(')').count();
        if opened != closed {
            warnings.push(format!(
                "Line {}: {} '(' but {} ')'",
                i + 1,
                opened,
                closed
            ));
        }

        let repeat_closed = trimmed
            .split("[:")
            .skip(1)
            .all(|rest| rest.contains(':') && rest.contains(']'));
        if !repeat_closed {
            warnings.push(format!("Line {}: '[:' repeat is never closed", i + 1));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_of_failure() {
        let input = "1 2\n3 ~ 4";
        let remaining = "~ 4";

        let diag = diagnose_parse_failure(input, remaining);
        assert_eq!(diag.line, 2);
        assert_eq!(diag.column, 3);
        assert_eq!(diag.source_line.as_deref(), Some("3 ~ 4"));
    }

    #[test]
    fn test_detect_unclosed_list() {
        let input = "1 (2 3";
        let diag = diagnose_parse_failure(input, "(2 3");
        assert!(diag.message.contains("Unclosed list"));
        assert!(diag.hint.is_some());
    }

    #[test]
    fn test_detect_stray_operator() {
        let input = "1 2 +3";
        let diag = diagnose_parse_failure(input, "+3");
        assert!(diag.message.contains("must follow a list"));
    }

    #[test]
    fn test_check_common_mistakes() {
        let warnings = check_for_common_mistakes("(1 2\n[: 1 2");
        assert!(warnings.iter().any(|w| w.contains("Line 1")));
        assert!(warnings.iter().any(|w| w.contains("never closed")));
    }
}
