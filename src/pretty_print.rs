use crate::interpreter::Error;
use crate::lexer::TokenKind;
use crate::parser::{ParseError, ParseErrorKind};
use crate::source::Span;
use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use std::io::{self, Write};

/// Source name used in reports for interactive input.
pub const REPL_SOURCE: &str = "REPL";

fn write_report<W: Write>(
    source_id: &str,
    input: &str,
    span: Span,
    message: String,
    label: String,
    color: bool,
    w: W,
) -> io::Result<()> {
    // Spans are byte offsets
    let config = Config::default()
        .with_index_type(IndexType::Byte)
        .with_color(color);
    Report::build(ReportKind::Error, (source_id, span.to_range()))
        .with_config(config)
        .with_message(message)
        .with_label(Label::new((source_id, span.to_range())).with_message(label))
        .finish()
        .write((source_id, Source::from(input)), w)
}

impl ParseError {
    // The span worth pointing at, and what to say about it
    fn label(&self) -> (Span, String) {
        match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, found } => {
                let found = match found {
                    TokenKind::Eof => "end of input".to_string(),
                    TokenKind::Newline => "end of line".to_string(),
                    other => format!("`{}`", other),
                };
                (
                    self.peek.span,
                    format!("expected `{}` here, found {}", expected, found),
                )
            }
            ParseErrorKind::NoPrefixParseFn(TokenKind::Eof) => (
                self.token.span,
                "input ends where an expression should start".to_string(),
            ),
            ParseErrorKind::NoPrefixParseFn(kind) => (
                self.token.span,
                format!("`{}` cannot start an expression", kind),
            ),
            ParseErrorKind::IllegalCharacter(_) => (
                self.token.span,
                "this character is not part of the language".to_string(),
            ),
            ParseErrorKind::InvalidInteger(_) => (
                self.token.span,
                "integers must fit in a signed 64-bit value".to_string(),
            ),
            ParseErrorKind::InvalidFloat(_) => (
                self.token.span,
                "a number has at most one decimal point".to_string(),
            ),
            ParseErrorKind::UnterminatedBlock => (
                self.token.span,
                "this block needs a closing `}`".to_string(),
            ),
        }
    }

    /// Writes an uncolored report to `w`.
    pub fn write_report<W: Write>(&self, source_id: &str, input: &str, w: W) -> io::Result<()> {
        let (span, label) = self.label();
        write_report(source_id, input, span, self.kind.to_string(), label, false, w)
    }

    /// Prints a colored report to stderr.
    pub fn pretty_print(&self, source_id: &str, input: &str) -> io::Result<()> {
        let (span, label) = self.label();
        write_report(
            source_id,
            input,
            span,
            self.kind.to_string(),
            label,
            true,
            io::stderr(),
        )
    }
}

impl Error {
    fn write_all<W: Write>(&self, source_id: &str, input: &str, color: bool, mut w: W) -> io::Result<()> {
        match self {
            Error::Parse(errors) => {
                for error in errors {
                    let (span, label) = error.label();
                    write_report(
                        source_id,
                        input,
                        span,
                        error.kind.to_string(),
                        label,
                        color,
                        &mut w,
                    )?;
                }
                Ok(())
            }
            Error::Eval { error, span } => write_report(
                source_id,
                input,
                *span,
                error.to_string(),
                "while evaluating this statement".to_string(),
                color,
                w,
            ),
        }
    }

    /// Writes uncolored reports to `w`, one per parse error.
    pub fn write_report<W: Write>(&self, source_id: &str, input: &str, w: W) -> io::Result<()> {
        self.write_all(source_id, input, false, w)
    }

    /// Prints colored reports to stderr.
    pub fn pretty_print(&self, source_id: &str, input: &str) -> io::Result<()> {
        self.write_all(source_id, input, true, io::stderr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::parser::parse_str;

    fn render(error: &Error, input: &str) -> String {
        let mut out = Vec::new();
        error.write_report("test.calc", input, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn first_parse_error(input: &str) -> ParseError {
        parse_str(input).unwrap_err().remove(0)
    }

    #[test]
    fn test_eval_error_report() {
        let input = "1 -> a\nb + 1\n";
        let error = Interpreter::default().eval_str(input).unwrap_err();
        let report = render(&error, input);
        assert!(report.contains("identifier not found: b"), "{}", report);
        assert!(report.contains("test.calc"), "{}", report);
        assert!(report.contains("while evaluating this statement"), "{}", report);
        assert!(report.contains("b + 1"), "{}", report);
    }

    #[test]
    fn test_parse_error_reports_every_error() {
        let input = "* 1\n2 $ 3\n";
        let error = Interpreter::default().eval_str(input).unwrap_err();
        let report = render(&error, input);
        assert!(report.contains("no prefix parse function for * found"), "{}", report);
        assert!(report.contains("illegal character '$'"), "{}", report);
        assert!(report.contains("cannot start an expression"), "{}", report);
    }

    #[test]
    fn test_unexpected_token_points_at_found_token() {
        let error = first_parse_error("(1 + 2 3");
        let (span, label) = error.label();
        assert_eq!(span, Span::new(7, 8));
        assert_eq!(label, "expected `)` here, found `INT`");

        let error = first_parse_error("sqrt(2");
        assert_eq!(error.label().1, "expected `)` here, found end of input");
    }

    #[test]
    fn test_unterminated_block_points_at_brace() {
        let input = "1\n{ 2 -> x\n";
        let error = first_parse_error(input);
        let (span, _) = error.label();
        assert_eq!(&input[span.to_range()], "{");

        let mut out = Vec::new();
        error.write_report("REPL", input, &mut out).unwrap();
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("repeat block is never closed"), "{}", report);
        assert!(report.contains("this block needs a closing `}`"), "{}", report);
    }
}
