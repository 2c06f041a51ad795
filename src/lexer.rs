use logos::Logos;
use std::fmt;

use crate::Span;

/// Line bookkeeping threaded through the logos lexer so every token can be
/// given a zero-based line and column.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinePosition {
    pub line: usize,
    pub line_start: usize, // Byte offset of the first character on `line`
}

#[derive(Logos, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[logos(extras = LinePosition)]
#[logos(skip r"[ \t\r]+")] // Skip whitespace, but not newlines
pub enum TokenKind {
    // `#` runs to the end of the line, newline included. Never emitted.
    #[token("#", skip_comment)]
    Comment,
    #[token("\n")]
    Newline,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,
    #[regex(r"[0-9]+")]
    Int,
    // Any dot after the leading digits makes it a float; the parser rejects `1.2.3`.
    #[regex(r"[0-9]+\.[0-9.]*")]
    Float,
    #[token("->")]
    Arrow,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(":::")]
    TripleColon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    Illegal,
    Eof,
}

fn skip_comment(lex: &mut logos::Lexer<'_, TokenKind>) -> logos::Skip {
    let rest = lex.remainder();
    match rest.find('\n') {
        Some(idx) => {
            lex.bump(idx + 1);
            lex.extras.line += 1;
            lex.extras.line_start = lex.span().end;
        }
        None => lex.bump(rest.len()),
    }
    logos::Skip
}

// Implement Display for easy printing
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Comment => "COMMENT",
            TokenKind::Newline => "\\n",
            TokenKind::Identifier => "IDENT",
            TokenKind::Int => "INT",
            TokenKind::Float => "FLOAT",
            TokenKind::Arrow => "->",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Asterisk => "*",
            TokenKind::Slash => "/",
            TokenKind::Bang => "!",
            TokenKind::Question => "?",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::TripleColon => ":::",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Eof => "EOF",
        };
        write!(f, "{}", name)
    }
}

/// A positioned token. `line`, `start_col` and `end_col` are zero-based and
/// `end_col` is the column of the last character of the lexeme.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub line: usize,
    pub start_col: usize,
    pub end_col: usize,
    pub span: Span,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literal = if self.kind == TokenKind::Newline {
            "\\n"
        } else {
            self.literal.as_str()
        };
        write!(
            f,
            "(Lit: '{}', Type: '{}', line={}, startcol={}, endcol={})",
            literal, self.kind, self.line, self.start_col, self.end_col
        )
    }
}

/// Pull-based tokenizer. `next_token` keeps returning an EOF token once the
/// input is exhausted; the `Iterator` impl stops before it.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            inner: TokenKind::lexer(source),
        }
    }

    pub fn next_token(&mut self) -> Token {
        let kind = match self.inner.next() {
            Some(Ok(kind)) => kind,
            // Logos reports anything it can't match as an error over that character
            Some(Err(_)) => TokenKind::Illegal,
            None => return self.eof_token(),
        };

        let range = self.inner.span();
        let literal = self.inner.slice().to_string();
        let LinePosition { line, line_start } = self.inner.extras;
        let start_col = range.start - line_start;
        let end_col = start_col + literal.len().saturating_sub(1);

        if kind == TokenKind::Newline {
            self.inner.extras.line += 1;
            self.inner.extras.line_start = range.end;
        }

        Token {
            kind,
            literal,
            line,
            start_col,
            end_col,
            span: Span::new(range.start, range.end),
        }
    }

    fn eof_token(&self) -> Token {
        let end = self.inner.source().len();
        let column = end - self.inner.extras.line_start;
        Token {
            kind: TokenKind::Eof,
            literal: String::new(),
            line: self.inner.extras.line,
            start_col: column,
            end_col: column,
            span: Span::new(end, end),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (!token.is(TokenKind::Eof)).then_some(token)
    }
}

// Helper function to tokenize a string directly (useful for tests and the REPL)
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Helper to simplify testing token sequences
    fn assert_tokens(input: &str, expected: Vec<TokenKind>) {
        let kinds: Vec<TokenKind> = tokenize(input).into_iter().map(|t| t.kind).collect();
        assert_eq!(kinds, expected, "Input: '{}'", input);
    }

    // (kind, literal, line, start_col, end_col)
    fn assert_positioned(input: &str, expected: &[(TokenKind, &str, usize, usize, usize)]) {
        let mut lexer = Lexer::new(input);
        for (kind, literal, line, start_col, end_col) in expected {
            let token = lexer.next_token();
            assert_eq!(
                (token.kind, token.literal.as_str(), token.line, token.start_col, token.end_col),
                (*kind, *literal, *line, *start_col, *end_col),
                "Input: '{}'",
                input
            );
        }
    }

    #[test]
    fn test_empty_input() {
        assert_tokens("", vec![]);
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn test_eof_repeats() {
        let mut lexer = Lexer::new("1");
        assert_eq!(lexer.next_token().kind, TokenKind::Int);
        for _ in 0..3 {
            let eof = lexer.next_token();
            assert_eq!(eof.kind, TokenKind::Eof);
            assert_eq!(eof.literal, "");
            assert_eq!((eof.line, eof.start_col), (0, 1));
        }
    }

    #[test]
    fn test_program_fixture() {
        let input = "5 -> A:1.2 -> beans\ntanh(10*pi)\n:::\n? -> ident";
        assert_positioned(
            input,
            &[
                (TokenKind::Int, "5", 0, 0, 0),
                (TokenKind::Arrow, "->", 0, 2, 3),
                (TokenKind::Identifier, "A", 0, 5, 5),
                (TokenKind::Colon, ":", 0, 6, 6),
                (TokenKind::Float, "1.2", 0, 7, 9),
                (TokenKind::Arrow, "->", 0, 11, 12),
                (TokenKind::Identifier, "beans", 0, 14, 18),
                (TokenKind::Newline, "\n", 0, 19, 19),
                (TokenKind::Identifier, "tanh", 1, 0, 3),
                (TokenKind::LParen, "(", 1, 4, 4),
                (TokenKind::Int, "10", 1, 5, 6),
                (TokenKind::Asterisk, "*", 1, 7, 7),
                (TokenKind::Identifier, "pi", 1, 8, 9),
                (TokenKind::RParen, ")", 1, 10, 10),
                (TokenKind::Newline, "\n", 1, 11, 11),
                (TokenKind::TripleColon, ":::", 2, 0, 2),
                (TokenKind::Newline, "\n", 2, 3, 3),
                (TokenKind::Question, "?", 3, 0, 0),
                (TokenKind::Arrow, "->", 3, 2, 3),
                (TokenKind::Identifier, "ident", 3, 5, 9),
                (TokenKind::Eof, "", 3, 10, 10),
            ],
        );
    }

    #[test]
    fn test_operators_and_punctuation() {
        assert_tokens(
            "+ - * / , : -> ( ) { } ? !",
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Asterisk,
                TokenKind::Slash,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Arrow,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Question,
                TokenKind::Bang,
            ],
        );
    }

    #[test]
    fn test_minus_versus_arrow() {
        assert_tokens("-5", vec![TokenKind::Minus, TokenKind::Int]);
        assert_tokens("- >", vec![TokenKind::Minus, TokenKind::Illegal]);
        assert_tokens("5->x", vec![TokenKind::Int, TokenKind::Arrow, TokenKind::Identifier]);
        assert_tokens("--", vec![TokenKind::Minus, TokenKind::Minus]);
    }

    #[test]
    fn test_colons() {
        assert_tokens(":", vec![TokenKind::Colon]);
        assert_tokens(":::", vec![TokenKind::TripleColon]);
        assert_tokens("::::", vec![TokenKind::TripleColon, TokenKind::Colon]);
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("123 4.5 6. 1.2.3");
        let pairs: Vec<(TokenKind, &str)> = tokens
            .iter()
            .map(|t| (t.kind, t.literal.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (TokenKind::Int, "123"),
                (TokenKind::Float, "4.5"),
                (TokenKind::Float, "6."),
                (TokenKind::Float, "1.2.3"),
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = tokenize("foo _bar x1 RANDOM_INT 9lives");
        let pairs: Vec<(TokenKind, &str)> = tokens
            .iter()
            .map(|t| (t.kind, t.literal.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (TokenKind::Identifier, "foo"),
                (TokenKind::Identifier, "_bar"),
                (TokenKind::Identifier, "x1"),
                (TokenKind::Identifier, "RANDOM_INT"),
                (TokenKind::Int, "9"),
                (TokenKind::Identifier, "lives"),
            ]
        );
    }

    #[test]
    fn test_comments() {
        let input = "# leading comment\n# another one\n5 -> x # trailing\nx";
        assert_positioned(
            input,
            &[
                (TokenKind::Int, "5", 2, 0, 0),
                (TokenKind::Arrow, "->", 2, 2, 3),
                (TokenKind::Identifier, "x", 2, 5, 5),
                // The trailing comment swallows its newline
                (TokenKind::Identifier, "x", 3, 0, 0),
                (TokenKind::Eof, "", 3, 1, 1),
            ],
        );
        assert_tokens("# only comment", vec![]);
        assert_tokens("1 # no newline at the end", vec![TokenKind::Int]);
    }

    #[test]
    fn test_whitespace_is_skipped() {
        assert_positioned(
            " \t1\r\n  2",
            &[
                (TokenKind::Int, "1", 0, 2, 2),
                (TokenKind::Newline, "\n", 0, 4, 4),
                (TokenKind::Int, "2", 1, 2, 2),
            ],
        );
    }

    #[test]
    fn test_illegal_characters() {
        let tokens = tokenize("1 $ 2 . @");
        let pairs: Vec<(TokenKind, &str)> = tokens
            .iter()
            .map(|t| (t.kind, t.literal.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (TokenKind::Int, "1"),
                (TokenKind::Illegal, "$"),
                (TokenKind::Int, "2"),
                (TokenKind::Illegal, "."),
                (TokenKind::Illegal, "@"),
            ]
        );
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("a\n b");
        assert_eq!(tokens[0].span, Span::new(0, 1));
        assert_eq!(tokens[1].span, Span::new(1, 2));
        assert_eq!(tokens[2].span, Span::new(3, 4));
    }

    #[test]
    fn test_token_display() {
        let tokens = tokenize("x\n");
        assert_eq!(
            tokens[0].to_string(),
            "(Lit: 'x', Type: 'IDENT', line=0, startcol=0, endcol=0)"
        );
        assert_eq!(
            tokens[1].to_string(),
            "(Lit: '\\n', Type: '\\n', line=0, startcol=1, endcol=1)"
        );
    }
}
