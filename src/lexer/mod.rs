//! C1: the lexer. Converts source text into a stream of [`Token`]s.

mod token;

pub use token::{Literal, Location, Token, TokenKind};

use crate::error::{codes, DiagnosticSink};

/// A saved lexer position, used to backtrack when the parser needs to
/// disambiguate `(type) expr` from `(expr)`.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    pos: usize,
    line: u32,
    column: u32,
    at_line_start: bool,
}

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    at_line_start: bool,
    pub diagnostics: DiagnosticSink,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            diagnostics: DiagnosticSink::new(),
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            line: self.line,
            column: self.column,
            at_line_start: self.at_line_start,
        }
    }

    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.line = checkpoint.line;
        self.column = checkpoint.column;
        self.at_line_start = checkpoint.at_line_start;
    }

    fn loc(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
            if !c.is_ascii_whitespace() {
                self.at_line_start = false;
            }
        }
        Some(c)
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.loc();
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while self.peek().is_some() {
                        if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        self.diagnostics.error(
                            start,
                            codes::SYNTAX_ERROR,
                            "unterminated block comment",
                        );
                    }
                }
                Some(b'#') if self.at_line_start => {
                    self.handle_directive();
                }
                _ => break,
            }
        }
    }

    /// Handles a `#line N "file"` directive. The file name is accepted but
    /// discarded since [`Location`] does not track per-token source file.
    fn handle_directive(&mut self) {
        self.advance(); // '#'
        while self.peek().map(|c| c == b' ' || c == b'\t').unwrap_or(false) {
            self.advance();
        }
        let ident_start = self.pos;
        while self
            .peek()
            .map(|c| c.is_ascii_alphanumeric())
            .unwrap_or(false)
        {
            self.advance();
        }
        let directive = &self.source[ident_start..self.pos];
        if directive == "line" {
            while self.peek().map(|c| c == b' ' || c == b'\t').unwrap_or(false) {
                self.advance();
            }
            let num_start = self.pos;
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance();
            }
            if let Ok(n) = self.source[num_start..self.pos].parse::<u32>() {
                self.line = n;
            }
        }
        // Skip the remainder of the line, including an optional quoted file name.
        while let Some(c) = self.peek() {
            if c == b'\n' {
                break;
            }
            self.advance();
        }
    }

    /// Lexes and returns the next token. Returns `TokenKind::EndOfStream` at input end.
    pub fn lex(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.loc();
        let start_pos = self.pos;

        let Some(c) = self.peek() else {
            return Token {
                kind: TokenKind::EndOfStream,
                location: start,
                raw: String::new(),
            };
        };

        let kind = if c.is_ascii_digit() || (c == b'.' && self.peek_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            self.lex_number(start)
        } else if c.is_ascii_alphabetic() || c == b'_' {
            self.lex_identifier()
        } else if c == b'"' {
            self.lex_string(start)
        } else {
            self.lex_operator(start)
        };

        Token {
            kind,
            location: start,
            raw: self.source[start_pos..self.pos].to_string(),
        }
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self
            .peek()
            .map(|c| c.is_ascii_alphanumeric() || c == b'_')
            .unwrap_or(false)
        {
            self.advance();
        }
        let ident = &self.source[start..self.pos];
        TokenKind::keyword(ident).unwrap_or_else(|| TokenKind::Identifier(ident.to_string()))
    }

    fn lex_string(&mut self, start: Location) -> TokenKind {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    self.diagnostics.error(
                        start,
                        codes::SYNTAX_ERROR,
                        "unterminated string literal",
                    );
                    break;
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.advance() {
                        Some(b'n') => value.push('\n'),
                        Some(b't') => value.push('\t'),
                        Some(b'"') => value.push('"'),
                        Some(b'\\') => value.push('\\'),
                        Some(c) => value.push(c as char),
                        None => break,
                    }
                }
                Some(_) => {
                    value.push(self.advance().unwrap() as char);
                }
            }
        }

        // Adjacent string literal concatenation: "a" "b" == "ab".
        loop {
            let checkpoint = self.checkpoint();
            self.skip_whitespace_and_comments();
            if self.peek() == Some(b'"') {
                self.advance();
                loop {
                    match self.peek() {
                        None | Some(b'\n') => break,
                        Some(b'"') => {
                            self.advance();
                            break;
                        }
                        Some(b'\\') => {
                            self.advance();
                            match self.advance() {
                                Some(b'n') => value.push('\n'),
                                Some(b't') => value.push('\t'),
                                Some(c) => value.push(c as char),
                                None => break,
                            }
                        }
                        Some(_) => value.push(self.advance().unwrap() as char),
                    }
                }
            } else {
                self.restore(checkpoint);
                break;
            }
        }

        TokenKind::StringLiteral(value)
    }

    fn lex_number(&mut self, start: Location) -> TokenKind {
        let begin = self.pos;

        let is_hex = self.peek() == Some(b'0')
            && matches!(self.peek_at(1), Some(b'x') | Some(b'X'));
        let is_octal = self.peek() == Some(b'0')
            && self.peek_at(1).map_or(false, |c| c.is_ascii_digit());

        if is_hex {
            self.advance();
            self.advance();
            let digits_start = self.pos;
            while self.peek().map(|c| c.is_ascii_hexdigit()).unwrap_or(false) {
                self.advance();
            }
            let digits = &self.source[digits_start..self.pos];
            let value = u64::from_str_radix(digits, 16).unwrap_or(0);
            return self.finish_integer(start, value);
        }

        if is_octal {
            self.advance();
            let digits_start = self.pos;
            while self.peek().map(|c| (b'0'..=b'7').contains(&c)).unwrap_or(false) {
                self.advance();
            }
            let digits = &self.source[digits_start..self.pos];
            let value = u64::from_str_radix(digits, 8).unwrap_or(0);
            return self.finish_integer(start, value);
        }

        while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.advance();
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.advance();
            }
            while self.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                self.advance();
            }
        }

        let digits_end = self.pos;
        let text = &self.source[begin..digits_end];

        if is_float {
            // lf / LF promotes to double, f / F keeps float, otherwise float by default.
            if self.eat_case_insensitive("lf") {
                let v: f64 = text.parse().unwrap_or(0.0);
                TokenKind::DoubleLiteral(v)
            } else {
                if self.peek() == Some(b'f') || self.peek() == Some(b'F') {
                    self.advance();
                }
                let v: f32 = text.parse().unwrap_or(0.0);
                TokenKind::FloatLiteral(v)
            }
        } else if self.eat_case_insensitive("lf") {
            let v: f64 = text.parse().unwrap_or(0.0);
            TokenKind::DoubleLiteral(v)
        } else if self.peek() == Some(b'f') || self.peek() == Some(b'F') {
            self.advance();
            let v: f32 = text.parse().unwrap_or(0.0);
            TokenKind::FloatLiteral(v)
        } else if self.peek() == Some(b'u') || self.peek() == Some(b'U') {
            self.advance();
            let value: u64 = text.parse().unwrap_or(0);
            self.finish_integer(start, value)
        } else {
            let value: u64 = text.parse().unwrap_or(0);
            self.finish_integer_signed(start, value)
        }
    }

    fn eat_case_insensitive(&mut self, s: &str) -> bool {
        let checkpoint = self.checkpoint();
        for expected in s.bytes() {
            match self.peek() {
                Some(c) if c.eq_ignore_ascii_case(&expected) => {
                    self.advance();
                }
                _ => {
                    self.restore(checkpoint);
                    return false;
                }
            }
        }
        true
    }

    fn finish_integer(&mut self, start: Location, value: u64) -> TokenKind {
        if value > u32::MAX as u64 {
            self.diagnostics.warning(
                start,
                codes::IMPLICIT_TRUNCATION,
                "integer literal overflows 32 bits, saturating",
            );
            return TokenKind::UintLiteral(u32::MAX);
        }
        TokenKind::UintLiteral(value as u32)
    }

    fn finish_integer_signed(&mut self, start: Location, value: u64) -> TokenKind {
        if value > i32::MAX as u64 {
            if value <= u32::MAX as u64 {
                return TokenKind::UintLiteral(value as u32);
            }
            self.diagnostics.warning(
                start,
                codes::IMPLICIT_TRUNCATION,
                "integer literal overflows 32 bits, saturating",
            );
            return TokenKind::IntLiteral(i32::MAX);
        }
        TokenKind::IntLiteral(value as i32)
    }

    fn lex_operator(&mut self, start: Location) -> TokenKind {
        use TokenKind::*;
        let c = self.advance().unwrap();
        match c {
            b'!' => {
                if self.eat(b'=') {
                    ExclaimEqual
                } else {
                    Exclaim
                }
            }
            b'#' => Hash,
            b'%' => {
                if self.eat(b'=') {
                    PercentEqual
                } else {
                    Percent
                }
            }
            b'&' => {
                if self.eat(b'&') {
                    AmpersandAmpersand
                } else if self.eat(b'=') {
                    AmpersandEqual
                } else {
                    Ampersand
                }
            }
            b'(' => ParenOpen,
            b')' => ParenClose,
            b'*' => {
                if self.eat(b'=') {
                    StarEqual
                } else {
                    Star
                }
            }
            b'+' => {
                if self.eat(b'+') {
                    PlusPlus
                } else if self.eat(b'=') {
                    PlusEqual
                } else {
                    Plus
                }
            }
            b',' => Comma,
            b'-' => {
                if self.eat(b'-') {
                    MinusMinus
                } else if self.eat(b'=') {
                    MinusEqual
                } else {
                    Minus
                }
            }
            b'.' => Dot,
            b'/' => {
                if self.eat(b'=') {
                    SlashEqual
                } else {
                    Slash
                }
            }
            b':' => {
                if self.eat(b':') {
                    ColonColon
                } else {
                    Colon
                }
            }
            b';' => Semicolon,
            b'<' => {
                if self.eat(b'<') {
                    if self.eat(b'=') {
                        LessLessEqual
                    } else {
                        LessLess
                    }
                } else if self.eat(b'=') {
                    LessEqual
                } else {
                    Less
                }
            }
            b'=' => {
                if self.eat(b'=') {
                    EqualEqual
                } else {
                    Equal
                }
            }
            b'>' => {
                if self.eat(b'>') {
                    if self.eat(b'=') {
                        GreaterGreaterEqual
                    } else {
                        GreaterGreater
                    }
                } else if self.eat(b'=') {
                    GreaterEqual
                } else {
                    Greater
                }
            }
            b'?' => Question,
            b'[' => BracketOpen,
            b']' => BracketClose,
            b'^' => {
                if self.eat(b'=') {
                    CaretEqual
                } else {
                    Caret
                }
            }
            b'{' => BraceOpen,
            b'|' => {
                if self.eat(b'|') {
                    PipePipe
                } else if self.eat(b'=') {
                    PipeEqual
                } else {
                    Pipe
                }
            }
            b'}' => BraceClose,
            b'~' => Tilde,
            other => {
                self.diagnostics.error(
                    start,
                    codes::SYNTAX_ERROR,
                    format!("unexpected character '{}'", other as char),
                );
                EndOfStream
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.lex();
            if tok.kind == TokenKind::EndOfStream {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn skips_comments() {
        let toks = lex_all("// comment\nfloat /* inline */ x;");
        assert_eq!(
            toks,
            vec![
                TokenKind::Float,
                TokenKind::Identifier("x".into()),
                TokenKind::Semicolon
            ]
        );
    }

    #[test]
    fn numeric_suffixes() {
        let toks = lex_all("1u 2.0f 3.0lf 4");
        assert_eq!(
            toks,
            vec![
                TokenKind::UintLiteral(1),
                TokenKind::FloatLiteral(2.0),
                TokenKind::DoubleLiteral(3.0),
                TokenKind::IntLiteral(4),
            ]
        );
    }

    #[test]
    fn hex_and_octal_literals() {
        let toks = lex_all("0xFF 010");
        assert_eq!(
            toks,
            vec![TokenKind::UintLiteral(255), TokenKind::UintLiteral(8)]
        );
    }

    #[test]
    fn adjacent_string_concatenation() {
        let toks = lex_all("\"foo\" \"bar\"");
        assert_eq!(toks, vec![TokenKind::StringLiteral("foobar".into())]);
    }

    #[test]
    fn compound_operators() {
        let toks = lex_all("<<= >>= && || == !=");
        assert_eq!(
            toks,
            vec![
                TokenKind::LessLessEqual,
                TokenKind::GreaterGreaterEqual,
                TokenKind::AmpersandAmpersand,
                TokenKind::PipePipe,
                TokenKind::EqualEqual,
                TokenKind::ExclaimEqual,
            ]
        );
    }

    #[test]
    fn line_directive_resets_line_number() {
        let mut lexer = Lexer::new("#line 42\nfloat x;");
        let tok = lexer.lex();
        assert_eq!(tok.location.line, 42);
    }

    #[test]
    fn unterminated_block_comment_is_an_error() {
        let mut lexer = Lexer::new("/* never closed");
        lexer.lex();
        assert!(!lexer.diagnostics.is_viable());
    }

    #[test]
    fn checkpoint_restores_position() {
        let mut lexer = Lexer::new("(float)");
        let cp = lexer.checkpoint();
        let first = lexer.lex();
        assert_eq!(first.kind, TokenKind::ParenOpen);
        lexer.restore(cp);
        let replayed = lexer.lex();
        assert_eq!(replayed.kind, TokenKind::ParenOpen);
    }
}
