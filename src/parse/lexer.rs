//! Ruby tokenizer.
//!
//! Lenient on syntax: any valid UTF-8 input produces a token sequence that
//! covers the text exactly, with no gaps. Only the method-call operators get
//! dedicated kinds; everything else is classified just far enough to tell
//! receivers, literals and line structure apart, so that operators inside
//! strings, comments, regexps and heredocs are never reported.

use thiserror::Error;

use crate::parse::span::{PositionCursor, SourceSpan};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("invalid UTF-8 at byte offset {offset}")]
    InvalidUtf8 { offset: usize },
}

/// The three operators that invoke a method or resolve a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallOperator {
    /// `.`
    Dot,
    /// `&.`
    SafeNavigation,
    /// `::`
    DoubleColon,
}

impl CallOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOperator::Dot => ".",
            CallOperator::SafeNavigation => "&.",
            CallOperator::DoubleColon => "::",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Constant,
    Keyword,
    /// `@ivar`, `@@cvar`, `$gvar`
    Variable,
    Number,
    /// Quoted strings, `?c` literals, percent literals and heredoc openers.
    String,
    Symbol,
    Regexp,
    HeredocBody,
    /// `# ...` and `=begin`/`=end` blocks.
    Comment,
    CallOperator(CallOperator),
    OpenDelimiter,
    CloseDelimiter,
    Punct,
    /// Horizontal whitespace run (never contains a newline).
    Whitespace,
    /// `\n` or `\r\n`
    Newline,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: SourceSpan,
}

impl Token<'_> {
    pub fn call_operator(&self) -> Option<CallOperator> {
        match self.kind {
            TokenKind::CallOperator(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }

    /// Whether this token can end the receiver of a method call.
    pub fn is_receiver(&self) -> bool {
        is_receiver(self.kind, self.text)
    }
}

const KEYWORDS: &[&str] = &[
    "BEGIN", "END", "__ENCODING__", "__FILE__", "__LINE__", "alias", "and", "begin", "break",
    "case", "class", "def", "defined?", "do", "else", "elsif", "end", "ensure", "false", "for",
    "if", "in", "module", "next", "nil", "not", "or", "redo", "rescue", "retry", "return",
    "self", "super", "then", "true", "undef", "unless", "until", "when", "while", "yield",
];

/// Keywords that evaluate to a value and may be followed by `.method`.
const RECEIVER_KEYWORDS: &[&str] = &[
    "self", "nil", "true", "false", "end", "super", "yield", "__FILE__", "__LINE__",
    "__ENCODING__",
];

/// Receiver keywords that also take arguments like a method call.
const CALL_KEYWORDS: &[&str] = &["super", "yield"];

/// Multi-byte punctuators, longest first. `.`-based operators are handled
/// separately.
const PUNCTUATORS: &[&str] = &[
    "**=", "<=>", "===", "<<=", ">>=", "&&=", "||=", "**", "==", "!=", ">=", "<=", "&&", "||",
    "<<", ">>", "=~", "!~", "+=", "-=", "*=", "/=", "%=", "|=", "&=", "^=", "->", "=>",
];

/// Symbol names made of operator characters, longest first.
const OPERATOR_SYMBOLS: &[&str] = &[
    "[]=", "<=>", "===", "[]", "==", "=~", "!=", "!~", "**", "+@", "-@", "<<", ">>", "<=", ">=",
    "+", "-", "*", "/", "%", "<", ">", "!", "&", "|", "^", "~",
];

/// Nested interpolation deeper than this is scanned as plain text.
const MAX_NESTING: usize = 64;

fn is_receiver(kind: TokenKind, text: &str) -> bool {
    match kind {
        TokenKind::Identifier
        | TokenKind::Constant
        | TokenKind::Variable
        | TokenKind::Number
        | TokenKind::String
        | TokenKind::Symbol
        | TokenKind::Regexp
        | TokenKind::CloseDelimiter => true,
        TokenKind::Keyword => RECEIVER_KEYWORDS.contains(&text),
        _ => false,
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn is_horizontal_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | 0x0b | 0x0c)
}

fn closing_delimiter(open: u8) -> u8 {
    match open {
        b'(' => b')',
        b'[' => b']',
        b'{' => b'}',
        b'<' => b'>',
        other => other,
    }
}

/// Tokenize decoded source text.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    Lexer::new(text).tokenize()
}

/// Decode source bytes as UTF-8.
pub fn decode(bytes: &[u8]) -> Result<&str, TokenizeError> {
    std::str::from_utf8(bytes).map_err(|e| TokenizeError::InvalidUtf8 {
        offset: e.valid_up_to(),
    })
}

/// Tokenize raw bytes, failing only if they are not valid UTF-8.
pub fn tokenize_bytes(bytes: &[u8]) -> Result<Vec<Token<'_>>, TokenizeError> {
    Ok(tokenize(decode(bytes)?))
}

struct PendingHeredoc {
    terminator: String,
    /// `<<~` and `<<-` allow the terminator to be indented.
    indented: bool,
}

struct Lexer<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
    /// (kind, start, end) byte ranges; positions are resolved at the end.
    raw: Vec<(TokenKind, usize, usize)>,
    pending_heredocs: Vec<PendingHeredoc>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
            raw: Vec::new(),
            pending_heredocs: Vec::new(),
        }
    }

    fn tokenize(mut self) -> Vec<Token<'a>> {
        if self.text.starts_with('\u{feff}') {
            self.pos = '\u{feff}'.len_utf8();
            self.push(TokenKind::Other, 0);
        }

        while self.pos < self.input.len() {
            let start = self.pos;
            let kind = self.next_kind();
            debug_assert!(self.pos > start, "lexer made no progress at {start}");
            self.push(kind, start);
            if kind == TokenKind::Newline && !self.pending_heredocs.is_empty() {
                self.read_heredoc_bodies();
            }
        }

        // Raw tokens tile the input in order, so one forward cursor resolves
        // every position.
        let text = self.text;
        let mut cursor = PositionCursor::new(text);
        self.raw
            .into_iter()
            .map(|(kind, start, end)| Token {
                kind,
                text: &text[start..end],
                span: cursor.span(start..end),
            })
            .collect()
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.raw.push((kind, start, self.pos));
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.input.get(self.pos + n).copied()
    }

    fn read_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.input[self.pos - 1] == b'\n'
    }

    /// Index of the `\n` ending the line that contains `from`, or the input
    /// length.
    fn line_end_from(&self, from: usize) -> usize {
        self.input[from..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.input.len(), |i| from + i)
    }

    /// Line end excluding a `\r` that belongs to a `\r\n` pair.
    fn content_end(&self, line_start: usize, line_end: usize) -> usize {
        if line_end < self.input.len() && line_end > line_start && self.input[line_end - 1] == b'\r'
        {
            line_end - 1
        } else {
            line_end
        }
    }

    fn prev_significant(&self) -> Option<(TokenKind, &'a str)> {
        self.raw
            .iter()
            .rev()
            .find(|(kind, ..)| *kind != TokenKind::Whitespace)
            .map(|&(kind, start, end)| (kind, &self.text[start..end]))
    }

    /// Whether a literal may start here. An opener of `opener_len` bytes
    /// begins a literal after any non-receiver token. After an identifier,
    /// `super` or `yield` it needs whitespace before it and none after it
    /// (`puts /re/`, `foo <<~EOS`).
    fn operand_position(&self, opener_len: usize) -> bool {
        match self.prev_significant() {
            None => true,
            Some((kind, text)) if !is_receiver(kind, text) => true,
            Some((kind, text))
                if kind == TokenKind::Identifier
                    || (kind == TokenKind::Keyword && CALL_KEYWORDS.contains(&text)) =>
            {
                let spaced_before = self.pos > 0 && is_horizontal_space(self.input[self.pos - 1]);
                let spaced_after = self
                    .peek_at(opener_len)
                    .is_none_or(|b| b.is_ascii_whitespace() || b == b'=');
                spaced_before && !spaced_after
            }
            Some(_) => false,
        }
    }

    /// A word right after a call operator is a method or constant name, even
    /// when it spells a keyword.
    fn follows_call_operator(&self) -> bool {
        self.raw
            .iter()
            .rev()
            .find(|(kind, ..)| {
                !matches!(
                    kind,
                    TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment
                )
            })
            .is_some_and(|(kind, ..)| matches!(kind, TokenKind::CallOperator(_)))
    }

    fn next_kind(&mut self) -> TokenKind {
        let b = self.input[self.pos];
        match b {
            b'\n' => {
                self.pos += 1;
                TokenKind::Newline
            }
            b'\r' if self.peek_at(1) == Some(b'\n') => {
                self.pos += 2;
                TokenKind::Newline
            }
            _ if is_horizontal_space(b) => {
                loop {
                    self.read_while(|c| is_horizontal_space(c) && c != b'\r');
                    // A lone `\r` is whitespace; `\r\n` is left for the newline.
                    if self.peek() == Some(b'\r') && self.peek_at(1) != Some(b'\n') {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                TokenKind::Whitespace
            }
            b'#' => {
                let end = self.line_end_from(self.pos);
                self.pos = self.content_end(self.pos, end).max(self.pos + 1);
                TokenKind::Comment
            }
            b'=' if self.at_line_start() && self.starts_marker(self.pos, "=begin") => {
                self.embedded_document();
                TokenKind::Comment
            }
            b'_' if self.at_line_start() && self.is_end_marker() => {
                self.pos = self.input.len();
                TokenKind::Other
            }
            b'.' => {
                if self.peek_at(1) == Some(b'.') {
                    self.pos += if self.peek_at(2) == Some(b'.') { 3 } else { 2 };
                    TokenKind::Punct
                } else {
                    self.pos += 1;
                    TokenKind::CallOperator(CallOperator::Dot)
                }
            }
            b'&' if self.peek_at(1) == Some(b'.') => {
                self.pos += 2;
                TokenKind::CallOperator(CallOperator::SafeNavigation)
            }
            b':' if self.peek_at(1) == Some(b':') => {
                self.pos += 2;
                TokenKind::CallOperator(CallOperator::DoubleColon)
            }
            b':' => self.symbol_or_colon(),
            b'\'' => {
                self.pos += 1;
                self.skip_delimited(b'\'', b'\'', false, 0);
                TokenKind::String
            }
            b'"' | b'`' => {
                self.pos += 1;
                self.skip_delimited(b, b, true, 0);
                TokenKind::String
            }
            b'@' => self.instance_variable(),
            b'$' => self.global_variable(),
            b'0'..=b'9' => self.number(),
            b'(' | b'[' | b'{' => {
                self.pos += 1;
                TokenKind::OpenDelimiter
            }
            b')' | b']' | b'}' => {
                self.pos += 1;
                TokenKind::CloseDelimiter
            }
            b'/' if self.operand_position(1) => {
                self.pos += 1;
                self.skip_delimited(b'/', b'/', true, 0);
                self.read_while(|c| c.is_ascii_alphabetic());
                TokenKind::Regexp
            }
            b'%' if self.operand_position(1) => self.percent_literal().unwrap_or_else(|| self.punct()),
            b'?' if self.operand_position(1) => match self.char_literal_len() {
                Some(len) => {
                    self.pos += len;
                    TokenKind::String
                }
                None => self.punct(),
            },
            b'<' if self.peek_at(1) == Some(b'<') && self.heredoc_opener() => TokenKind::String,
            _ if is_ident_start(b) => self.word(),
            _ if b.is_ascii_punctuation() => self.punct(),
            _ => {
                self.pos += 1;
                TokenKind::Other
            }
        }
    }

    fn punct(&mut self) -> TokenKind {
        let rest = &self.input[self.pos..];
        let len = PUNCTUATORS
            .iter()
            .find(|p| rest.starts_with(p.as_bytes()))
            .map_or(1, |p| p.len());
        self.pos += len;
        TokenKind::Punct
    }

    fn word(&mut self) -> TokenKind {
        let start = self.pos;
        self.read_while(is_ident_char);
        let first = self.input[start];
        let method_like = first.is_ascii_lowercase() || first == b'_' || first >= 0x80;
        if method_like
            && matches!(self.peek(), Some(b'?' | b'!'))
            && !matches!(self.peek_at(1), Some(b'=' | b'~'))
        {
            self.pos += 1;
        }
        let word = &self.text[start..self.pos];

        if first.is_ascii_uppercase() {
            TokenKind::Constant
        } else if self.follows_call_operator() || !KEYWORDS.contains(&word) {
            TokenKind::Identifier
        } else {
            TokenKind::Keyword
        }
    }

    fn symbol_or_colon(&mut self) -> TokenKind {
        match self.peek_at(1) {
            Some(q @ (b'"' | b'\'')) => {
                self.pos += 2;
                self.skip_delimited(q, q, q == b'"', 0);
                TokenKind::Symbol
            }
            Some(c) if is_ident_start(c) => {
                self.pos += 1;
                self.read_while(is_ident_char);
                if matches!(self.peek(), Some(b'?' | b'!' | b'='))
                    && !matches!(self.peek_at(1), Some(b'=' | b'~' | b'>'))
                {
                    self.pos += 1;
                }
                TokenKind::Symbol
            }
            Some(b'@') => {
                self.pos += 1;
                self.instance_variable();
                TokenKind::Symbol
            }
            Some(b'$') => {
                self.pos += 1;
                self.global_variable();
                TokenKind::Symbol
            }
            _ => {
                let rest = &self.input[self.pos + 1..];
                match OPERATOR_SYMBOLS.iter().find(|op| rest.starts_with(op.as_bytes())) {
                    Some(op) => {
                        self.pos += 1 + op.len();
                        TokenKind::Symbol
                    }
                    None => {
                        self.pos += 1;
                        TokenKind::Punct
                    }
                }
            }
        }
    }

    fn instance_variable(&mut self) -> TokenKind {
        let sigils = if self.peek_at(1) == Some(b'@') { 2 } else { 1 };
        if self.peek_at(sigils).is_some_and(is_ident_start) {
            self.pos += sigils;
            self.read_while(is_ident_char);
            TokenKind::Variable
        } else {
            self.pos += 1;
            TokenKind::Punct
        }
    }

    fn global_variable(&mut self) -> TokenKind {
        match self.peek_at(1) {
            Some(c) if is_ident_char(c) => {
                self.pos += 1;
                self.read_while(is_ident_char);
                TokenKind::Variable
            }
            Some(b'-') if self.peek_at(2).is_some_and(|c| c.is_ascii_alphanumeric()) => {
                self.pos += 3;
                TokenKind::Variable
            }
            Some(c) if b"!@&`'+~=/\\,;.<>*$?:\"".contains(&c) => {
                self.pos += 2;
                TokenKind::Variable
            }
            _ => {
                self.pos += 1;
                TokenKind::Punct
            }
        }
    }

    fn number(&mut self) -> TokenKind {
        let radix_prefix = self.peek() == Some(b'0')
            && self
                .peek_at(1)
                .is_some_and(|c| matches!(c.to_ascii_lowercase(), b'x' | b'b' | b'o' | b'd'));
        if radix_prefix {
            self.pos += 2;
            self.read_while(|c| c.is_ascii_alphanumeric() || c == b'_');
            return TokenKind::Number;
        }

        self.read_while(|c| c.is_ascii_digit() || c == b'_');
        // `1.5` is a float; `1.to_s` and `1..2` are not.
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            self.read_while(|c| c.is_ascii_digit() || c == b'_');
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let exponent_digits = match self.peek_at(1) {
                Some(b'+' | b'-') => 2,
                _ => 1,
            };
            if self.peek_at(exponent_digits).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += exponent_digits;
                self.read_while(|c| c.is_ascii_digit() || c == b'_');
            }
        }
        // Rational and imaginary suffixes: 3r, 2i, 1ri.
        for suffix in [b'r', b'i'] {
            if self.peek() == Some(suffix) && !self.peek_at(1).is_some_and(is_ident_char) {
                self.pos += 1;
            }
        }
        TokenKind::Number
    }

    /// Scan past a delimited body. `self.pos` must be just after the opening
    /// delimiter; on return it is just after the closing one, or at the end
    /// of input when unterminated.
    fn skip_delimited(&mut self, open: u8, close: u8, interpolates: bool, nesting: usize) {
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            if b == b'\\' {
                self.pos = (self.pos + 2).min(self.input.len());
                continue;
            }
            if interpolates && b == b'#' && self.peek_at(1) == Some(b'{') && nesting < MAX_NESTING {
                self.pos += 2;
                self.skip_interpolation(nesting + 1);
                continue;
            }
            self.pos += 1;
            if b == close {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            } else if b == open {
                depth += 1;
            }
        }
    }

    fn skip_interpolation(&mut self, nesting: usize) {
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                b'"' | b'`' => self.skip_delimited(b, b, true, nesting),
                b'\'' => self.skip_delimited(b'\'', b'\'', false, nesting),
                b'\\' => self.pos = (self.pos + 1).min(self.input.len()),
                _ => {}
            }
        }
    }

    fn percent_literal(&mut self) -> Option<TokenKind> {
        let type_char = self
            .peek_at(1)
            .filter(|c| b"qQwWiIrsx".contains(c));
        let type_len = usize::from(type_char.is_some());
        let open = self.peek_at(1 + type_len)?;
        if open.is_ascii_alphanumeric() || open.is_ascii_whitespace() || open >= 0x80 {
            return None;
        }
        if type_char.is_none() && open == b'=' {
            return None;
        }

        let interpolates = !matches!(type_char, Some(b'q' | b'w' | b'i' | b's'));
        self.pos += 2 + type_len;
        self.skip_delimited(open, closing_delimiter(open), interpolates, 0);
        Some(match type_char {
            Some(b'r') => {
                self.read_while(|c| c.is_ascii_alphabetic());
                TokenKind::Regexp
            }
            Some(b's') => TokenKind::Symbol,
            _ => TokenKind::String,
        })
    }

    /// Length of a `?c` character literal at `self.pos`, if there is one.
    fn char_literal_len(&self) -> Option<usize> {
        let mut chars = self.text[self.pos + 1..].chars();
        let c = chars.next()?;
        if c.is_whitespace() {
            return None;
        }
        let len = if c == '\\' {
            1 + chars.next()?.len_utf8()
        } else {
            c.len_utf8()
        };
        // `?abc` is not a literal.
        let word_char = c.is_alphanumeric() || c == '_';
        if word_char && self.input.get(self.pos + 1 + len).is_some_and(|&b| is_ident_char(b)) {
            return None;
        }
        Some(1 + len)
    }

    /// Recognize `<<~ID`, `<<-ID`, `<<ID` and quoted forms. On success the
    /// opener is consumed and its body is queued for the next line.
    fn heredoc_opener(&mut self) -> bool {
        let mut i = self.pos + 2;
        let indented = matches!(self.input.get(i), Some(b'~' | b'-'));
        if indented {
            i += 1;
        }

        let (terminator, end) = match self.input.get(i).copied() {
            Some(q @ (b'\'' | b'"' | b'`')) => {
                let body = &self.input[i + 1..];
                let Some(close) = body.iter().position(|&c| c == q || c == b'\n') else {
                    return false;
                };
                if body[close] != q {
                    return false;
                }
                (&self.text[i + 1..i + 1 + close], i + 2 + close)
            }
            Some(c) if (indented && is_ident_start(c)) || c.is_ascii_uppercase() => {
                let len = self.input[i..]
                    .iter()
                    .take_while(|&&c| is_ident_char(c))
                    .count();
                (&self.text[i..i + len], i + len)
            }
            _ => return false,
        };

        if !self.operand_position(2) {
            return false;
        }

        self.pending_heredocs.push(PendingHeredoc {
            terminator: terminator.to_string(),
            indented,
        });
        self.pos = end;
        true
    }

    /// Consume the bodies of all heredocs opened on the line that just ended.
    fn read_heredoc_bodies(&mut self) {
        let pending = std::mem::take(&mut self.pending_heredocs);
        for (i, heredoc) in pending.iter().enumerate() {
            if i > 0 {
                // Newline ending the previous terminator line.
                let start = self.pos;
                match self.peek() {
                    Some(b'\n') => self.pos += 1,
                    Some(b'\r') if self.peek_at(1) == Some(b'\n') => self.pos += 2,
                    _ => return,
                }
                self.push(TokenKind::Newline, start);
            }
            if self.pos >= self.input.len() {
                return;
            }

            let start = self.pos;
            loop {
                let line_end = self.line_end_from(self.pos);
                let content_end = self.content_end(self.pos, line_end);
                let line = &self.text[self.pos..content_end];
                let candidate = if heredoc.indented {
                    line.trim_start()
                } else {
                    line
                };
                if candidate == heredoc.terminator {
                    self.pos = content_end;
                    break;
                }
                if line_end >= self.input.len() {
                    self.pos = self.input.len();
                    break;
                }
                self.pos = line_end + 1;
            }
            if self.pos > start {
                self.push(TokenKind::HeredocBody, start);
            }
        }
    }

    /// `marker` at `at`, followed by whitespace or end of input.
    fn starts_marker(&self, at: usize, marker: &str) -> bool {
        self.input[at..].starts_with(marker.as_bytes())
            && self
                .input
                .get(at + marker.len())
                .is_none_or(|b| b.is_ascii_whitespace())
    }

    fn is_end_marker(&self) -> bool {
        let line_end = self.line_end_from(self.pos);
        &self.text[self.pos..self.content_end(self.pos, line_end)] == "__END__"
    }

    /// `=begin` ... `=end` block; ends before the newline of the `=end` line.
    fn embedded_document(&mut self) {
        let mut line_start = self.pos;
        loop {
            let line_end = self.line_end_from(line_start);
            if line_start != self.pos && self.starts_marker(line_start, "=end") {
                self.pos = self.content_end(line_start, line_end);
                return;
            }
            if line_end >= self.input.len() {
                self.pos = self.input.len();
                return;
            }
            line_start = line_end + 1;
        }
    }
}
