use alloc::string::String;
use alloc::vec::Vec;
use std::io;

use crate::source::{ChunkedSource, CodeUnit, IoSource, SliceSource, Source};
use crate::{SyntaxError, SyntaxErrorKind, Token};

// -----------------------------------------------------------------------------
// JsonReader

/// A streaming JSON lexer with a strict peek-then-consume protocol.
///
/// The reader is always in one of three states:
///
/// - *ready*: [`peek_token`](Self::peek_token) may be called any number of
///   times and returns the same token. The peeked token must then be consumed
///   the one way it permits: [`consume_fixed_token`](Self::consume_fixed_token)
///   for brackets and literals, [`consume_number`](Self::consume_number) for
///   numbers, [`start_consuming_string`](Self::start_consuming_string) for
///   strings.
/// - *mid-string*: characters are pulled with
///   [`next_string_char`](Self::next_string_char) until it returns `-1`, or
///   skipped in bulk.
/// - *closed*: the top-level value has been consumed and `peek_token`
///   returns [`Token::EndOfInput`].
///
/// The reader validates JSON structure (nesting, separators, literal
/// spelling, number grammar, string escapes and encoding) and reports
/// malformed input as a [`SyntaxError`]. Whether a well-formed token is the
/// right one for the context is the caller's business.
///
/// Calling a consuming method that does not match the peeked token is a
/// protocol violation and panics.
pub trait JsonReader {
    /// Look at the next token without consuming it.
    ///
    /// Skips whitespace and the one separator (`,` or `:`) the current
    /// position requires.
    fn peek_token(&mut self) -> Result<Token, SyntaxError>;

    /// Consume the peeked bracket or literal `token`.
    fn consume_fixed_token(&mut self, token: Token) -> Result<(), SyntaxError>;

    /// Consume the peeked number and return its source text.
    fn consume_number(&mut self) -> Result<&str, SyntaxError>;

    /// Consume the opening quote of the peeked string.
    fn start_consuming_string(&mut self) -> Result<(), SyntaxError>;

    /// The next character of the current string, or `-1` once the closing
    /// quote has been consumed.
    ///
    /// Characters are delivered either as full code points or as UTF-16
    /// surrogate halves; `\u` escapes always deliver single UTF-16 units.
    fn next_string_char(&mut self) -> Result<i32, SyntaxError>;

    /// Skip up to `n` characters of the current string. Returns how many were
    /// skipped; fewer than `n` means the string ended and is fully consumed.
    fn skip_string_chars(&mut self, n: usize) -> Result<usize, SyntaxError> {
        for skipped in 0..n {
            if self.next_string_char()? < 0 {
                return Ok(skipped);
            }
        }
        Ok(n)
    }

    /// Skip the rest of the current string, including the closing quote.
    fn skip_to_end_of_string(&mut self) -> Result<(), SyntaxError> {
        while self.next_string_char()? >= 0 {}
        Ok(())
    }

    /// Current position, in code units from the start of the input.
    fn offset(&self) -> usize;

    /// A short excerpt of the input around the current position.
    fn preview(&self) -> String;
}

/// Read the rest of a string whose opening quote has been consumed, joining
/// surrogate pairs.
pub fn read_string_chars<R: JsonReader + ?Sized>(
    reader: &mut R,
    out: &mut String,
) -> Result<(), SyntaxError> {
    loop {
        let c = reader.next_string_char()?;
        if c < 0 {
            return Ok(());
        }
        let c = c as u32;
        if (0xD800..0xDC00).contains(&c) {
            let low = reader.next_string_char()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(surrogate_error(reader, c));
            }
            let code = 0x10000 + ((c - 0xD800) << 10) + (low as u32 - 0xDC00);
            out.push(char::from_u32(code).ok_or_else(|| surrogate_error(reader, c))?);
        } else {
            out.push(char::from_u32(c).ok_or_else(|| surrogate_error(reader, c))?);
        }
    }
}

/// Consume the peeked string and return its content.
pub fn read_string<R: JsonReader + ?Sized>(reader: &mut R) -> Result<String, SyntaxError> {
    reader.start_consuming_string()?;
    let mut out = String::new();
    read_string_chars(reader, &mut out)?;
    Ok(out)
}

fn surrogate_error<R: JsonReader + ?Sized>(reader: &R, unit: u32) -> SyntaxError {
    SyntaxError {
        offset: reader.offset(),
        kind: SyntaxErrorKind::UnpairedSurrogate(unit),
        preview: reader.preview().into_boxed_str(),
    }
}

// -----------------------------------------------------------------------------
// Structural state

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Frame {
    /// After `[`.
    ArrayStart,
    /// After `,` in an array; a value must follow.
    ArrayValue,
    /// After an array element.
    ArrayNext,
    /// After `{`.
    ObjectStart,
    /// After `,` in an object; a key must follow.
    ObjectKey,
    /// After a key; `:` must follow.
    ObjectColon,
    /// After `:`; a value must follow.
    ObjectValue,
    /// After a member value.
    ObjectNext,
}

// -----------------------------------------------------------------------------
// TextReader

/// The [`JsonReader`] implementation, generic over the code unit (`u8` for
/// UTF-8, `u16` for UTF-16) and the input [`Source`].
///
/// # Examples
///
/// ```
/// use rj_json::{read_string, JsonReader, TextReader, Token};
///
/// let mut reader = TextReader::from_str(r#"["aé", 12.5]"#);
/// assert_eq!(reader.peek_token().unwrap(), Token::BeginArray);
/// reader.consume_fixed_token(Token::BeginArray).unwrap();
/// assert_eq!(reader.peek_token().unwrap(), Token::String);
/// assert_eq!(read_string(&mut reader).unwrap(), "aé");
/// assert_eq!(reader.peek_token().unwrap(), Token::Number);
/// assert_eq!(reader.consume_number().unwrap(), "12.5");
/// reader.peek_token().unwrap();
/// reader.consume_fixed_token(Token::EndArray).unwrap();
/// assert_eq!(reader.peek_token().unwrap(), Token::EndOfInput);
/// ```
pub struct TextReader<U: CodeUnit, S: Source<U>> {
    source: S,
    buf: Vec<U>,
    pos: usize,
    /// Offset of `buf[0]` in the whole input.
    base: usize,
    exhausted: bool,
    stack: Vec<Frame>,
    root_done: bool,
    peeked: Option<Token>,
    in_string: bool,
    number: String,
}

pub type Utf8Reader<'a> = TextReader<u8, SliceSource<'a, u8>>;
pub type Utf16Reader<'a> = TextReader<u16, SliceSource<'a, u16>>;

impl<'a> TextReader<u8, SliceSource<'a, u8>> {
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(input: &'a str) -> Self {
        Self::new(SliceSource::new(input.as_bytes()))
    }

    #[inline]
    pub fn from_utf8(input: &'a [u8]) -> Self {
        Self::new(SliceSource::new(input))
    }
}

impl<'a> TextReader<u16, SliceSource<'a, u16>> {
    #[inline]
    pub fn from_utf16(input: &'a [u16]) -> Self {
        Self::new(SliceSource::new(input))
    }
}

impl<'a, U: CodeUnit> TextReader<U, ChunkedSource<'a, U>> {
    #[inline]
    pub fn chunked(input: &'a [U], chunk: usize) -> Self {
        Self::new(ChunkedSource::new(input, chunk))
    }
}

impl<R: io::Read> TextReader<u8, IoSource<R>> {
    #[inline]
    pub fn from_io(inner: R) -> Self {
        Self::new(IoSource::new(inner))
    }
}

impl<U: CodeUnit, S: Source<U>> TextReader<U, S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buf: Vec::new(),
            pos: 0,
            base: 0,
            exhausted: false,
            stack: Vec::new(),
            root_done: false,
            peeked: None,
            in_string: false,
            number: String::new(),
        }
    }

    /// Current nesting depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    // ------------------------------------------------------------------
    // Input

    fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError {
            offset: self.base + self.pos,
            kind,
            preview: self.preview().into_boxed_str(),
        }
    }

    fn fill(&mut self) -> Result<bool, SyntaxError> {
        if self.exhausted {
            return Ok(false);
        }
        // Keep the tail of the previous chunk for previews.
        let keep = self.pos.min(self.buf.len()).min(PREVIEW_BEFORE);
        let drop = self.buf.len() - keep;
        self.buf.drain(..drop);
        self.base += drop;
        self.pos = keep;
        match self.source.read_chunk(&mut self.buf) {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.exhausted = true;
                Ok(false)
            }
            Err(e) => Err(self.error(SyntaxErrorKind::Io(e.to_string().into_boxed_str()))),
        }
    }

    #[inline]
    fn peek_unit(&mut self) -> Result<Option<u32>, SyntaxError> {
        if self.pos == self.buf.len() && !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.buf[self.pos].value()))
    }

    #[inline]
    fn next_unit(&mut self) -> Result<Option<u32>, SyntaxError> {
        let unit = self.peek_unit()?;
        if unit.is_some() {
            self.pos += 1;
        }
        Ok(unit)
    }

    fn skip_whitespace(&mut self) -> Result<Option<u32>, SyntaxError> {
        loop {
            match self.peek_unit()? {
                Some(0x20 | 0x09 | 0x0A | 0x0D) => self.pos += 1,
                other => return Ok(other),
            }
        }
    }

    fn unexpected(&self, unit: Option<u32>) -> SyntaxError {
        match unit {
            None => self.error(SyntaxErrorKind::UnexpectedEnd),
            Some(u) => self.error(SyntaxErrorKind::UnexpectedCharacter(
                char::from_u32(u).unwrap_or(char::REPLACEMENT_CHARACTER),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Tokens

    fn value_token(&self, unit: Option<u32>) -> Result<Token, SyntaxError> {
        match unit.and_then(char::from_u32) {
            Some('{') => Ok(Token::BeginObject),
            Some('[') => Ok(Token::BeginArray),
            Some('"') => Ok(Token::String),
            Some('-' | '0'..='9') => Ok(Token::Number),
            Some('t') => Ok(Token::True),
            Some('f') => Ok(Token::False),
            Some('n') => Ok(Token::Null),
            Some(c @ (',' | ':')) => Err(self.error(SyntaxErrorKind::MisplacedSeparator(c))),
            _ => Err(self.unexpected(unit)),
        }
    }

    fn scan_token(&mut self) -> Result<Token, SyntaxError> {
        let unit = self.skip_whitespace()?;
        let c = unit.and_then(char::from_u32);
        let Some(frame) = self.stack.last().copied() else {
            return match unit {
                None if self.root_done => Ok(Token::EndOfInput),
                None => Err(self.error(SyntaxErrorKind::UnexpectedEnd)),
                Some(_) if self.root_done => Err(self.error(SyntaxErrorKind::TrailingContent)),
                Some(_) => self.value_token(unit),
            };
        };
        match frame {
            Frame::ArrayStart => match c {
                Some(']') => Ok(Token::EndArray),
                _ => self.value_token(unit),
            },
            Frame::ArrayValue | Frame::ObjectValue => self.value_token(unit),
            Frame::ArrayNext => match c {
                Some(']') => Ok(Token::EndArray),
                Some(',') => {
                    self.pos += 1;
                    self.set_top(Frame::ArrayValue);
                    let unit = self.skip_whitespace()?;
                    self.value_token(unit)
                }
                None => Err(self.unexpected(unit)),
                Some(_) => Err(self.error(SyntaxErrorKind::MissingSeparator(','))),
            },
            Frame::ObjectStart | Frame::ObjectKey => match c {
                Some('"') => Ok(Token::String),
                Some('}') if frame == Frame::ObjectStart => Ok(Token::EndObject),
                Some(c @ (',' | ':')) => Err(self.error(SyntaxErrorKind::MisplacedSeparator(c))),
                _ => Err(self.unexpected(unit)),
            },
            Frame::ObjectColon => match c {
                Some(':') => {
                    self.pos += 1;
                    self.set_top(Frame::ObjectValue);
                    let unit = self.skip_whitespace()?;
                    self.value_token(unit)
                }
                None => Err(self.unexpected(unit)),
                Some(_) => Err(self.error(SyntaxErrorKind::MissingSeparator(':'))),
            },
            Frame::ObjectNext => match c {
                Some('}') => Ok(Token::EndObject),
                Some(',') => {
                    self.pos += 1;
                    self.set_top(Frame::ObjectKey);
                    match self.skip_whitespace()? {
                        Some(0x22) => Ok(Token::String),
                        Some(0x2C) => Err(self.error(SyntaxErrorKind::MisplacedSeparator(','))),
                        other => Err(self.unexpected(other)),
                    }
                }
                None => Err(self.unexpected(unit)),
                Some(_) => Err(self.error(SyntaxErrorKind::MissingSeparator(','))),
            },
        }
    }

    #[inline]
    fn set_top(&mut self, frame: Frame) {
        if let Some(top) = self.stack.last_mut() {
            *top = frame;
        }
    }

    /// Advance the enclosing structure past a completed value (or key).
    fn value_completed(&mut self) {
        match self.stack.last_mut() {
            None => self.root_done = true,
            Some(top) => {
                *top = match *top {
                    Frame::ArrayStart | Frame::ArrayValue | Frame::ArrayNext => Frame::ArrayNext,
                    Frame::ObjectStart | Frame::ObjectKey => Frame::ObjectColon,
                    Frame::ObjectValue | Frame::ObjectColon | Frame::ObjectNext => {
                        Frame::ObjectNext
                    }
                }
            }
        }
    }

    fn take_peeked(&mut self, expected: Token) {
        match self.peeked.take() {
            Some(token) if token == expected => {}
            other => panic!("cannot consume {expected}: the peeked token is {other:?}"),
        }
    }

    /// Check that a literal or number is followed by a delimiter.
    fn expect_delimiter(&mut self, kind: SyntaxErrorKind) -> Result<(), SyntaxError> {
        match self.peek_unit()? {
            None | Some(0x20 | 0x09 | 0x0A | 0x0D | 0x2C | 0x5D | 0x7D) => Ok(()),
            Some(_) => Err(self.error(kind)),
        }
    }

    fn consume_literal(&mut self, literal: &str) -> Result<(), SyntaxError> {
        for expected in literal.bytes() {
            match self.peek_unit()? {
                Some(u) if u == u32::from(expected) => self.pos += 1,
                _ => return Err(self.error(SyntaxErrorKind::InvalidLiteral)),
            }
        }
        self.expect_delimiter(SyntaxErrorKind::InvalidLiteral)
    }

    // ------------------------------------------------------------------
    // Numbers

    fn digits(&mut self) -> Result<usize, SyntaxError> {
        let mut count = 0;
        while let Some(u @ 0x30..=0x39) = self.peek_unit()? {
            self.number.push(u as u8 as char);
            self.pos += 1;
            count += 1;
        }
        Ok(count)
    }

    fn accept(&mut self, chars: &[u8]) -> Result<bool, SyntaxError> {
        match self.peek_unit()? {
            Some(u) if chars.iter().any(|c| u32::from(*c) == u) => {
                self.number.push(u as u8 as char);
                self.pos += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn scan_number(&mut self) -> Result<(), SyntaxError> {
        self.number.clear();
        self.accept(b"-")?;
        if self.accept(b"0")? {
            // No leading zeros.
        } else if self.digits()? == 0 {
            return Err(self.error(SyntaxErrorKind::InvalidNumber));
        }
        if self.accept(b".")? && self.digits()? == 0 {
            return Err(self.error(SyntaxErrorKind::InvalidNumber));
        }
        if self.accept(b"eE")? {
            self.accept(b"+-")?;
            if self.digits()? == 0 {
                return Err(self.error(SyntaxErrorKind::InvalidNumber));
            }
        }
        self.expect_delimiter(SyntaxErrorKind::InvalidNumber)
    }

    // ------------------------------------------------------------------
    // Strings

    fn hex_digit(&mut self) -> Result<u32, SyntaxError> {
        match self.next_unit()?.and_then(char::from_u32).and_then(|c| c.to_digit(16)) {
            Some(d) => Ok(d),
            None => Err(self.error(SyntaxErrorKind::InvalidEscape)),
        }
    }

    fn escape(&mut self) -> Result<i32, SyntaxError> {
        let Some(unit) = self.next_unit()? else {
            return Err(self.error(SyntaxErrorKind::UnterminatedString));
        };
        let c = match char::from_u32(unit) {
            Some('"') => 0x22,
            Some('\\') => 0x5C,
            Some('/') => 0x2F,
            Some('b') => 0x08,
            Some('f') => 0x0C,
            Some('n') => 0x0A,
            Some('r') => 0x0D,
            Some('t') => 0x09,
            Some('u') => {
                let mut code = 0;
                for _ in 0..4 {
                    code = (code << 4) | self.hex_digit()?;
                }
                code
            }
            _ => return Err(self.error(SyntaxErrorKind::InvalidEscape)),
        };
        Ok(c as i32)
    }

    fn continuation(&mut self) -> Result<u32, SyntaxError> {
        match self.peek_unit()? {
            Some(u) if u & 0xC0 == 0x80 => {
                self.pos += 1;
                Ok(u & 0x3F)
            }
            _ => Err(self.error(SyntaxErrorKind::InvalidUtf8)),
        }
    }

    fn utf8_sequence(&mut self, lead: u32) -> Result<i32, SyntaxError> {
        let (len, init, min) = match lead {
            0xC2..=0xDF => (1, lead & 0x1F, 0x80),
            0xE0..=0xEF => (2, lead & 0x0F, 0x800),
            0xF0..=0xF4 => (3, lead & 0x07, 0x10000),
            _ => return Err(self.error(SyntaxErrorKind::InvalidUtf8)),
        };
        let mut code = init;
        for _ in 0..len {
            code = (code << 6) | self.continuation()?;
        }
        if code < min || code > 0x10FFFF || (0xD800..0xE000).contains(&code) {
            return Err(self.error(SyntaxErrorKind::InvalidUtf8));
        }
        Ok(code as i32)
    }
}

const PREVIEW_BEFORE: usize = 16;
const PREVIEW_AFTER: usize = 16;

impl<U: CodeUnit, S: Source<U>> JsonReader for TextReader<U, S> {
    fn peek_token(&mut self) -> Result<Token, SyntaxError> {
        assert!(!self.in_string, "cannot peek inside a string");
        if let Some(token) = self.peeked {
            return Ok(token);
        }
        let token = self.scan_token()?;
        self.peeked = Some(token);
        Ok(token)
    }

    fn consume_fixed_token(&mut self, token: Token) -> Result<(), SyntaxError> {
        self.take_peeked(token);
        match token {
            Token::BeginArray => {
                self.pos += 1;
                self.stack.push(Frame::ArrayStart);
            }
            Token::BeginObject => {
                self.pos += 1;
                self.stack.push(Frame::ObjectStart);
            }
            Token::EndArray | Token::EndObject => {
                self.pos += 1;
                self.stack.pop();
                self.value_completed();
            }
            Token::True | Token::False | Token::Null => {
                let literal = token.literal().unwrap_or_default();
                self.consume_literal(literal)?;
                self.value_completed();
            }
            Token::EndOfInput => {}
            Token::String | Token::Number => {
                panic!("{token} is not a fixed token")
            }
        }
        Ok(())
    }

    fn consume_number(&mut self) -> Result<&str, SyntaxError> {
        self.take_peeked(Token::Number);
        self.scan_number()?;
        self.value_completed();
        Ok(&self.number)
    }

    fn start_consuming_string(&mut self) -> Result<(), SyntaxError> {
        self.take_peeked(Token::String);
        self.pos += 1;
        self.in_string = true;
        Ok(())
    }

    fn next_string_char(&mut self) -> Result<i32, SyntaxError> {
        assert!(self.in_string, "no string is being consumed");
        let Some(unit) = self.next_unit()? else {
            return Err(self.error(SyntaxErrorKind::UnterminatedString));
        };
        match unit {
            0x22 => {
                self.in_string = false;
                self.value_completed();
                Ok(-1)
            }
            0x5C => self.escape(),
            0x00..=0x1F => {
                self.pos -= 1;
                Err(self.error(SyntaxErrorKind::ControlCharacter(unit)))
            }
            0x80..=u32::MAX if U::IS_UTF8 => self.utf8_sequence(unit),
            _ => Ok(unit as i32),
        }
    }

    #[inline]
    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn preview(&self) -> String {
        let pos = self.pos.min(self.buf.len());
        let start = pos.saturating_sub(PREVIEW_BEFORE);
        let end = (pos + PREVIEW_AFTER).min(self.buf.len());
        U::lossy(&self.buf[start..end])
    }
}

impl<U: CodeUnit, S: Source<U>> core::fmt::Debug for TextReader<U, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TextReader")
            .field("offset", &self.offset())
            .field("depth", &self.stack.len())
            .field("peeked", &self.peeked)
            .field("in_string", &self.in_string)
            .finish_non_exhaustive()
    }
}
