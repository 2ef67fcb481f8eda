//! Conformance suite shared by every reader configuration.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::{
    IoSource, JsonReader, SyntaxError, SyntaxErrorKind, TextReader, Token, read_string,
};

/// Walk one value and render the events it produced.
fn events<R: JsonReader + ?Sized>(reader: &mut R, out: &mut String) -> Result<(), SyntaxError> {
    match reader.peek_token()? {
        Token::BeginArray => {
            reader.consume_fixed_token(Token::BeginArray)?;
            out.push('[');
            while reader.peek_token()? != Token::EndArray {
                events(reader, out)?;
                out.push(' ');
            }
            reader.consume_fixed_token(Token::EndArray)?;
            out.push(']');
        }
        Token::BeginObject => {
            reader.consume_fixed_token(Token::BeginObject)?;
            out.push('{');
            while reader.peek_token()? != Token::EndObject {
                let key = read_string(reader)?;
                let _ = write!(out, "{key:?}=");
                events(reader, out)?;
                out.push(' ');
            }
            reader.consume_fixed_token(Token::EndObject)?;
            out.push('}');
        }
        Token::String => {
            let s = read_string(reader)?;
            let _ = write!(out, "{s:?}");
        }
        Token::Number => {
            let n = reader.consume_number()?;
            let _ = write!(out, "#{n}");
        }
        token @ (Token::True | Token::False | Token::Null) => {
            reader.consume_fixed_token(token)?;
            let _ = write!(out, "{token}");
        }
        token => panic!("unexpected {token}"),
    }
    Ok(())
}

fn dump<R: JsonReader + ?Sized>(reader: &mut R) -> Result<String, SyntaxError> {
    let mut out = String::new();
    events(reader, &mut out)?;
    assert_eq!(reader.peek_token()?, Token::EndOfInput);
    Ok(out)
}

fn utf16(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

/// Every reader configuration over the same text.
fn all_dumps(input: &str) -> Vec<Result<String, SyntaxError>> {
    let units = utf16(input);
    let mut results = alloc::vec![
        dump(&mut TextReader::from_str(input)),
        dump(&mut TextReader::from_utf16(&units)),
        dump(&mut TextReader::from_io(input.as_bytes())),
    ];
    for chunk in [1, 2, 3, 5, 7, 64] {
        results.push(dump(&mut TextReader::chunked(input.as_bytes(), chunk)));
        results.push(dump(&mut TextReader::chunked(&units, chunk)));
        results.push(dump(&mut TextReader::new(IoSource::with_capacity(input.as_bytes(), chunk))));
    }
    results
}

fn error_of(input: &str) -> SyntaxErrorKind {
    match dump(&mut TextReader::from_str(input)) {
        Ok(events) => panic!("`{input}` was accepted as {events}"),
        Err(e) => e.kind,
    }
}

const DOCUMENT: &str = r#" {
    "name" : "café \"au lait\"\n",
    "emoji": ["😀", "\ud83d\ude00", "\u00e9€"],
    "numbers": [0, -0, 12, -3.25, 1e10, 2.5E-3, 6.02e+23],
    "flags": [true, false, null],
    "nested": {"empty": {}, "list": [[], [{}]]},
    "escapes": "\/\b\f\r\t\\"
} "#;

#[test]
fn every_configuration_agrees() {
    let results = all_dumps(DOCUMENT);
    let expected = results[0].clone().unwrap();
    assert!(expected.contains(r#""emoji"=["😀" "😀" "é€" ]"#), "{expected}");
    assert!(expected.contains("#-3.25 #1e10 #2.5E-3 #6.02e+23"), "{expected}");
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.as_ref(), Ok(&expected), "configuration #{i}");
    }
}

#[test]
fn errors_agree_across_chunk_sizes() {
    let input = r#"{"a": [1, 2,, 3]}"#;
    let results = all_dumps(input);
    for result in &results {
        let err = result.as_ref().unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::MisplacedSeparator(','));
        assert_eq!(err.offset, 12);
    }
}

#[test]
fn malformed_input() {
    use SyntaxErrorKind::*;

    assert_eq!(error_of(r#""abc"#), UnterminatedString);
    assert_eq!(error_of(r#""a\x""#), InvalidEscape);
    assert_eq!(error_of(r#""\u12g4""#), InvalidEscape);
    assert_eq!(error_of("tru"), InvalidLiteral);
    assert_eq!(error_of("nul1"), InvalidLiteral);
    assert_eq!(error_of("[truex]"), InvalidLiteral);
    assert_eq!(error_of("[1 2]"), MissingSeparator(','));
    assert_eq!(error_of("[1,]"), UnexpectedCharacter(']'));
    assert_eq!(error_of("[,1]"), MisplacedSeparator(','));
    assert_eq!(error_of(r#"{"a" 1}"#), MissingSeparator(':'));
    assert_eq!(error_of(r#"{"a":1,}"#), UnexpectedCharacter('}'));
    assert_eq!(error_of(r#"{1:2}"#), UnexpectedCharacter('1'));
    assert_eq!(error_of("01"), InvalidNumber);
    assert_eq!(error_of("1."), InvalidNumber);
    assert_eq!(error_of("-"), InvalidNumber);
    assert_eq!(error_of("1e"), InvalidNumber);
    assert_eq!(error_of("+1"), UnexpectedCharacter('+'));
    assert_eq!(error_of("\"a\u{1}\""), ControlCharacter(1));
    assert_eq!(error_of(r#""\ud800x""#), UnpairedSurrogate(0xD800));
    assert_eq!(error_of(r#""\udc00""#), UnpairedSurrogate(0xDC00));
    assert_eq!(error_of("1 2"), TrailingContent);
    assert_eq!(error_of(""), UnexpectedEnd);
    assert_eq!(error_of("[1"), UnexpectedEnd);
}

#[test]
fn invalid_utf8() {
    let cases: [&[u8]; 4] = [b"\"\xff\"", b"\"\xc0\x80\"", b"\"\xed\xa0\x80\"", b"\"\xe2\x82\""];
    for bytes in cases {
        let err = dump(&mut TextReader::from_utf8(bytes)).unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidUtf8, "{bytes:?}");
    }
}

#[test]
fn offsets_and_previews() {
    let err = dump(&mut TextReader::from_str("[1, x]")).unwrap_err();
    assert_eq!(err.offset, 4);
    assert_eq!(err.kind, SyntaxErrorKind::UnexpectedCharacter('x'));
    assert!(err.preview.contains("1, x"));
    assert_eq!(err.to_string(), "unexpected character `x` at offset 4, near `[1, x]`");
}

#[test]
fn characters_are_code_points_or_surrogate_halves() {
    let text = "\"😀\"";
    let mut utf8 = TextReader::from_str(text);
    utf8.peek_token().unwrap();
    utf8.start_consuming_string().unwrap();
    assert_eq!(utf8.next_string_char().unwrap(), 0x1F600);
    assert_eq!(utf8.next_string_char().unwrap(), -1);

    let units = utf16(text);
    let mut utf16 = TextReader::from_utf16(&units);
    utf16.peek_token().unwrap();
    utf16.start_consuming_string().unwrap();
    assert_eq!(utf16.next_string_char().unwrap(), 0xD83D);
    assert_eq!(utf16.next_string_char().unwrap(), 0xDE00);
    assert_eq!(utf16.next_string_char().unwrap(), -1);
    assert_eq!(utf16.offset(), units.len());
}

#[test]
fn bulk_skipping() {
    let mut reader = TextReader::from_str(r#"["abcdef", "gh", 1]"#);
    reader.peek_token().unwrap();
    reader.consume_fixed_token(Token::BeginArray).unwrap();

    reader.peek_token().unwrap();
    reader.start_consuming_string().unwrap();
    assert_eq!(reader.skip_string_chars(3).unwrap(), 3);
    assert_eq!(reader.next_string_char().unwrap(), 'd' as i32);
    reader.skip_to_end_of_string().unwrap();

    reader.peek_token().unwrap();
    reader.start_consuming_string().unwrap();
    assert_eq!(reader.skip_string_chars(5).unwrap(), 2);

    assert_eq!(reader.peek_token().unwrap(), Token::Number);
    assert_eq!(reader.consume_number().unwrap(), "1");
}

#[test]
fn peek_is_idempotent() {
    let mut reader = TextReader::from_str("[ 1 , 2 ]");
    reader.peek_token().unwrap();
    reader.consume_fixed_token(Token::BeginArray).unwrap();
    reader.peek_token().unwrap();
    reader.consume_number().unwrap();
    for _ in 0..3 {
        assert_eq!(reader.peek_token().unwrap(), Token::Number);
    }
    assert_eq!(reader.consume_number().unwrap(), "2");
}

#[test]
#[should_panic(expected = "cannot consume number")]
fn protocol_violations_panic() {
    let mut reader = TextReader::from_str(r#""text""#);
    reader.peek_token().unwrap();
    let _ = reader.consume_number();
}
