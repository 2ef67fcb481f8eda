//! Reading and writing of single-token values, shared by both backends.

use alloc::string::String;
use core::fmt;

use rj_json::{JsonReader, JsonWriter, Token, TokenSet, read_string};
use rj_spec::{CallError, NodeKind};
use rj_types::{ClassRef, DataType, EnumValue, PrimitiveKind, Value, builtin};

use crate::{CodecError, ContentError};

// -----------------------------------------------------------------------------
// Errors

#[cold]
pub(crate) fn unexpected(reader: &dyn JsonReader, found: Token, expected: TokenSet) -> CodecError {
    ContentError::UnexpectedToken {
        offset: reader.offset(),
        found,
        expected,
    }
    .into()
}

#[cold]
pub(crate) fn invalid(reader: &dyn JsonReader, message: impl fmt::Display) -> CodecError {
    ContentError::InvalidValue {
        offset: reader.offset(),
        message: alloc::format!("{message}").into_boxed_str(),
    }
    .into()
}

#[cold]
pub(crate) fn rejected(reader: &dyn JsonReader, source: CallError) -> CodecError {
    ContentError::Rejected {
        offset: reader.offset(),
        source,
    }
    .into()
}

#[cold]
pub(crate) fn failed(source: CallError) -> CodecError {
    ContentError::Failed(source).into()
}

#[cold]
pub(crate) fn mismatch(expected: &'static str, value: &Value) -> CodecError {
    ContentError::ValueMismatch {
        expected,
        found: value.kind(),
    }
    .into()
}

#[cold]
pub(crate) fn unrepresentable(what: impl fmt::Display) -> CodecError {
    ContentError::Unrepresentable(alloc::format!("{what}").into_boxed_str()).into()
}

// -----------------------------------------------------------------------------
// Token helpers

/// Peek and require one of `allowed`.
#[inline]
pub(crate) fn peek_one_of(
    reader: &mut dyn JsonReader,
    allowed: TokenSet,
) -> Result<Token, CodecError> {
    let token = reader.peek_token()?;
    if allowed.contains_token(token) {
        Ok(token)
    } else {
        Err(unexpected(reader, token, allowed))
    }
}

/// Peek, require and consume a bracket or literal.
#[inline]
pub(crate) fn expect_fixed(reader: &mut dyn JsonReader, token: Token) -> Result<(), CodecError> {
    peek_one_of(reader, token.set())?;
    reader.consume_fixed_token(token)?;
    Ok(())
}

/// Consume a `null` if one is next.
#[inline]
pub(crate) fn take_null(reader: &mut dyn JsonReader) -> Result<bool, CodecError> {
    if reader.peek_token()? == Token::Null {
        reader.consume_fixed_token(Token::Null)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

pub(crate) fn parse_string(reader: &mut dyn JsonReader) -> Result<String, CodecError> {
    peek_one_of(reader, TokenSet::STRING)?;
    Ok(read_string(reader)?)
}

// -----------------------------------------------------------------------------
// Parsing

pub(crate) fn parse_bool(reader: &mut dyn JsonReader) -> Result<Value, CodecError> {
    let token = peek_one_of(reader, TokenSet::BOOLEAN)?;
    reader.consume_fixed_token(token)?;
    Ok(Value::Bool(token == Token::True))
}

pub(crate) fn parse_char(reader: &mut dyn JsonReader) -> Result<Value, CodecError> {
    let text = parse_string(reader)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Char(c)),
        _ => Err(invalid(reader, format_args!("expected one character, found {text:?}"))),
    }
}

fn is_integral(numeral: &str) -> bool {
    !numeral.contains(['.', 'e', 'E'])
}

pub(crate) fn parse_number(
    reader: &mut dyn JsonReader,
    kind: PrimitiveKind,
) -> Result<Value, CodecError> {
    peek_one_of(reader, TokenSet::NUMBER)?;
    let numeral = reader.consume_number()?;
    let result = if let Some((min, max)) = kind.integer_range() {
        if !is_integral(numeral) {
            Err(alloc::format!("expected an integer, found `{numeral}`"))
        } else {
            match numeral.parse::<i64>() {
                Ok(n) if (min..=max).contains(&n) => Ok(Value::Int(n)),
                _ => Err(alloc::format!("`{numeral}` is out of range for {}", kind.name())),
            }
        }
    } else {
        let parsed = if kind == PrimitiveKind::F32 {
            numeral.parse::<f32>().map(f64::from)
        } else {
            numeral.parse::<f64>()
        };
        match parsed {
            Ok(f) if f.is_finite() => Ok(Value::Float(f)),
            _ => Err(alloc::format!("`{numeral}` is out of range for {}", kind.name())),
        }
    };
    result.map_err(|message| invalid(reader, message))
}

/// An arbitrary precision numeral, integral when `integral`.
pub(crate) fn parse_big(reader: &mut dyn JsonReader, integral: bool) -> Result<Value, CodecError> {
    peek_one_of(reader, TokenSet::NUMBER)?;
    let numeral = reader.consume_number()?;
    if integral && !is_integral(numeral) {
        let message = alloc::format!("expected an integer, found `{numeral}`");
        return Err(invalid(reader, message));
    }
    Ok(Value::decimal(numeral))
}

#[inline]
pub(crate) fn is_big_integer(ty: &DataType) -> bool {
    ty.class_ref() == Some(builtin::big_integer())
}

pub(crate) fn enum_constant(
    reader: &dyn JsonReader,
    class: ClassRef,
    name: &str,
) -> Result<Value, CodecError> {
    match EnumValue::new(class, name) {
        Some(constant) => Ok(Value::Enum(constant)),
        None => Err(invalid(reader, format_args!("unknown constant `{name}` of `{class}`"))),
    }
}

/// Parse a scalar node.
///
/// # Panics
///
/// Panics if `kind` is not a scalar kind.
pub(crate) fn parse_scalar(
    kind: &NodeKind,
    ty: &DataType,
    reader: &mut dyn JsonReader,
) -> Result<Value, CodecError> {
    match kind {
        NodeKind::Str => Ok(Value::from(parse_string(reader)?)),
        NodeKind::Bool => parse_bool(reader),
        NodeKind::Char => parse_char(reader),
        NodeKind::BigNumber => parse_big(reader, is_big_integer(ty)),
        NodeKind::Number(kind) | NodeKind::BoxedNumber(kind) => parse_number(reader, *kind),
        NodeKind::Enum(class) => {
            let name = parse_string(reader)?;
            enum_constant(reader, *class, &name)
        }
        other => unreachable!("{} is not a scalar", other.name()),
    }
}

// -----------------------------------------------------------------------------
// Writing

pub(crate) fn write_number(
    writer: &mut JsonWriter<'_>,
    kind: PrimitiveKind,
    value: &Value,
) -> Result<(), CodecError> {
    if let Some((min, max)) = kind.integer_range() {
        let Value::Int(n) = value else {
            return Err(mismatch(kind.name(), value));
        };
        if !(min..=max).contains(n) {
            return Err(unrepresentable(format_args!("{n} as {}", kind.name())));
        }
        writer.int(*n)?;
    } else {
        let Value::Float(f) = value else {
            return Err(mismatch(kind.name(), value));
        };
        if kind == PrimitiveKind::F32 {
            #[allow(clippy::cast_possible_truncation)]
            let narrow = *f as f32;
            if !narrow.is_finite() {
                return Err(unrepresentable(format_args!("{f} as f32")));
            }
            writer.float32(narrow)?;
        } else {
            if !f.is_finite() {
                return Err(unrepresentable(f));
            }
            writer.float(*f)?;
        }
    }
    Ok(())
}

/// Write a scalar node.
///
/// # Panics
///
/// Panics if `kind` is not a scalar kind.
pub(crate) fn write_scalar(
    kind: &NodeKind,
    writer: &mut JsonWriter<'_>,
    value: &Value,
) -> Result<(), CodecError> {
    match (kind, value) {
        (NodeKind::Str, Value::Str(s)) => writer.string(s)?,
        (NodeKind::Bool, Value::Bool(b)) => writer.bool(*b)?,
        (NodeKind::Char, Value::Char(c)) => writer.char(*c)?,
        (NodeKind::BigNumber, Value::Decimal(numeral)) => writer.numeral(numeral)?,
        (NodeKind::Number(kind) | NodeKind::BoxedNumber(kind), value) => {
            write_number(writer, *kind, value)?
        }
        (NodeKind::Enum(class), Value::Enum(constant)) if constant.class() == *class => {
            writer.string(constant.name())?
        }
        (
            NodeKind::Str
            | NodeKind::Bool
            | NodeKind::Char
            | NodeKind::BigNumber
            | NodeKind::Enum(_),
            value,
        ) => return Err(mismatch(kind.name(), value)),
        (other, _) => unreachable!("{} is not a scalar", other.name()),
    }
    Ok(())
}
