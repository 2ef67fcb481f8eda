//! Backend-neutral entry points.

use alloc::string::String;
use alloc::sync::Arc;

use rj_json::{JsonReader, JsonWriter, Token, TokenSet, Utf8Reader, Utf16Reader};
use rj_spec::{BuildError, Spec, TypeMap};
use rj_types::{DataType, Value};

use crate::{CodecError, ContentError};

/// Reads values of one spec from JSON.
pub trait Parser: Send + Sync {
    /// Parse one value, leaving the reader after it.
    fn parse(&self, reader: &mut dyn JsonReader) -> Result<Value, CodecError>;

    /// Parse a whole document.
    fn parse_str(&self, text: &str) -> Result<Value, CodecError> {
        let mut reader = Utf8Reader::from_str(text);
        let value = self.parse(&mut reader)?;
        expect_end(&mut reader)?;
        Ok(value)
    }

    /// Parse a whole document given as UTF-16 code units.
    fn parse_utf16(&self, units: &[u16]) -> Result<Value, CodecError> {
        let mut reader = Utf16Reader::from_utf16(units);
        let value = self.parse(&mut reader)?;
        expect_end(&mut reader)?;
        Ok(value)
    }
}

/// Writes values of one spec as JSON.
pub trait Generator: Send + Sync {
    fn generate(&self, writer: &mut JsonWriter<'_>, value: &Value) -> Result<(), CodecError>;

    fn generate_string(&self, value: &Value) -> Result<String, CodecError> {
        let mut out = String::new();
        self.generate(&mut JsonWriter::new(&mut out), value)?;
        Ok(out)
    }
}

/// A backend: turns specs into parsers and generators.
///
/// References inside specs resolve through the codec's [`TypeMap`].
pub trait Codec: Send + Sync {
    fn type_map(&self) -> &Arc<TypeMap>;

    fn parser_for(&self, spec: &Spec) -> Result<Arc<dyn Parser>, BuildError>;

    fn generator_for(&self, spec: &Spec) -> Result<Arc<dyn Generator>, BuildError>;

    /// The parser for the spec registered for `ty`.
    fn parser_for_type(&self, ty: &DataType) -> Result<Arc<dyn Parser>, BuildError> {
        let spec = self.type_map().get(ty)?.clone();
        self.parser_for(&spec)
    }

    /// The generator for the spec registered for `ty`.
    fn generator_for_type(&self, ty: &DataType) -> Result<Arc<dyn Generator>, BuildError> {
        let spec = self.type_map().get(ty)?.clone();
        self.generator_for(&spec)
    }
}

fn expect_end(reader: &mut dyn JsonReader) -> Result<(), CodecError> {
    match reader.peek_token()? {
        Token::EndOfInput => Ok(()),
        found => Err(ContentError::UnexpectedToken {
            offset: reader.offset(),
            found,
            expected: TokenSet::END_OF_INPUT,
        }
        .into()),
    }
}
