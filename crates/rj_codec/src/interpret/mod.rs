//! The interpreting backend: walks spec trees for every call.
//!
//! Nothing is prepared ahead of time, so an interpreter is built instantly
//! and unresolved references surface only when a call reaches them. With
//! [`CodecConfig::iterative`](rj_spec::CodecConfig::iterative) the walk keeps
//! its frames on the heap and accepts arbitrarily deep input.

mod generate;
mod parse;

use alloc::sync::Arc;

use rj_json::{JsonReader, JsonWriter};
use rj_spec::{BuildError, Spec, TypeMap};
use rj_types::Value;

use crate::{Codec, CodecError, Generator, Parser};

/// A [`Codec`] that interprets specs directly.
#[derive(Debug, Clone)]
pub struct Interpreter {
    map: Arc<TypeMap>,
    iterative: bool,
}

impl Interpreter {
    pub fn new(map: Arc<TypeMap>, iterative: bool) -> Self {
        Self { map, iterative }
    }

    #[inline]
    pub fn is_iterative(&self) -> bool {
        self.iterative
    }
}

impl Codec for Interpreter {
    fn type_map(&self) -> &Arc<TypeMap> {
        &self.map
    }

    fn parser_for(&self, spec: &Spec) -> Result<Arc<dyn Parser>, BuildError> {
        self.map.check_keys(spec)?;
        Ok(Arc::new(Interpreted {
            map: self.map.clone(),
            spec: spec.clone(),
            iterative: self.iterative,
        }))
    }

    fn generator_for(&self, spec: &Spec) -> Result<Arc<dyn Generator>, BuildError> {
        self.map.check_keys(spec)?;
        Ok(Arc::new(Interpreted {
            map: self.map.clone(),
            spec: spec.clone(),
            iterative: self.iterative,
        }))
    }
}

/// Parser and generator for one spec.
#[derive(Debug)]
struct Interpreted {
    map: Arc<TypeMap>,
    spec: Spec,
    iterative: bool,
}

impl Parser for Interpreted {
    fn parse(&self, reader: &mut dyn JsonReader) -> Result<Value, CodecError> {
        if self.iterative {
            parse::iterative(&self.map, &self.spec, reader)
        } else {
            parse::recursive(&self.map, &self.spec, reader)
        }
    }
}

impl Generator for Interpreted {
    fn generate(&self, writer: &mut JsonWriter<'_>, value: &Value) -> Result<(), CodecError> {
        log::trace!("generating {}", self.spec.data_type());
        if self.iterative {
            generate::iterative(&self.map, &self.spec, value.clone(), writer)
        } else {
            generate::recursive(&self.map, &self.spec, value.clone(), writer)
        }
    }
}
