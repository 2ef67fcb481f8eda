//! The compiling backend: turns every spec of a type map into closures once.
//!
//! Each mapped type gets a numbered slot holding its parse and generate
//! routines, and each mapped reference type a second slot for its nullable
//! form. References compile to calls through [`Routines`] by slot number,
//! which is how recursive types close their loops. Object members and enum
//! constants are matched with a [`Trie`] while the name is read, and member
//! names are escaped once when compiled.

mod generate;
mod parse;
mod trie;

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use rj_json::{JsonReader, JsonWriter};
use rj_spec::{BuildError, CodecConfig, Spec, SpecNode, TypeMap};
use rj_types::{DataType, Value};
use rj_utils::hash::{HashMap, map_with_capacity, new_map};

use crate::{Codec, CodecError, Generator, Parser};

use trie::Trie;

pub(crate) type ParseRoutine =
    Arc<dyn Fn(&Routines, &mut dyn JsonReader) -> Result<Value, CodecError> + Send + Sync>;

pub(crate) type GenerateRoutine =
    Arc<dyn Fn(&Routines, &mut JsonWriter<'_>, &Value) -> Result<(), CodecError> + Send + Sync>;

/// Wraps a closure as a [`ParseRoutine`], fixing its signature.
#[inline]
fn parse_fn<F>(f: F) -> ParseRoutine
where
    F: Fn(&Routines, &mut dyn JsonReader) -> Result<Value, CodecError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`GenerateRoutine`], fixing its signature.
#[inline]
fn generate_fn<F>(f: F) -> GenerateRoutine
where
    F: Fn(&Routines, &mut JsonWriter<'_>, &Value) -> Result<(), CodecError> + Send + Sync + 'static,
{
    Arc::new(f)
}

// -----------------------------------------------------------------------------
// Slots

/// Slot numbers of the mapped types.
#[derive(Debug, Default)]
struct Slots {
    plain: HashMap<DataType, usize>,
    nullable: HashMap<DataType, usize>,
    /// For each nullable slot, in order, the plain slot it wraps.
    nullable_targets: Vec<usize>,
}

impl Slots {
    fn assign(map: &TypeMap) -> Self {
        let mut slots = Self {
            plain: map_with_capacity(map.len()),
            nullable: new_map(),
            nullable_targets: Vec::new(),
        };
        for (index, (ty, _)) in map.iter().enumerate() {
            slots.plain.insert(ty.clone(), index);
        }
        for (index, (ty, _)) in map.iter().enumerate() {
            if !ty.is_primitive() {
                slots.nullable.insert(ty.clone(), map.len() + slots.nullable_targets.len());
                slots.nullable_targets.push(index);
            }
        }
        slots
    }

    #[inline]
    fn len(&self) -> usize {
        self.plain.len() + self.nullable_targets.len()
    }

    fn plain(&self, ty: &DataType) -> Result<usize, BuildError> {
        self.plain
            .get(ty)
            .copied()
            .ok_or_else(|| BuildError::UnresolvedReference(ty.clone()))
    }

    #[inline]
    fn nullable(&self, ty: &DataType) -> Option<usize> {
        self.nullable.get(ty).copied()
    }
}

// -----------------------------------------------------------------------------
// Routines

/// The compiled routines of every slot.
pub(crate) struct Routines {
    parse: Box<[ParseRoutine]>,
    generate: Box<[GenerateRoutine]>,
}

impl Routines {
    #[inline]
    pub(crate) fn parse(
        &self,
        slot: usize,
        reader: &mut dyn JsonReader,
    ) -> Result<Value, CodecError> {
        (self.parse[slot])(self, reader)
    }

    #[inline]
    pub(crate) fn generate(
        &self,
        slot: usize,
        writer: &mut JsonWriter<'_>,
        value: &Value,
    ) -> Result<(), CodecError> {
        (self.generate[slot])(self, writer, value)
    }
}

// -----------------------------------------------------------------------------
// Builder

/// Compiles spec trees against fixed slots.
///
/// Routines are memoized per node so shared subtrees compile once.
struct Builder<'a> {
    map: &'a TypeMap,
    slots: &'a Slots,
    fewer_switches: bool,
    parsers: HashMap<*const SpecNode, ParseRoutine>,
    generators: HashMap<*const SpecNode, GenerateRoutine>,
}

impl<'a> Builder<'a> {
    fn new(map: &'a TypeMap, slots: &'a Slots, fewer_switches: bool) -> Self {
        Self {
            map,
            slots,
            fewer_switches,
            parsers: new_map(),
            generators: new_map(),
        }
    }

    fn parser(&mut self, spec: &Spec) -> Result<ParseRoutine, BuildError> {
        let key = Arc::as_ptr(spec);
        if let Some(routine) = self.parsers.get(&key) {
            return Ok(routine.clone());
        }
        let routine = self.build_parser(spec)?;
        self.parsers.insert(key, routine.clone());
        Ok(routine)
    }

    fn generator(&mut self, spec: &Spec) -> Result<GenerateRoutine, BuildError> {
        let key = Arc::as_ptr(spec);
        if let Some(routine) = self.generators.get(&key) {
            return Ok(routine.clone());
        }
        let routine = self.build_generator(spec)?;
        self.generators.insert(key, routine.clone());
        Ok(routine)
    }
}

// -----------------------------------------------------------------------------
// Compiler

/// Builds [`CompiledCodec`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    fewer_switches: bool,
}

impl Compiler {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            fewer_switches: config.fewer_switches,
        }
    }

    /// Compiles every spec in `map`, plus `extra` specs that may be asked
    /// for later through [`Codec::parser_for`] and [`Codec::generator_for`].
    ///
    /// # Errors
    ///
    /// [`BuildError::UnresolvedReference`] if any reference reachable from
    /// these specs names a type without a spec, [`BuildError::InvalidKey`] if
    /// a uniform map's key is not written as a string.
    pub fn compile(&self, map: Arc<TypeMap>, extra: &[Spec]) -> Result<CompiledCodec, BuildError> {
        map.check_all_keys()?;
        for spec in extra {
            map.check_keys(spec)?;
        }
        let slots = Arc::new(Slots::assign(&map));
        let mut builder = Builder::new(&map, &slots, self.fewer_switches);

        let mut parsers = Vec::with_capacity(slots.len());
        let mut generators = Vec::with_capacity(slots.len());
        for (ty, spec) in map.iter() {
            log::trace!("compiling {ty}");
            parsers.push(builder.parser(spec)?);
            generators.push(builder.generator(spec)?);
        }
        for &target in &slots.nullable_targets {
            parsers.push(parse::nullable_slot(target));
            generators.push(generate::nullable_slot(target));
        }

        let mut prepared = map_with_capacity(extra.len());
        for spec in extra {
            let routines = Prepared {
                spec: spec.clone(),
                parse: builder.parser(spec)?,
                generate: builder.generator(spec)?,
            };
            prepared.insert(Arc::as_ptr(spec) as usize, routines);
        }
        log::debug!(
            "compiled {} slots from {} types and {} extra specs",
            slots.len(),
            map.len(),
            extra.len()
        );
        drop(builder);

        Ok(CompiledCodec {
            routines: Arc::new(Routines {
                parse: parsers.into_boxed_slice(),
                generate: generators.into_boxed_slice(),
            }),
            map,
            slots,
            fewer_switches: self.fewer_switches,
            prepared,
        })
    }
}

struct Prepared {
    /// Keeps the address used as key alive.
    spec: Spec,
    parse: ParseRoutine,
    generate: GenerateRoutine,
}

/// A [`Codec`] whose specs were compiled to closures.
pub struct CompiledCodec {
    map: Arc<TypeMap>,
    slots: Arc<Slots>,
    routines: Arc<Routines>,
    fewer_switches: bool,
    prepared: HashMap<usize, Prepared>,
}

impl CompiledCodec {
    /// The slot of `spec` if it is the spec mapped for its own type.
    fn slot_of(&self, spec: &Spec) -> Option<usize> {
        let ty = spec.data_type();
        let mapped = self.map.lookup(ty)?;
        if Arc::ptr_eq(mapped, spec) {
            self.slots.plain.get(ty).copied()
        } else {
            None
        }
    }

    fn prepared(&self, spec: &Spec) -> Option<&Prepared> {
        self.prepared
            .get(&(Arc::as_ptr(spec) as usize))
            .filter(|prepared| Arc::ptr_eq(&prepared.spec, spec))
    }
}

impl fmt::Debug for CompiledCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCodec")
            .field("types", &self.map.len())
            .field("slots", &self.slots.len())
            .field("prepared", &self.prepared.len())
            .field("fewer_switches", &self.fewer_switches)
            .finish()
    }
}

impl Codec for CompiledCodec {
    fn type_map(&self) -> &Arc<TypeMap> {
        &self.map
    }

    fn parser_for(&self, spec: &Spec) -> Result<Arc<dyn Parser>, BuildError> {
        let routine = if let Some(prepared) = self.prepared(spec) {
            prepared.parse.clone()
        } else if let Some(slot) = self.slot_of(spec) {
            parse_fn(move |routines, reader| routines.parse(slot, reader))
        } else {
            log::debug!("compiling a parser for an unprepared {} spec", spec.data_type());
            self.map.check_keys(spec)?;
            Builder::new(&self.map, &self.slots, self.fewer_switches).parser(spec)?
        };
        Ok(Arc::new(CompiledParser {
            routines: self.routines.clone(),
            routine,
        }))
    }

    fn generator_for(&self, spec: &Spec) -> Result<Arc<dyn Generator>, BuildError> {
        let routine = if let Some(prepared) = self.prepared(spec) {
            prepared.generate.clone()
        } else if let Some(slot) = self.slot_of(spec) {
            generate_fn(move |routines, writer, value| routines.generate(slot, writer, value))
        } else {
            log::debug!("compiling a generator for an unprepared {} spec", spec.data_type());
            self.map.check_keys(spec)?;
            Builder::new(&self.map, &self.slots, self.fewer_switches).generator(spec)?
        };
        Ok(Arc::new(CompiledGenerator {
            routines: self.routines.clone(),
            routine,
        }))
    }
}

struct CompiledParser {
    routines: Arc<Routines>,
    routine: ParseRoutine,
}

impl Parser for CompiledParser {
    #[inline]
    fn parse(&self, reader: &mut dyn JsonReader) -> Result<Value, CodecError> {
        (self.routine)(&self.routines, reader)
    }
}

struct CompiledGenerator {
    routines: Arc<Routines>,
    routine: GenerateRoutine,
}

impl Generator for CompiledGenerator {
    #[inline]
    fn generate(&self, writer: &mut JsonWriter<'_>, value: &Value) -> Result<(), CodecError> {
        (self.routine)(&self.routines, writer, value)
    }
}
