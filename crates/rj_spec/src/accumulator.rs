//! Accumulators fold parsed elements into a container; emitters walk a
//! container's elements for generation.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use rj_types::{DataType, Record, Value, builtin};

use crate::{BiFunction, CallError, CallResult, Emit, Function, Getter, Supplier, TriFunction};

// -----------------------------------------------------------------------------
// Cursor

/// Iteration state over the elements of one container.
pub trait Cursor: Send {
    fn has_next(&self) -> bool;

    fn next(&mut self) -> CallResult;
}

/// Cursor over a shared list.
pub struct ListCursor {
    items: Arc<Vec<Value>>,
    index: usize,
}

impl ListCursor {
    #[inline]
    pub fn new(items: Arc<Vec<Value>>) -> Self {
        Self { items, index: 0 }
    }
}

impl Cursor for ListCursor {
    #[inline]
    fn has_next(&self) -> bool {
        self.index < self.items.len()
    }

    fn next(&mut self) -> CallResult {
        let item = self
            .items
            .get(self.index)
            .cloned()
            .ok_or_else(|| CallError::new("cursor is exhausted"))?;
        self.index += 1;
        Ok(item)
    }
}

/// Cursor over the pairs of a shared map, yielding `Entry` records.
pub struct EntryCursor {
    entries: Arc<Vec<(Value, Value)>>,
    index: usize,
}

impl EntryCursor {
    #[inline]
    pub fn new(entries: Arc<Vec<(Value, Value)>>) -> Self {
        Self { entries, index: 0 }
    }
}

impl Cursor for EntryCursor {
    #[inline]
    fn has_next(&self) -> bool {
        self.index < self.entries.len()
    }

    fn next(&mut self) -> CallResult {
        let (key, value) = self
            .entries
            .get(self.index)
            .cloned()
            .ok_or_else(|| CallError::new("cursor is exhausted"))?;
        self.index += 1;
        Ok(Value::Record(Record::new(
            builtin::entry(),
            alloc::vec![key, value],
        )))
    }
}

// -----------------------------------------------------------------------------
// Helpers

fn expect_list(value: &Value) -> CallResult<Arc<Vec<Value>>> {
    match value {
        Value::List(items) => Ok(items.clone()),
        other => Err(CallError::new(format_args!(
            "expected a list, found {}",
            other.kind()
        ))),
    }
}

fn expect_map(value: &Value) -> CallResult<Arc<Vec<(Value, Value)>>> {
    match value {
        Value::Map(entries) => Ok(entries.clone()),
        other => Err(CallError::new(format_args!(
            "expected a map, found {}",
            other.kind()
        ))),
    }
}

fn entry_field(value: &Value, index: usize) -> CallResult {
    match value {
        Value::Record(record) if record.class() == builtin::entry() => {
            Ok(record.fields()[index].clone())
        }
        other => Err(CallError::new(format_args!(
            "expected an entry, found {}",
            other.kind()
        ))),
    }
}

fn push(acc: Value, item: Value, unique: bool) -> CallResult {
    let Value::List(mut items) = acc else {
        return Err(CallError::new("accumulator is not a list"));
    };
    if unique && items.contains(&item) {
        return Err(CallError::new("duplicate element"));
    }
    Arc::make_mut(&mut items).push(item);
    Ok(Value::List(items))
}

fn insert(acc: Value, key: Value, value: Value) -> CallResult {
    let Value::Map(mut entries) = acc else {
        return Err(CallError::new("accumulator is not a map"));
    };
    if entries.iter().any(|(k, _)| *k == key) {
        return Err(CallError::new(format_args!("duplicate key {key:?}")));
    }
    Arc::make_mut(&mut entries).push((key, value));
    Ok(Value::Map(entries))
}

fn identity(ty: &DataType) -> Function {
    Function::new(ty.clone(), ty.clone(), Ok)
}

// -----------------------------------------------------------------------------
// Accumulator

/// Creator, integrator and finisher of an array node.
///
/// The integrator receives the accumulator and one element and returns the
/// accumulator to continue with, which may be the same one mutated.
#[derive(Clone, Debug)]
pub struct Accumulator {
    pub creator: Supplier,
    pub integrator: BiFunction,
    pub finisher: Function,
}

impl Accumulator {
    #[inline]
    pub fn new(creator: Supplier, integrator: BiFunction, finisher: Function) -> Self {
        Self {
            creator,
            integrator,
            finisher,
        }
    }

    /// Collects elements of type `element` into a list typed `collection`.
    pub fn list(collection: &DataType, element: &DataType) -> Self {
        Self::new(
            Supplier::new(collection.clone(), || Ok(Value::list(Vec::new()))),
            BiFunction::new(
                collection.clone(),
                element.clone(),
                collection.clone(),
                |acc, item| push(acc, item, false),
            ),
            identity(collection),
        )
    }

    /// Like [`list`](Self::list), rejecting duplicate elements.
    pub fn set(collection: &DataType, element: &DataType) -> Self {
        Self::new(
            Supplier::new(collection.clone(), || Ok(Value::list(Vec::new()))),
            BiFunction::new(
                collection.clone(),
                element.clone(),
                collection.clone(),
                |acc, item| push(acc, item, true),
            ),
            identity(collection),
        )
    }

    /// Collects `Entry` records into a map, rejecting duplicate keys.
    pub fn map_entries(map: &DataType, entry: &DataType) -> Self {
        Self::new(
            Supplier::new(map.clone(), || Ok(Value::map(Vec::new()))),
            BiFunction::new(map.clone(), entry.clone(), map.clone(), |acc, entry| {
                insert(acc, entry_field(&entry, 0)?, entry_field(&entry, 1)?)
            }),
            identity(map),
        )
    }
}

/// Creator, integrator and finisher of a uniform map node. The integrator
/// takes the accumulator, a key and a value.
#[derive(Clone, Debug)]
pub struct MapAccumulator {
    pub creator: Supplier,
    pub integrator: TriFunction,
    pub finisher: Function,
}

impl MapAccumulator {
    #[inline]
    pub fn new(creator: Supplier, integrator: TriFunction, finisher: Function) -> Self {
        Self {
            creator,
            integrator,
            finisher,
        }
    }

    /// Collects pairs into a map, rejecting duplicate keys.
    pub fn map(map: &DataType, key: &DataType, value: &DataType) -> Self {
        Self::new(
            Supplier::new(map.clone(), || Ok(Value::map(Vec::new()))),
            TriFunction::new(map.clone(), key.clone(), value.clone(), map.clone(), insert),
            identity(map),
        )
    }
}

// -----------------------------------------------------------------------------
// Emitter

/// Starts a [`Cursor`] over an array node's elements. The return type of
/// `start` is the element type.
#[derive(Clone, Debug)]
pub struct Emitter {
    pub start: Emit,
}

impl Emitter {
    #[inline]
    pub fn new(start: Emit) -> Self {
        Self { start }
    }

    pub fn list(collection: &DataType, element: &DataType) -> Self {
        Self::new(Emit::new(collection.clone(), element.clone(), |value| {
            Ok(Box::new(ListCursor::new(expect_list(value)?)) as Box<dyn Cursor>)
        }))
    }

    /// Walks a map as `Entry` records.
    pub fn map_entries(map: &DataType, entry: &DataType) -> Self {
        Self::new(Emit::new(map.clone(), entry.clone(), |value| {
            Ok(Box::new(EntryCursor::new(expect_map(value)?)) as Box<dyn Cursor>)
        }))
    }
}

/// Starts a [`Cursor`] over a uniform map node's entries; `key` and `value`
/// read the two halves of each entry.
#[derive(Clone, Debug)]
pub struct MapEmitter {
    pub start: Emit,
    pub key: Getter,
    pub value: Getter,
}

impl MapEmitter {
    #[inline]
    pub fn new(start: Emit, key: Getter, value: Getter) -> Self {
        Self { start, key, value }
    }

    pub fn map(map: &DataType, key: &DataType, value: &DataType) -> Self {
        let entry = DataType::known(builtin::entry(), [key.clone(), value.clone()]);
        Self::new(
            Emit::new(map.clone(), entry.clone(), |value| {
                Ok(Box::new(EntryCursor::new(expect_map(value)?)) as Box<dyn Cursor>)
            }),
            Getter::new(entry.clone(), key.clone(), |entry| entry_field(entry, 0)),
            Getter::new(entry, value.clone(), |entry| entry_field(entry, 1)),
        )
    }
}
