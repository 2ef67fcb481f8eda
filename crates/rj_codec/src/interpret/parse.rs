//! Tree-walking parse.
//!
//! [`begin`] handles one node: leaves produce their value at once, wrappers
//! delegate to a child, and containers open a [`ParseFrame`]. A frame is
//! resumed with the value of the child it asked for last (`None` on the
//! first call) until it is done. The two drivers differ only in where the
//! frames live.

use alloc::vec::Vec;
use core::mem;

use rj_json::{JsonReader, Token, TokenSet, read_string};
use rj_spec::{ArrayNode, CallbackNode, ConvertedNode, MapNode, NodeKind, ObjectNode, Spec, TypeMap};
use rj_types::Value;

use crate::scalar::{self, expect_fixed, peek_one_of, rejected, take_null};
use crate::{CodecError, ContentError};

pub(crate) enum Step<'s> {
    Value(Value),
    Delegate(&'s Spec),
    Frame(ParseFrame<'s>),
}

pub(crate) enum Resume<'s> {
    Need(&'s Spec),
    Done(Value),
}

pub(crate) enum ParseFrame<'s> {
    Array {
        node: &'s ArrayNode,
        acc: Value,
    },
    Map {
        node: &'s MapNode,
        acc: Value,
        key: Option<Value>,
    },
    Object {
        node: &'s ObjectNode,
        values: Vec<Option<Value>>,
        current: usize,
    },
    Converted {
        node: &'s ConvertedNode,
    },
    Callback {
        node: &'s CallbackNode,
        state: Option<Value>,
    },
}

pub(crate) fn begin<'s>(
    map: &'s TypeMap,
    spec: &'s Spec,
    reader: &mut dyn JsonReader,
) -> Result<Step<'s>, CodecError> {
    Ok(match spec.kind() {
        kind @ (NodeKind::Str
        | NodeKind::Bool
        | NodeKind::Char
        | NodeKind::BigNumber
        | NodeKind::Number(_)
        | NodeKind::BoxedNumber(_)
        | NodeKind::Enum(_)) => Step::Value(scalar::parse_scalar(kind, spec.data_type(), reader)?),
        NodeKind::TypeRef(target) => Step::Delegate(map.get(target)?),
        NodeKind::Nullable(child) => {
            if take_null(reader)? {
                Step::Value(Value::Null)
            } else {
                Step::Delegate(child)
            }
        }
        NodeKind::MaybeAbsent(node) => Step::Delegate(&node.present),
        NodeKind::Computed(supplier) => {
            Step::Value(supplier.call().map_err(|e| rejected(reader, e))?)
        }
        NodeKind::Converted(node) => Step::Frame(ParseFrame::Converted { node }),
        NodeKind::Callback(node) => {
            let state = node.before.call().map_err(|e| rejected(reader, e))?;
            Step::Frame(ParseFrame::Callback {
                node,
                state: Some(state),
            })
        }
        NodeKind::Array(node) => {
            expect_fixed(reader, Token::BeginArray)?;
            let acc = node.accumulator.creator.call().map_err(|e| rejected(reader, e))?;
            Step::Frame(ParseFrame::Array { node, acc })
        }
        NodeKind::UniformMap(node) => {
            expect_fixed(reader, Token::BeginObject)?;
            let acc = node.accumulator.creator.call().map_err(|e| rejected(reader, e))?;
            Step::Frame(ParseFrame::Map { node, acc, key: None })
        }
        NodeKind::Object(node) => {
            expect_fixed(reader, Token::BeginObject)?;
            Step::Frame(ParseFrame::Object {
                node,
                values: alloc::vec![None; node.members().len()],
                current: 0,
            })
        }
    })
}

/// The value of an object member missing from the input.
fn absent_value(
    map: &TypeMap,
    spec: &Spec,
    reader: &dyn JsonReader,
) -> Result<Option<Value>, CodecError> {
    if let NodeKind::MaybeAbsent(node) = map.resolve(spec)?.kind()
        && let NodeKind::Computed(supplier) = node.absent.kind()
    {
        return supplier.call().map(Some).map_err(|e| rejected(reader, e));
    }
    Ok(None)
}

impl<'s> ParseFrame<'s> {
    pub(crate) fn resume(
        &mut self,
        map: &'s TypeMap,
        reader: &mut dyn JsonReader,
        result: Option<Value>,
    ) -> Result<Resume<'s>, CodecError> {
        match self {
            Self::Array { node, acc } => {
                let node: &'s ArrayNode = *node;
                if let Some(item) = result {
                    let current = mem::replace(acc, Value::Null);
                    *acc = node
                        .accumulator
                        .integrator
                        .call(current, item)
                        .map_err(|e| rejected(reader, e))?;
                }
                if reader.peek_token()? != Token::EndArray {
                    return Ok(Resume::Need(&node.element));
                }
                reader.consume_fixed_token(Token::EndArray)?;
                let value = node
                    .accumulator
                    .finisher
                    .call(mem::replace(acc, Value::Null))
                    .map_err(|e| rejected(reader, e))?;
                Ok(Resume::Done(value))
            }
            Self::Map { node, acc, key } => {
                let node: &'s MapNode = *node;
                if let Some(value) = result {
                    match key.take() {
                        None => {
                            *key = Some(value);
                            return Ok(Resume::Need(&node.value));
                        }
                        Some(k) => {
                            let current = mem::replace(acc, Value::Null);
                            *acc = node
                                .accumulator
                                .integrator
                                .call(current, k, value)
                                .map_err(|e| rejected(reader, e))?;
                        }
                    }
                }
                if peek_one_of(reader, TokenSet::STRING | TokenSet::END_OBJECT)? == Token::String {
                    return Ok(Resume::Need(&node.key));
                }
                reader.consume_fixed_token(Token::EndObject)?;
                let value = node
                    .accumulator
                    .finisher
                    .call(mem::replace(acc, Value::Null))
                    .map_err(|e| rejected(reader, e))?;
                Ok(Resume::Done(value))
            }
            Self::Object { node, values, current } => {
                let node: &'s ObjectNode = *node;
                if let Some(value) = result {
                    values[*current] = Some(value);
                }
                if peek_one_of(reader, TokenSet::STRING | TokenSet::END_OBJECT)? == Token::String {
                    let offset = reader.offset();
                    let name = read_string(reader)?;
                    let Some(index) = node.member_index(&name) else {
                        return Err(ContentError::UnknownMember {
                            offset,
                            name: name.into_boxed_str(),
                        }
                        .into());
                    };
                    if values[index].is_some() {
                        return Err(ContentError::DuplicateMember {
                            offset,
                            name: name.into_boxed_str(),
                        }
                        .into());
                    }
                    *current = index;
                    return Ok(Resume::Need(node.members()[index].spec()));
                }
                reader.consume_fixed_token(Token::EndObject)?;
                let mut args = Vec::with_capacity(values.len());
                for (member, value) in node.members().iter().zip(mem::take(values)) {
                    match value {
                        Some(value) => args.push(value),
                        None => match absent_value(map, member.spec(), reader)? {
                            Some(value) => args.push(value),
                            None => {
                                return Err(ContentError::MissingMember {
                                    offset: reader.offset(),
                                    name: member.name().into(),
                                }
                                .into());
                            }
                        },
                    }
                }
                let value = node.finisher().call(args).map_err(|e| rejected(reader, e))?;
                Ok(Resume::Done(value))
            }
            Self::Converted { node } => {
                let node: &'s ConvertedNode = *node;
                match result {
                    None => Ok(Resume::Need(&node.alternate)),
                    Some(value) => {
                        Ok(Resume::Done(node.to.call(value).map_err(|e| rejected(reader, e))?))
                    }
                }
            }
            Self::Callback { node, state } => {
                let node: &'s CallbackNode = *node;
                match result {
                    None => Ok(Resume::Need(&node.child)),
                    Some(value) => {
                        if let Some(state) = state.take() {
                            node.after.call(state).map_err(|e| rejected(reader, e))?;
                        }
                        Ok(Resume::Done(value))
                    }
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Drivers

/// Parses children by recursing on the call stack.
pub(crate) fn recursive(
    map: &TypeMap,
    spec: &Spec,
    reader: &mut dyn JsonReader,
) -> Result<Value, CodecError> {
    let mut spec = spec;
    loop {
        match begin(map, spec, reader)? {
            Step::Value(value) => return Ok(value),
            Step::Delegate(next) => spec = next,
            Step::Frame(mut frame) => {
                let mut result = None;
                loop {
                    match frame.resume(map, reader, result.take())? {
                        Resume::Need(child) => result = Some(recursive(map, child, reader)?),
                        Resume::Done(value) => return Ok(value),
                    }
                }
            }
        }
    }
}

/// Parses with an explicit frame stack; nesting depth is bounded by memory
/// rather than by the call stack.
pub(crate) fn iterative(
    map: &TypeMap,
    spec: &Spec,
    reader: &mut dyn JsonReader,
) -> Result<Value, CodecError> {
    let mut stack: Vec<ParseFrame<'_>> = Vec::new();
    let mut pending = Some(spec);
    let mut result = None;
    loop {
        if let Some(mut spec) = pending.take() {
            loop {
                match begin(map, spec, reader)? {
                    Step::Value(value) if stack.is_empty() => return Ok(value),
                    Step::Value(value) => {
                        result = Some(value);
                        break;
                    }
                    Step::Delegate(next) => spec = next,
                    Step::Frame(frame) => {
                        stack.push(frame);
                        break;
                    }
                }
            }
        }
        let Some(frame) = stack.last_mut() else {
            unreachable!("a value with an empty stack returns");
        };
        match frame.resume(map, reader, result.take())? {
            Resume::Need(child) => pending = Some(child),
            Resume::Done(value) => {
                stack.pop();
                if stack.is_empty() {
                    return Ok(value);
                }
                result = Some(value);
            }
        }
    }
}
