//! Tree-walking generation, mirroring [`super::parse`].

use alloc::boxed::Box;
use alloc::vec::Vec;

use rj_json::JsonWriter;
use rj_spec::{ArrayNode, CallbackNode, Cursor, MapNode, NodeKind, ObjectNode, Spec, TypeMap};
use rj_types::Value;

use crate::CodecError;
use crate::scalar::{self, failed, unrepresentable};

pub(crate) enum Step<'s> {
    Done,
    Delegate(&'s Spec, Value),
    Frame(GenerateFrame<'s>),
}

pub(crate) enum Resume<'s> {
    Need(&'s Spec, Value),
    Done,
}

pub(crate) enum GenerateFrame<'s> {
    Array {
        node: &'s ArrayNode,
        cursor: Box<dyn Cursor>,
    },
    Map {
        node: &'s MapNode,
        cursor: Box<dyn Cursor>,
        value: Option<Value>,
    },
    Object {
        node: &'s ObjectNode,
        value: Value,
        next: usize,
    },
    Callback {
        node: &'s CallbackNode,
        state: Value,
        value: Option<Value>,
    },
}

pub(crate) fn begin<'s>(
    map: &'s TypeMap,
    spec: &'s Spec,
    value: Value,
    writer: &mut JsonWriter<'_>,
) -> Result<Step<'s>, CodecError> {
    Ok(match spec.kind() {
        kind @ (NodeKind::Str
        | NodeKind::Bool
        | NodeKind::Char
        | NodeKind::BigNumber
        | NodeKind::Number(_)
        | NodeKind::BoxedNumber(_)
        | NodeKind::Enum(_)) => {
            scalar::write_scalar(kind, writer, &value)?;
            Step::Done
        }
        NodeKind::TypeRef(target) => Step::Delegate(map.get(target)?, value),
        NodeKind::Nullable(child) => {
            if value.is_null() {
                writer.null()?;
                Step::Done
            } else {
                Step::Delegate(child, value)
            }
        }
        NodeKind::MaybeAbsent(node) => Step::Delegate(&node.present, value),
        NodeKind::Computed(_) => {
            let ty = spec.data_type();
            return Err(unrepresentable(format_args!("computed `{ty}`")));
        }
        NodeKind::Converted(node) => {
            Step::Delegate(&node.alternate, node.from.call(value).map_err(failed)?)
        }
        NodeKind::Callback(node) => Step::Frame(GenerateFrame::Callback {
            node,
            state: node.before.call().map_err(failed)?,
            value: Some(value),
        }),
        NodeKind::Array(node) => {
            let cursor = node.emitter.start.call(&value).map_err(failed)?;
            writer.begin_array()?;
            Step::Frame(GenerateFrame::Array { node, cursor })
        }
        NodeKind::UniformMap(node) => {
            let cursor = node.emitter.start.call(&value).map_err(failed)?;
            writer.begin_object()?;
            Step::Frame(GenerateFrame::Map {
                node,
                cursor,
                value: None,
            })
        }
        NodeKind::Object(node) => {
            writer.begin_object()?;
            Step::Frame(GenerateFrame::Object { node, value, next: 0 })
        }
    })
}

impl<'s> GenerateFrame<'s> {
    pub(crate) fn resume(
        &mut self,
        map: &'s TypeMap,
        writer: &mut JsonWriter<'_>,
    ) -> Result<Resume<'s>, CodecError> {
        match self {
            Self::Array { node, cursor } => {
                let node: &'s ArrayNode = *node;
                if cursor.has_next() {
                    return Ok(Resume::Need(&node.element, cursor.next().map_err(failed)?));
                }
                writer.end_array()?;
                Ok(Resume::Done)
            }
            Self::Map { node, cursor, value } => {
                let node: &'s MapNode = *node;
                if let Some(value) = value.take() {
                    return Ok(Resume::Need(&node.value, value));
                }
                if cursor.has_next() {
                    let entry = cursor.next().map_err(failed)?;
                    *value = Some(node.emitter.value.call(&entry).map_err(failed)?);
                    let key = node.emitter.key.call(&entry).map_err(failed)?;
                    return Ok(Resume::Need(&node.key, key));
                }
                writer.end_object()?;
                Ok(Resume::Done)
            }
            Self::Object { node, value, next } => {
                let node: &'s ObjectNode = *node;
                while let Some(member) = node.members().get(*next) {
                    *next += 1;
                    let field = member.accessor().call(value).map_err(failed)?;
                    if let NodeKind::MaybeAbsent(absent) = map.resolve(member.spec())?.kind()
                        && !absent.is_present.call(&field)
                    {
                        continue;
                    }
                    writer.name(member.name())?;
                    return Ok(Resume::Need(member.spec(), field));
                }
                writer.end_object()?;
                Ok(Resume::Done)
            }
            Self::Callback { node, state, value } => {
                let node: &'s CallbackNode = *node;
                if let Some(value) = value.take() {
                    return Ok(Resume::Need(&node.child, value));
                }
                node.after.call(state.clone()).map_err(failed)?;
                Ok(Resume::Done)
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Drivers

pub(crate) fn recursive(
    map: &TypeMap,
    spec: &Spec,
    value: Value,
    writer: &mut JsonWriter<'_>,
) -> Result<(), CodecError> {
    let (mut spec, mut value) = (spec, value);
    loop {
        match begin(map, spec, value, writer)? {
            Step::Done => return Ok(()),
            Step::Delegate(next, inner) => (spec, value) = (next, inner),
            Step::Frame(mut frame) => {
                while let Resume::Need(child, inner) = frame.resume(map, writer)? {
                    recursive(map, child, inner, writer)?;
                }
                return Ok(());
            }
        }
    }
}

pub(crate) fn iterative(
    map: &TypeMap,
    spec: &Spec,
    value: Value,
    writer: &mut JsonWriter<'_>,
) -> Result<(), CodecError> {
    let mut stack: Vec<GenerateFrame<'_>> = Vec::new();
    let mut pending = Some((spec, value));
    loop {
        if let Some((mut spec, mut value)) = pending.take() {
            loop {
                match begin(map, spec, value, writer)? {
                    Step::Done => break,
                    Step::Delegate(next, inner) => (spec, value) = (next, inner),
                    Step::Frame(frame) => {
                        stack.push(frame);
                        break;
                    }
                }
            }
        }
        let Some(frame) = stack.last_mut() else {
            return Ok(());
        };
        match frame.resume(map, writer)? {
            Resume::Need(child, inner) => pending = Some((child, inner)),
            Resume::Done => {
                stack.pop();
            }
        }
    }
}
