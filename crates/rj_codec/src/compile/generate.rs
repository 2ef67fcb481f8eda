use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use rj_json::write_escaped_content;
use rj_spec::{BuildError, Getter, NodeKind, ObjectNode, Predicate, Spec};

use super::{Builder, GenerateRoutine, generate_fn};
use crate::scalar::{failed, unrepresentable, write_number, write_scalar};

/// The routine of a nullable slot wrapping plain slot `target`.
pub(super) fn nullable_slot(target: usize) -> GenerateRoutine {
    generate_fn(move |routines, writer, value| {
        if value.is_null() {
            Ok(writer.null()?)
        } else {
            routines.generate(target, writer, value)
        }
    })
}

struct MemberGenerator {
    /// The name, escaped for a JSON string.
    escaped: Box<str>,
    accessor: Getter,
    /// Members that may be absent are skipped when this fails.
    is_present: Option<Predicate>,
    generate: GenerateRoutine,
}

fn escape(name: &str) -> Box<str> {
    let mut escaped = String::with_capacity(name.len());
    let written = write_escaped_content(&mut escaped, name);
    debug_assert!(written.is_ok());
    escaped.into_boxed_str()
}

impl Builder<'_> {
    pub(super) fn build_generator(&mut self, spec: &Spec) -> Result<GenerateRoutine, BuildError> {
        Ok(match spec.kind() {
            NodeKind::Number(kind) | NodeKind::BoxedNumber(kind) => {
                let kind = *kind;
                generate_fn(move |_, writer, value| write_number(writer, kind, value))
            }
            kind @ (NodeKind::Str
            | NodeKind::Bool
            | NodeKind::Char
            | NodeKind::BigNumber
            | NodeKind::Enum(_)) => {
                let kind = kind.clone();
                generate_fn(move |_, writer, value| write_scalar(&kind, writer, value))
            }
            NodeKind::TypeRef(target) => {
                let slot = self.slots.plain(target)?;
                generate_fn(move |routines, writer, value| routines.generate(slot, writer, value))
            }
            NodeKind::Nullable(child) => {
                if let NodeKind::TypeRef(target) = child.kind()
                    && let Some(slot) = self.slots.nullable(target)
                {
                    generate_fn(move |routines, writer, value| {
                        routines.generate(slot, writer, value)
                    })
                } else {
                    let child = self.generator(child)?;
                    generate_fn(move |routines, writer, value| {
                        if value.is_null() {
                            Ok(writer.null()?)
                        } else {
                            child(routines, writer, value)
                        }
                    })
                }
            }
            NodeKind::MaybeAbsent(node) => self.generator(&node.present)?,
            NodeKind::Computed(_) => {
                let ty = spec.data_type().clone();
                generate_fn(move |_, _, _| Err(unrepresentable(format_args!("computed `{ty}`"))))
            }
            NodeKind::Converted(node) => {
                let alternate = self.generator(&node.alternate)?;
                let from = node.from.clone();
                generate_fn(move |routines, writer, value| {
                    let converted = from.call(value.clone()).map_err(failed)?;
                    alternate(routines, writer, &converted)
                })
            }
            NodeKind::Callback(node) => {
                let child = self.generator(&node.child)?;
                let (before, after) = (node.before.clone(), node.after.clone());
                generate_fn(move |routines, writer, value| {
                    let state = before.call().map_err(failed)?;
                    child(routines, &mut *writer, value)?;
                    after.call(state).map_err(failed)?;
                    Ok(())
                })
            }
            NodeKind::Array(node) => {
                let element = self.generator(&node.element)?;
                let start = node.emitter.start.clone();
                generate_fn(move |routines, writer, value| {
                    let mut cursor = start.call(value).map_err(failed)?;
                    writer.begin_array()?;
                    while cursor.has_next() {
                        let item = cursor.next().map_err(failed)?;
                        element(routines, &mut *writer, &item)?;
                    }
                    Ok(writer.end_array()?)
                })
            }
            NodeKind::UniformMap(node) => {
                let key = self.generator(&node.key)?;
                let value_generator = self.generator(&node.value)?;
                let emitter = node.emitter.clone();
                generate_fn(move |routines, writer, value| {
                    let mut cursor = emitter.start.call(value).map_err(failed)?;
                    writer.begin_object()?;
                    while cursor.has_next() {
                        let entry = cursor.next().map_err(failed)?;
                        let k = emitter.key.call(&entry).map_err(failed)?;
                        let v = emitter.value.call(&entry).map_err(failed)?;
                        key(routines, &mut *writer, &k)?;
                        value_generator(routines, &mut *writer, &v)?;
                    }
                    Ok(writer.end_object()?)
                })
            }
            NodeKind::Object(node) => self.object_generator(node)?,
        })
    }

    fn object_generator(&mut self, node: &ObjectNode) -> Result<GenerateRoutine, BuildError> {
        let mut members = Vec::with_capacity(node.members().len());
        for member in node.members() {
            let is_present = match self.map.resolve(member.spec())?.kind() {
                NodeKind::MaybeAbsent(node) => Some(node.is_present.clone()),
                _ => None,
            };
            members.push(MemberGenerator {
                escaped: escape(member.name()),
                accessor: member.accessor().clone(),
                is_present,
                generate: self.generator(member.spec())?,
            });
        }

        Ok(generate_fn(move |routines, writer, value| {
            writer.begin_object()?;
            for member in &members {
                let field = member.accessor.call(value).map_err(failed)?;
                if let Some(is_present) = &member.is_present
                    && !is_present.call(&field)
                {
                    continue;
                }
                writer.raw_name(&member.escaped)?;
                (member.generate)(routines, &mut *writer, &field)?;
            }
            Ok(writer.end_object()?)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::escape;

    #[test]
    fn names_are_escaped_once() {
        assert_eq!(&*escape("plain"), "plain");
        assert_eq!(&*escape("a\"b\\c\n\u{1}"), "a\\\"b\\\\c\\n\\u0001");
    }
}
