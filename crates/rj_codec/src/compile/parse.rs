use alloc::vec::Vec;

use rj_json::{Token, TokenSet};
use rj_spec::{BuildError, Member, NodeKind, ObjectNode, Spec, Supplier};
use rj_types::{EnumValue, Value};

use super::{Builder, ParseRoutine, Trie, parse_fn};
use crate::ContentError;
use crate::scalar::{
    expect_fixed, invalid, is_big_integer, parse_big, parse_bool, parse_char, parse_number,
    parse_string, peek_one_of, rejected, take_null,
};

/// The routine of a nullable slot wrapping plain slot `target`.
pub(super) fn nullable_slot(target: usize) -> ParseRoutine {
    parse_fn(move |routines, reader| {
        if take_null(reader)? {
            Ok(Value::Null)
        } else {
            routines.parse(target, reader)
        }
    })
}

struct MemberParser {
    parse: ParseRoutine,
    /// Supplies the value when the member is missing.
    absent: Option<Supplier>,
}

impl Builder<'_> {
    pub(super) fn build_parser(&mut self, spec: &Spec) -> Result<ParseRoutine, BuildError> {
        Ok(match spec.kind() {
            NodeKind::Str => parse_fn(|_, reader| Ok(Value::from(parse_string(reader)?))),
            NodeKind::Bool => parse_fn(|_, reader| parse_bool(reader)),
            NodeKind::Char => parse_fn(|_, reader| parse_char(reader)),
            NodeKind::BigNumber => {
                let integral = is_big_integer(spec.data_type());
                parse_fn(move |_, reader| parse_big(reader, integral))
            }
            NodeKind::Number(kind) | NodeKind::BoxedNumber(kind) => {
                let kind = *kind;
                parse_fn(move |_, reader| parse_number(reader, kind))
            }
            NodeKind::Enum(class) => {
                let class = *class;
                let constants = class.constants().iter().map(|name| &**name);
                let trie = Trie::new(constants, self.fewer_switches);
                parse_fn(move |_, reader| {
                    peek_one_of(reader, TokenSet::STRING)?;
                    reader.start_consuming_string()?;
                    match trie.find(reader)? {
                        Ok(ordinal) => Ok(Value::Enum(EnumValue::from_ordinal(class, ordinal))),
                        Err(name) => Err(invalid(
                            reader,
                            format_args!("unknown constant `{name}` of `{class}`"),
                        )),
                    }
                })
            }
            NodeKind::TypeRef(target) => {
                let slot = self.slots.plain(target)?;
                parse_fn(move |routines, reader| routines.parse(slot, reader))
            }
            NodeKind::Nullable(child) => {
                if let NodeKind::TypeRef(target) = child.kind()
                    && let Some(slot) = self.slots.nullable(target)
                {
                    parse_fn(move |routines, reader| routines.parse(slot, reader))
                } else {
                    let child = self.parser(child)?;
                    parse_fn(move |routines, reader| {
                        if take_null(reader)? {
                            Ok(Value::Null)
                        } else {
                            child(routines, reader)
                        }
                    })
                }
            }
            NodeKind::MaybeAbsent(node) => self.parser(&node.present)?,
            NodeKind::Computed(supplier) => {
                let supplier = supplier.clone();
                parse_fn(move |_, reader| supplier.call().map_err(|e| rejected(reader, e)))
            }
            NodeKind::Converted(node) => {
                let alternate = self.parser(&node.alternate)?;
                let to = node.to.clone();
                parse_fn(move |routines, reader| {
                    let value = alternate(routines, &mut *reader)?;
                    to.call(value).map_err(|e| rejected(reader, e))
                })
            }
            NodeKind::Callback(node) => {
                let child = self.parser(&node.child)?;
                let (before, after) = (node.before.clone(), node.after.clone());
                parse_fn(move |routines, reader| {
                    let state = before.call().map_err(|e| rejected(reader, e))?;
                    let value = child(routines, &mut *reader)?;
                    after.call(state).map_err(|e| rejected(reader, e))?;
                    Ok(value)
                })
            }
            NodeKind::Array(node) => {
                let element = self.parser(&node.element)?;
                let accumulator = node.accumulator.clone();
                parse_fn(move |routines, reader| {
                    expect_fixed(reader, Token::BeginArray)?;
                    let mut acc = accumulator.creator.call().map_err(|e| rejected(reader, e))?;
                    while reader.peek_token()? != Token::EndArray {
                        let item = element(routines, &mut *reader)?;
                        acc = accumulator
                            .integrator
                            .call(acc, item)
                            .map_err(|e| rejected(reader, e))?;
                    }
                    reader.consume_fixed_token(Token::EndArray)?;
                    accumulator.finisher.call(acc).map_err(|e| rejected(reader, e))
                })
            }
            NodeKind::UniformMap(node) => {
                let key = self.parser(&node.key)?;
                let value = self.parser(&node.value)?;
                let accumulator = node.accumulator.clone();
                parse_fn(move |routines, reader| {
                    expect_fixed(reader, Token::BeginObject)?;
                    let mut acc = accumulator.creator.call().map_err(|e| rejected(reader, e))?;
                    let entries = TokenSet::STRING | TokenSet::END_OBJECT;
                    while peek_one_of(reader, entries)? == Token::String {
                        let k = key(routines, &mut *reader)?;
                        let v = value(routines, &mut *reader)?;
                        acc = accumulator
                            .integrator
                            .call(acc, k, v)
                            .map_err(|e| rejected(reader, e))?;
                    }
                    reader.consume_fixed_token(Token::EndObject)?;
                    accumulator.finisher.call(acc).map_err(|e| rejected(reader, e))
                })
            }
            NodeKind::Object(node) => self.object_parser(node)?,
        })
    }

    fn object_parser(&mut self, node: &ObjectNode) -> Result<ParseRoutine, BuildError> {
        let mut members = Vec::with_capacity(node.members().len());
        for member in node.members() {
            let absent = match self.map.resolve(member.spec())?.kind() {
                NodeKind::MaybeAbsent(node) => match node.absent.kind() {
                    NodeKind::Computed(supplier) => Some(supplier.clone()),
                    _ => None,
                },
                _ => None,
            };
            members.push(MemberParser {
                parse: self.parser(member.spec())?,
                absent,
            });
        }
        let trie = Trie::new(node.members().iter().map(Member::name), self.fewer_switches);
        let finisher = node.finisher().clone();

        Ok(parse_fn(move |routines, reader| {
            expect_fixed(reader, Token::BeginObject)?;
            let mut values: Vec<Option<Value>> = alloc::vec![None; members.len()];
            while peek_one_of(reader, TokenSet::STRING | TokenSet::END_OBJECT)? == Token::String {
                let offset = reader.offset();
                reader.start_consuming_string()?;
                let index = match trie.find(reader)? {
                    Ok(index) => index,
                    Err(name) => return Err(ContentError::UnknownMember { offset, name }.into()),
                };
                if values[index].is_some() {
                    let name = trie.name(index).into();
                    return Err(ContentError::DuplicateMember { offset, name }.into());
                }
                values[index] = Some((members[index].parse)(routines, &mut *reader)?);
            }
            reader.consume_fixed_token(Token::EndObject)?;

            let mut args = Vec::with_capacity(values.len());
            for (index, value) in values.into_iter().enumerate() {
                match (value, &members[index].absent) {
                    (Some(value), _) => args.push(value),
                    (None, Some(absent)) => {
                        args.push(absent.call().map_err(|e| rejected(reader, e))?)
                    }
                    (None, None) => {
                        let name = trie.name(index).into();
                        return Err(ContentError::MissingMember {
                            offset: reader.offset(),
                            name,
                        }
                        .into());
                    }
                }
            }
            finisher.call(args).map_err(|e| rejected(reader, e))
        }))
    }
}
