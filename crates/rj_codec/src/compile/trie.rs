//! Name lookup that reads a string once, character by character.
//!
//! Names are keyed by code point with the end of the string as a final
//! symbol (`-1`), so a name that is a prefix of another still ends on its
//! own leaf. Once a single candidate remains the leaf verifies the rest of
//! it directly. Unknown names are rebuilt from the matched prefix and the
//! unread remainder of the input, so errors can report them in full.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use rj_json::{JsonReader, SyntaxError, SyntaxErrorKind, read_string_chars};

use crate::CodecError;

const END: i32 = -1;

#[derive(Debug)]
enum TrieNode {
    /// The only remaining candidate; `rest` still has to be read.
    Leaf {
        index: usize,
        distinguished: usize,
        rest: Box<[i32]>,
    },
    /// One edge per next symbol, sorted.
    Branch {
        sample: usize,
        edges: Box<[(i32, TrieNode)]>,
    },
    /// A run of symbols shared by every candidate below.
    Run {
        sample: usize,
        symbols: Box<[i32]>,
        next: Box<TrieNode>,
    },
}

/// Maps the names of an object or enum to their indices.
#[derive(Debug)]
pub(crate) struct Trie {
    names: Box<[Box<str>]>,
    root: Option<TrieNode>,
}

impl Trie {
    /// Builds a trie over distinct `names`.
    ///
    /// With `fewer_switches`, chains of single-edge branches collapse into
    /// runs that are compared without a lookup per character.
    pub(crate) fn new<'a>(names: impl IntoIterator<Item = &'a str>, fewer_switches: bool) -> Self {
        let names: Box<[Box<str>]> = names.into_iter().map(Box::from).collect();
        let mut keys: Vec<(Vec<i32>, usize)> = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let mut key: Vec<i32> = name.chars().map(|c| c as i32).collect();
                key.push(END);
                (key, index)
            })
            .collect();
        keys.sort_unstable();
        debug_assert!(keys.windows(2).all(|w| w[0].0 != w[1].0), "names must be distinct");

        let root = (!keys.is_empty()).then(|| build(&keys, 0, fewer_switches));
        Self { names, root }
    }

    #[inline]
    pub(crate) fn name(&self, index: usize) -> &str {
        &self.names[index]
    }

    /// Reads the rest of the current string (after its opening quote) and
    /// finds it. Unknown names come back as `Err` with their full text.
    pub(crate) fn find(
        &self,
        reader: &mut dyn JsonReader,
    ) -> Result<Result<usize, Box<str>>, CodecError> {
        let Some(mut node) = self.root.as_ref() else {
            let mut name = String::new();
            read_string_chars(reader, &mut name)?;
            return Ok(Err(name.into_boxed_str()));
        };
        let mut matched = 0;
        loop {
            match node {
                TrieNode::Leaf {
                    index,
                    distinguished,
                    rest,
                } => {
                    for (offset, &expected) in rest.iter().enumerate() {
                        let c = next_code_point(reader)?;
                        if c != expected {
                            return self.unknown(reader, *index, distinguished + offset, c);
                        }
                    }
                    return Ok(Ok(*index));
                }
                TrieNode::Run { sample, symbols, next } => {
                    for (offset, &expected) in symbols.iter().enumerate() {
                        let c = next_code_point(reader)?;
                        if c != expected {
                            return self.unknown(reader, *sample, matched + offset, c);
                        }
                    }
                    matched += symbols.len();
                    node = next;
                }
                TrieNode::Branch { sample, edges } => {
                    let c = next_code_point(reader)?;
                    match edges.binary_search_by_key(&c, |(symbol, _)| *symbol) {
                        Ok(found) => {
                            matched += 1;
                            node = &edges[found].1;
                        }
                        Err(_) => return self.unknown(reader, *sample, matched, c),
                    }
                }
            }
        }
    }

    /// The name whose first `matched` characters agree with `names[sample]`
    /// and whose next character is `c`.
    #[cold]
    fn unknown(
        &self,
        reader: &mut dyn JsonReader,
        sample: usize,
        matched: usize,
        c: i32,
    ) -> Result<Result<usize, Box<str>>, CodecError> {
        let mut name: String = self.names[sample].chars().take(matched).collect();
        if c != END {
            name.push(char::from_u32(c as u32).ok_or_else(|| surrogate_error(reader, c))?);
            read_string_chars(reader, &mut name)?;
        }
        Ok(Err(name.into_boxed_str()))
    }
}

fn build(keys: &[(Vec<i32>, usize)], depth: usize, fewer_switches: bool) -> TrieNode {
    let sample = keys[0].1;
    if let [(key, index)] = keys {
        return TrieNode::Leaf {
            index: *index,
            distinguished: depth,
            rest: key[depth..].into(),
        };
    }
    // Distinct keys all end in END, so with two or more keys every one is
    // longer than the shared prefix.
    let first = &keys[0].0;
    let last = &keys[keys.len() - 1].0;
    let shared = first[depth..]
        .iter()
        .zip(&last[depth..])
        .take_while(|(a, b)| a == b)
        .count();
    if fewer_switches && shared > 0 {
        return TrieNode::Run {
            sample,
            symbols: first[depth..depth + shared].into(),
            next: Box::new(build(keys, depth + shared, fewer_switches)),
        };
    }

    let mut edges = Vec::new();
    let mut start = 0;
    while start < keys.len() {
        let symbol = keys[start].0[depth];
        let len = keys[start..].iter().take_while(|(key, _)| key[depth] == symbol).count();
        edges.push((symbol, build(&keys[start..start + len], depth + 1, fewer_switches)));
        start += len;
    }
    TrieNode::Branch {
        sample,
        edges: edges.into_boxed_slice(),
    }
}

/// The next character of the current string with surrogate pairs joined.
fn next_code_point(reader: &mut dyn JsonReader) -> Result<i32, SyntaxError> {
    let c = reader.next_string_char()?;
    if !(0xD800..0xDC00).contains(&c) {
        return Ok(c);
    }
    let low = reader.next_string_char()?;
    if (0xDC00..0xE000).contains(&low) {
        Ok(0x10000 + ((c - 0xD800) << 10) + (low - 0xDC00))
    } else {
        Err(surrogate_error(reader, c))
    }
}

#[cold]
fn surrogate_error(reader: &dyn JsonReader, c: i32) -> SyntaxError {
    SyntaxError {
        offset: reader.offset(),
        kind: SyntaxErrorKind::UnpairedSurrogate(c as u32),
        preview: reader.preview().into_boxed_str(),
    }
}
