use alloc::vec::Vec;
use core::fmt::{self, Write};

#[derive(Clone, Copy, Debug)]
struct Frame {
    object: bool,
    first: bool,
    /// Objects only: the next string is a member name.
    expect_name: bool,
}

/// Compact JSON output over any [`fmt::Write`].
///
/// The writer places commas and colons itself. Inside an object, a string
/// written where a member name is expected becomes the name, so map keys and
/// record members are written the same way. Any other value in name
/// position, or a name outside of one, fails with [`fmt::Error`] and
/// writes nothing.
///
/// # Examples
///
/// ```
/// use rj_json::JsonWriter;
///
/// let mut out = String::new();
/// let mut w = JsonWriter::new(&mut out);
/// w.begin_object().unwrap();
/// w.name("ids").unwrap();
/// w.begin_array().unwrap();
/// w.int(1).unwrap();
/// w.string("two\n").unwrap();
/// w.end_array().unwrap();
/// w.end_object().unwrap();
/// assert_eq!(out, r#"{"ids":[1,"two\n"]}"#);
/// ```
pub struct JsonWriter<'w> {
    out: &'w mut dyn Write,
    stack: Vec<Frame>,
}

impl<'w> JsonWriter<'w> {
    #[inline]
    pub fn new(out: &'w mut dyn Write) -> Self {
        Self {
            out,
            stack: Vec::new(),
        }
    }

    /// Current nesting depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn before_value(&mut self) -> fmt::Result {
        if let Some(top) = self.stack.last_mut() {
            if top.object {
                if top.expect_name {
                    return Err(fmt::Error);
                }
                top.expect_name = true;
            } else if top.first {
                top.first = false;
            } else {
                self.out.write_char(',')?;
            }
        }
        Ok(())
    }

    fn before_name(&mut self) -> fmt::Result {
        match self.stack.last_mut() {
            Some(top) if top.object && top.expect_name => {
                top.expect_name = false;
                if top.first {
                    top.first = false;
                    Ok(())
                } else {
                    self.out.write_char(',')
                }
            }
            _ => Err(fmt::Error),
        }
    }

    #[inline]
    fn in_name_position(&self) -> bool {
        self.stack.last().is_some_and(|top| top.object && top.expect_name)
    }

    // ------------------------------------------------------------------
    // Structure

    pub fn begin_array(&mut self) -> fmt::Result {
        self.before_value()?;
        self.stack.push(Frame {
            object: false,
            first: true,
            expect_name: false,
        });
        self.out.write_char('[')
    }

    pub fn end_array(&mut self) -> fmt::Result {
        let frame = self.stack.pop();
        debug_assert!(frame.is_some_and(|f| !f.object), "no array to end");
        self.out.write_char(']')
    }

    pub fn begin_object(&mut self) -> fmt::Result {
        self.before_value()?;
        self.stack.push(Frame {
            object: true,
            first: true,
            expect_name: true,
        });
        self.out.write_char('{')
    }

    pub fn end_object(&mut self) -> fmt::Result {
        let frame = self.stack.pop();
        debug_assert!(frame.is_some_and(|f| f.object && f.expect_name), "no object to end");
        self.out.write_char('}')
    }

    /// Write a member name followed by `:`.
    pub fn name(&mut self, name: &str) -> fmt::Result {
        self.before_name()?;
        write_escaped(self.out, name)?;
        self.out.write_char(':')
    }

    /// Write a member name that needs no escaping.
    ///
    /// Used with names escaped once ahead of time.
    pub fn raw_name(&mut self, escaped: &str) -> fmt::Result {
        self.before_name()?;
        self.out.write_char('"')?;
        self.out.write_str(escaped)?;
        self.out.write_str("\":")
    }

    // ------------------------------------------------------------------
    // Scalars

    /// Write a string value, or a member name in name position.
    pub fn string(&mut self, s: &str) -> fmt::Result {
        if self.in_name_position() {
            return self.name(s);
        }
        self.before_value()?;
        write_escaped(self.out, s)
    }

    pub fn char(&mut self, c: char) -> fmt::Result {
        let mut buf = [0; 4];
        self.string(c.encode_utf8(&mut buf))
    }

    pub fn bool(&mut self, value: bool) -> fmt::Result {
        self.before_value()?;
        self.out.write_str(if value { "true" } else { "false" })
    }

    pub fn null(&mut self) -> fmt::Result {
        self.before_value()?;
        self.out.write_str("null")
    }

    pub fn int(&mut self, value: i64) -> fmt::Result {
        self.before_value()?;
        write!(self.out, "{value}")
    }

    /// Write a finite double in its shortest round-tripping form.
    pub fn float(&mut self, value: f64) -> fmt::Result {
        debug_assert!(value.is_finite());
        self.before_value()?;
        write!(self.out, "{value:?}")
    }

    /// Write a finite single-precision float in its shortest form.
    pub fn float32(&mut self, value: f32) -> fmt::Result {
        debug_assert!(value.is_finite());
        self.before_value()?;
        write!(self.out, "{value:?}")
    }

    /// Write a numeral that is already valid JSON.
    pub fn numeral(&mut self, numeral: &str) -> fmt::Result {
        self.before_value()?;
        self.out.write_str(numeral)
    }
}

impl fmt::Debug for JsonWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonWriter")
            .field("depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}

/// Write `s` as a quoted JSON string.
pub fn write_escaped(out: &mut dyn Write, s: &str) -> fmt::Result {
    out.write_char('"')?;
    write_escaped_content(out, s)?;
    out.write_char('"')
}

/// Write the escaped content of `s`, without quotes.
pub fn write_escaped_content(out: &mut dyn Write, s: &str) -> fmt::Result {
    let mut start = 0;
    for (i, c) in s.char_indices() {
        let escape = match c {
            '"' => "\\\"",
            '\\' => "\\\\",
            '\n' => "\\n",
            '\r' => "\\r",
            '\t' => "\\t",
            '\u{08}' => "\\b",
            '\u{0C}' => "\\f",
            '\u{00}'..='\u{1F}' => "",
            _ => continue,
        };
        out.write_str(&s[start..i])?;
        if escape.is_empty() {
            write!(out, "\\u{:04x}", c as u32)?;
        } else {
            out.write_str(escape)?;
        }
        start = i + c.len_utf8();
    }
    out.write_str(&s[start..])
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::JsonWriter;

    #[test]
    fn separators_and_escapes() {
        let mut out = String::new();
        let mut w = JsonWriter::new(&mut out);
        w.begin_array().unwrap();
        w.begin_object().unwrap();
        w.string("k\"1").unwrap();
        w.null().unwrap();
        w.raw_name("k2").unwrap();
        w.begin_array().unwrap();
        w.end_array().unwrap();
        w.end_object().unwrap();
        w.string("\u{01}\\").unwrap();
        w.bool(false).unwrap();
        w.float(0.5).unwrap();
        w.float32(1.0).unwrap();
        w.end_array().unwrap();
        assert_eq!(out, r#"[{"k\"1":null,"k2":[]},"\u0001\\",false,0.5,1.0]"#);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed[0]["k\"1"], serde_json::Value::Null);
    }

    #[test]
    fn empty_containers() {
        let mut out = String::new();
        let mut w = JsonWriter::new(&mut out);
        w.begin_object().unwrap();
        w.name("a").unwrap();
        w.begin_object().unwrap();
        w.end_object().unwrap();
        w.end_object().unwrap();
        assert_eq!(out, r#"{"a":{}}"#);
    }

    #[test]
    fn values_in_name_position_are_refused() {
        let mut out = String::new();
        let mut w = JsonWriter::new(&mut out);
        w.begin_object().unwrap();
        assert!(w.int(1).is_err());
        assert!(w.begin_array().is_err());
        w.name("k").unwrap();
        assert!(w.name("again").is_err());
        w.int(1).unwrap();
        w.end_object().unwrap();
        assert_eq!(out, r#"{"k":1}"#);

        let mut out = String::new();
        assert!(JsonWriter::new(&mut out).name("top").is_err());
        assert!(out.is_empty());
    }
}
