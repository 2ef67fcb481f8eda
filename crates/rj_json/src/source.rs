use alloc::string::String;
use alloc::vec::Vec;
use std::io;

// -----------------------------------------------------------------------------
// CodeUnit

/// The unit of encoded text a reader consumes: UTF-8 bytes or UTF-16 code
/// units.
pub trait CodeUnit: Copy + Eq + Send + Sync + 'static {
    /// Whether non-ASCII units start a multi-unit UTF-8 sequence.
    const IS_UTF8: bool;

    fn value(self) -> u32;

    /// Lossy rendering of a slice of units, for error previews.
    fn lossy(units: &[Self]) -> String;
}

impl CodeUnit for u8 {
    const IS_UTF8: bool = true;

    #[inline]
    fn value(self) -> u32 {
        self.into()
    }

    fn lossy(units: &[Self]) -> String {
        String::from_utf8_lossy(units).into_owned()
    }
}

impl CodeUnit for u16 {
    const IS_UTF8: bool = false;

    #[inline]
    fn value(self) -> u32 {
        self.into()
    }

    fn lossy(units: &[Self]) -> String {
        String::from_utf16_lossy(units)
    }
}

// -----------------------------------------------------------------------------
// Source

/// Supplies a reader with input, one chunk at a time.
pub trait Source<U: CodeUnit> {
    /// Append the next chunk to `out`. Returns `false` once the input is
    /// exhausted; a `true` return appends at least one unit.
    fn read_chunk(&mut self, out: &mut Vec<U>) -> io::Result<bool>;
}

/// The whole input as one slice.
pub struct SliceSource<'a, U> {
    rest: &'a [U],
}

impl<'a, U> SliceSource<'a, U> {
    #[inline]
    pub fn new(input: &'a [U]) -> Self {
        Self { rest: input }
    }
}

impl<U: CodeUnit> Source<U> for SliceSource<'_, U> {
    fn read_chunk(&mut self, out: &mut Vec<U>) -> io::Result<bool> {
        if self.rest.is_empty() {
            return Ok(false);
        }
        out.extend_from_slice(self.rest);
        self.rest = &[];
        Ok(true)
    }
}

/// A slice delivered in fixed-size chunks, so that tokens and multi-unit
/// characters straddle chunk boundaries.
pub struct ChunkedSource<'a, U> {
    rest: &'a [U],
    chunk: usize,
}

impl<'a, U> ChunkedSource<'a, U> {
    /// # Panics
    ///
    /// Panics if `chunk` is zero.
    pub fn new(input: &'a [U], chunk: usize) -> Self {
        assert!(chunk > 0, "chunk size must be positive");
        Self { rest: input, chunk }
    }
}

impl<U: CodeUnit> Source<U> for ChunkedSource<'_, U> {
    fn read_chunk(&mut self, out: &mut Vec<U>) -> io::Result<bool> {
        if self.rest.is_empty() {
            return Ok(false);
        }
        let len = self.chunk.min(self.rest.len());
        let (head, tail) = self.rest.split_at(len);
        out.extend_from_slice(head);
        self.rest = tail;
        Ok(true)
    }
}

/// UTF-8 input pulled from an [`io::Read`] implementation.
pub struct IoSource<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: io::Read> IoSource<R> {
    const DEFAULT_CAPACITY: usize = 8 * 1024;

    #[inline]
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            buf: alloc::vec![0; capacity.max(1)],
        }
    }
}

impl<R: io::Read> Source<u8> for IoSource<R> {
    fn read_chunk(&mut self, out: &mut Vec<u8>) -> io::Result<bool> {
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    out.extend_from_slice(&self.buf[..n]);
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
