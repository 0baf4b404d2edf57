//! Binary serialisation of downstream cactus objects (`SPEC_FULL.md` 6, 6.1).
//!
//! A flat, self-delimiting stream of tagged records, matching the shape of
//! `eventTree_writeBinaryRepresentation`/`binaryRepresentation_peekNextElementType` in the
//! original source. Simpler than `libojo::patch::HashingWriter`/`HashingReader` (no hashing is
//! needed here), but the same wrap-any-`io::Write`/`io::Read` newtype shape.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::ids::Name;

/// One record's element type. Values match the wire encoding exactly; do not renumber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    /// An event-tree node record.
    EventTree = 1,
    /// A pinch-graph block record.
    Block = 2,
    /// A segment (a block's occurrence on one contig) record.
    Segment = 3,
    /// A stub/cap end record.
    End = 4,
    /// A group record.
    Group = 5,
    /// A net record.
    Net = 6,
    /// A chain record.
    Chain = 7,
}

impl Tag {
    fn from_byte(byte: u8) -> Option<Tag> {
        match byte {
            1 => Some(Tag::EventTree),
            2 => Some(Tag::Block),
            3 => Some(Tag::Segment),
            4 => Some(Tag::End),
            5 => Some(Tag::Group),
            6 => Some(Tag::Net),
            7 => Some(Tag::Chain),
            _ => None,
        }
    }
}

/// Writes tagged, self-delimiting records to any `io::Write`.
pub struct CactusWriter<W: Write> {
    inner: W,
}

impl<W: Write> CactusWriter<W> {
    /// Wraps `inner` for tagged-record writing.
    pub fn new(inner: W) -> CactusWriter<W> {
        CactusWriter { inner }
    }

    /// Writes a record's tag byte.
    pub fn write_tag(&mut self, tag: Tag) -> io::Result<()> {
        self.inner.write_u8(tag as u8)
    }

    /// Writes a contig/event name as a little-endian `u64`.
    pub fn write_name(&mut self, name: Name) -> io::Result<()> {
        self.inner.write_u64::<LittleEndian>(name as u64)
    }

    /// Writes a signed coordinate as a little-endian `i64`.
    pub fn write_i64(&mut self, value: i64) -> io::Result<()> {
        self.inner.write_i64::<LittleEndian>(value)
    }

    /// Length-prefixed UTF-8, no terminator — the idiomatic equivalent of the source's
    /// NUL-terminated `char*` event names and sequence headers.
    pub fn write_string(&mut self, value: &str) -> io::Result<()> {
        self.inner.write_u32::<LittleEndian>(value.len() as u32)?;
        self.inner.write_all(value.as_bytes())
    }

    /// Unwraps the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Wraps `io::Read` with a one-byte lookahead buffer so `peek_tag` can report the next record's
/// tag without consuming it, since `std::io::Read` has no native peek.
pub struct CactusReader<R: Read> {
    inner: R,
    lookahead: Option<u8>,
}

impl<R: Read> CactusReader<R> {
    /// Wraps `inner` for tagged-record reading.
    pub fn new(inner: R) -> CactusReader<R> {
        CactusReader {
            inner,
            lookahead: None,
        }
    }

    fn fill_lookahead(&mut self) -> io::Result<Option<u8>> {
        if self.lookahead.is_none() {
            let mut byte = [0u8; 1];
            match self.inner.read(&mut byte)? {
                0 => return Ok(None),
                _ => self.lookahead = Some(byte[0]),
            }
        }
        Ok(self.lookahead)
    }

    /// Reports the next record's tag without consuming it. `None` at end of stream, or if the
    /// byte isn't a recognised tag.
    pub fn peek_tag(&mut self) -> io::Result<Option<Tag>> {
        Ok(self.fill_lookahead()?.and_then(Tag::from_byte))
    }

    /// Reads and consumes the next record's tag. `None` at end of stream, or if the byte isn't a
    /// recognised tag.
    pub fn read_tag(&mut self) -> io::Result<Option<Tag>> {
        let byte = match self.fill_lookahead()? {
            None => return Ok(None),
            Some(byte) => byte,
        };
        self.lookahead = None;
        Ok(Tag::from_byte(byte))
    }

    /// Reads a contig/event name written by [`CactusWriter::write_name`].
    pub fn read_name(&mut self) -> io::Result<Name> {
        Ok(self.inner.read_u64::<LittleEndian>()? as Name)
    }

    /// Reads a signed coordinate written by [`CactusWriter::write_i64`].
    pub fn read_i64(&mut self) -> io::Result<i64> {
        self.inner.read_i64::<LittleEndian>()
    }

    /// Reads a string written by [`CactusWriter::write_string`].
    pub fn read_string(&mut self) -> io::Result<String> {
        let len = self.inner.read_u32::<LittleEndian>()? as usize;
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
