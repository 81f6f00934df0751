//! Recursive Length Prefix decoding.
//!
//! [`RlpItem`] is a zero-copy view into a backing buffer: wrapping never
//! copies the payload, only parses the header. [`RlpReader`] streams
//! consecutive top-level items out of an already-materialized buffer;
//! [`RlpStream`] does the same over an arbitrary [`Read`] byte source,
//! buffering only as much as the next item needs; [`RlpItem::elements`]
//! iterates over a list's payload.
//!
//! Both strict and lenient parsing recognize the same header byte ranges;
//! strict additionally rejects non-canonical (non-minimal) encodings, which
//! is what production RLP consumers should use.

use std::io::Read;

use crate::error::{DecodeError, ErrorKind, Result, RlpHeaderError};
use crate::primitives::get_long;

/// A parsed RLP item: either a string (byte string) or a list, as a view
/// into the buffer it was parsed from.
#[derive(Clone, Copy, Debug)]
pub struct RlpItem<'a> {
    buf: &'a [u8],
    header_index: usize,
    data_index: usize,
    data_len: usize,
    is_list: bool,
}

impl<'a> RlpItem<'a> {
    /// Parses the single RLP item whose header starts at `buf[offset]`.
    ///
    /// In strict mode, rejects non-canonical encodings: long-form headers
    /// used where a short form would do, length-of-length fields with a
    /// leading zero byte, and single bytes `< 0x80` wrapped in a one-byte
    /// string header. Lenient mode accepts all of these.
    pub fn wrap(buf: &'a [u8], offset: usize, strict: bool) -> Result<Self> {
        let header = *buf
            .get(offset)
            .ok_or(DecodeError::Truncated {
                needed: offset + 1,
                available: buf.len(),
            })?;
        match header {
            0x00..=0x7f => Ok(RlpItem {
                buf,
                header_index: offset,
                data_index: offset,
                data_len: 1,
                is_list: false,
            }),
            0x80..=0xb7 => {
                let len = (header - 0x80) as usize;
                let data_index = offset + 1;
                Self::check_bounds(buf, data_index, len)?;
                if strict && len == 1 && buf[data_index] < 0x80 {
                    return Err(DecodeError::NonCanonicalRlp(RlpHeaderError::NonMinimalSingleByte).into());
                }
                Ok(RlpItem {
                    buf,
                    header_index: offset,
                    data_index,
                    data_len: len,
                    is_list: false,
                })
            }
            0xb8..=0xbf => {
                let (data_index, data_len) =
                    Self::read_long_header(buf, offset, header - 0xb7, strict, RlpHeaderError::LongStringTooShort)?;
                Self::check_bounds(buf, data_index, data_len)?;
                Ok(RlpItem {
                    buf,
                    header_index: offset,
                    data_index,
                    data_len,
                    is_list: false,
                })
            }
            0xc0..=0xf7 => {
                let len = (header - 0xc0) as usize;
                let data_index = offset + 1;
                Self::check_bounds(buf, data_index, len)?;
                Ok(RlpItem {
                    buf,
                    header_index: offset,
                    data_index,
                    data_len: len,
                    is_list: true,
                })
            }
            0xf8..=0xff => {
                let (data_index, data_len) =
                    Self::read_long_header(buf, offset, header - 0xf7, strict, RlpHeaderError::LongListTooShort)?;
                Self::check_bounds(buf, data_index, data_len)?;
                Ok(RlpItem {
                    buf,
                    header_index: offset,
                    data_index,
                    data_len,
                    is_list: true,
                })
            }
        }
    }

    fn read_long_header(
        buf: &[u8],
        offset: usize,
        len_of_len: u8,
        strict: bool,
        too_short: RlpHeaderError,
    ) -> Result<(usize, usize)> {
        let len_of_len = len_of_len as usize;
        let loc = offset + 1;
        Self::check_bounds(buf, loc, len_of_len)?;
        if strict && buf[loc] == 0 {
            return Err(DecodeError::NonCanonicalRlp(RlpHeaderError::LeadingZeroInLengthOfLength).into());
        }
        if len_of_len > 8 {
            return Err(DecodeError::NonCanonicalRlp(RlpHeaderError::Overrun).into());
        }
        let len = get_long(buf, loc, len_of_len);
        let len: usize = len
            .try_into()
            .map_err(|_| DecodeError::NonCanonicalRlp(RlpHeaderError::Overrun))?;
        if strict && len < 56 {
            return Err(DecodeError::NonCanonicalRlp(too_short).into());
        }
        Ok((loc + len_of_len, len))
    }

    fn check_bounds(buf: &[u8], start: usize, len: usize) -> Result<()> {
        let end = start.checked_add(len).ok_or(DecodeError::NonCanonicalRlp(RlpHeaderError::Overrun))?;
        if end > buf.len() {
            Err(DecodeError::Truncated {
                needed: end,
                available: buf.len(),
            }
            .into())
        } else {
            Ok(())
        }
    }

    /// `true` if this item's header encoded a list, `false` if a string.
    pub fn is_list(&self) -> bool {
        self.is_list
    }

    /// The offset (within the original buffer) of this item's header byte.
    pub fn header_index(&self) -> usize {
        self.header_index
    }

    /// The offset (within the original buffer) where this item's payload begins.
    pub fn data_index(&self) -> usize {
        self.data_index
    }

    /// The length, in bytes, of this item's payload.
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// The offset one past the end of this item (the start of whatever follows it).
    pub fn end_index(&self) -> usize {
        self.data_index + self.data_len
    }

    /// The raw payload bytes. For a string item this is the string's
    /// content; for a list item this is the concatenated encoding of its
    /// elements (use [`Self::elements`] to parse them).
    pub fn payload(&self) -> &'a [u8] {
        &self.buf[self.data_index..self.end_index()]
    }

    /// Iterates this list item's elements. Errors immediately if this item
    /// is a string, not a list.
    pub fn elements(&self, strict: bool) -> Result<RlpElements<'a>> {
        if !self.is_list {
            return Err(DecodeError::NonCanonicalRlp(RlpHeaderError::NotAList).into());
        }
        Ok(RlpElements {
            buf: self.buf,
            pos: self.data_index,
            end: self.end_index(),
            strict,
        })
    }
}

/// An iterator over the elements of an [`RlpItem`] list, or over consecutive
/// top-level items in a buffer (see [`RlpReader`]).
pub struct RlpElements<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
    strict: bool,
}

impl<'a> Iterator for RlpElements<'a> {
    type Item = Result<RlpItem<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        match RlpItem::wrap(self.buf, self.pos, self.strict) {
            Ok(item) => {
                if item.end_index() > self.end {
                    self.pos = self.end;
                    return Some(Err(DecodeError::NonCanonicalRlp(RlpHeaderError::Overrun).into()));
                }
                self.pos = item.end_index();
                Some(Ok(item))
            }
            Err(e) => {
                self.pos = self.end;
                Some(Err(e))
            }
        }
    }
}

/// A streaming reader over a byte source, yielding consecutive top-level RLP
/// items.
pub struct RlpReader<'a> {
    elements: RlpElements<'a>,
}

impl<'a> RlpReader<'a> {
    pub fn new(buf: &'a [u8], strict: bool) -> Self {
        Self {
            elements: RlpElements {
                buf,
                pos: 0,
                end: buf.len(),
                strict,
            },
        }
    }
}

impl<'a> Iterator for RlpReader<'a> {
    type Item = Result<RlpItem<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.elements.next()
    }
}

/// The chunk size `RlpStream` reads from its source at a time.
const FILL_CHUNK: usize = 4096;

/// A streaming reader over an arbitrary [`Read`] byte source, yielding
/// consecutive top-level RLP items without requiring the whole source to be
/// buffered up front.
///
/// Unlike [`RlpReader`], which wraps an already-materialized slice,
/// `RlpStream` keeps only as much of the source buffered as the next item
/// needs, refilling from `source` on demand. Because each yielded
/// [`RlpItem`] borrows from the internal buffer, `next_item` cannot be
/// expressed as a standard [`Iterator`] (the item's lifetime is tied to the
/// `&mut self` borrow, not to `'a`); call it in a `while let Some(item) =
/// stream.next_item()?` loop instead.
pub struct RlpStream<R> {
    source: R,
    buf: Vec<u8>,
    consumed: usize,
    strict: bool,
}

impl<R: Read> RlpStream<R> {
    pub fn new(source: R, strict: bool) -> Self {
        Self {
            source,
            buf: Vec::new(),
            consumed: 0,
            strict,
        }
    }

    /// Parses and returns the next top-level item, pulling more bytes from
    /// the source as needed. Returns `Ok(None)` once the source is
    /// exhausted at an item boundary. Errors with [`DecodeError::Truncated`]
    /// if the source ends in the middle of an item.
    pub fn next_item(&mut self) -> Result<Option<RlpItem<'_>>> {
        if self.consumed > 0 {
            self.buf.drain(0..self.consumed);
            self.consumed = 0;
        }
        if self.buf.is_empty() && !self.fill_more()? {
            return Ok(None);
        }
        loop {
            let needed = match RlpItem::wrap(&self.buf, 0, self.strict) {
                Ok(item) => {
                    self.consumed = item.end_index();
                    return Ok(Some(item));
                }
                Err(e) => match e.kind() {
                    ErrorKind::Decode(DecodeError::Truncated { needed, .. }) => *needed,
                    _ => return Err(e),
                },
            };
            if !self.fill_to(needed)? {
                return Err(DecodeError::Truncated {
                    needed,
                    available: self.buf.len(),
                }
                .into());
            }
        }
    }

    /// Reads from the source until at least `needed` bytes are buffered, or
    /// the source is exhausted. Returns `false` on exhaustion before
    /// reaching `needed`.
    fn fill_to(&mut self, needed: usize) -> Result<bool> {
        let mut chunk = [0u8; FILL_CHUNK];
        while self.buf.len() < needed {
            let n = self.source.read(&mut chunk).map_err(|e| DecodeError::Io(e.to_string()))?;
            if n == 0 {
                return Ok(false);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(true)
    }

    fn fill_more(&mut self) -> Result<bool> {
        let target = self.buf.len() + 1;
        self.fill_to(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_is_its_own_encoding() {
        let buf = [0x05];
        let item = RlpItem::wrap(&buf, 0, true).unwrap();
        assert!(!item.is_list());
        assert_eq!(item.payload(), &[0x05]);
        assert_eq!(item.end_index(), 1);
    }

    #[test]
    fn empty_string_header() {
        let buf = [0x80];
        let item = RlpItem::wrap(&buf, 0, true).unwrap();
        assert_eq!(item.payload(), &[] as &[u8]);
    }

    #[test]
    fn short_string_header() {
        let buf = [0x83, b'd', b'o', b'g'];
        let item = RlpItem::wrap(&buf, 0, true).unwrap();
        assert_eq!(item.payload(), b"dog");
    }

    #[test]
    fn long_string_header() {
        let payload = vec![b'x'; 56];
        let mut buf = vec![0xb8, 56];
        buf.extend_from_slice(&payload);
        let item = RlpItem::wrap(&buf, 0, true).unwrap();
        assert_eq!(item.payload(), &payload[..]);
    }

    #[test]
    fn strict_mode_rejects_long_string_under_56() {
        let buf = [0xb8, 0x00];
        assert!(RlpItem::wrap(&buf, 0, true).is_err());
        assert!(RlpItem::wrap(&buf, 0, false).is_ok());
    }

    #[test]
    fn list_containing_empty_string() {
        let buf = [0xc1, 0x80];
        let item = RlpItem::wrap(&buf, 0, true).unwrap();
        assert!(item.is_list());
        let elements: Vec<_> = item.elements(true).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].payload(), &[] as &[u8]);
    }

    #[test]
    fn nested_lists() {
        // [ "cat", [ "dog" ] ]
        let buf = [0xc9, 0x83, b'c', b'a', b't', 0xc4, 0x83, b'd', b'o', b'g'];
        let outer = RlpItem::wrap(&buf, 0, true).unwrap();
        let elements: Vec<_> = outer.elements(true).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].payload(), b"cat");
        assert!(elements[1].is_list());
        let inner: Vec<_> = elements[1].elements(true).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(inner[0].payload(), b"dog");
    }

    #[test]
    fn reader_streams_consecutive_top_level_items() {
        let buf = [0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        let items: Vec<_> = RlpReader::new(&buf, true).collect::<Result<_>>().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].payload(), b"cat");
        assert_eq!(items[1].payload(), b"dog");
    }

    #[test]
    fn elements_on_a_string_item_errors() {
        let buf = [0x83, b'c', b'a', b't'];
        let item = RlpItem::wrap(&buf, 0, true).unwrap();
        assert!(item.elements(true).is_err());
    }

    #[test]
    fn rejects_overrun_child() {
        // Outer list declares 1 byte of payload, but the inner header claims 2.
        let buf = [0xc1, 0x82, b'h', b'i'];
        let outer = RlpItem::wrap(&buf, 0, true).unwrap();
        let result: Result<Vec<_>> = outer.elements(true).unwrap().collect();
        assert!(result.is_err());
    }

    /// A `Read` source that only ever yields a handful of bytes per call,
    /// to exercise `RlpStream`'s refill loop instead of satisfying every
    /// `fill_to` in one read.
    struct Trickle<'a> {
        data: &'a [u8],
        pos: usize,
        step: usize,
    }

    impl<'a> Read for Trickle<'a> {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(out.len()).min(self.data.len() - self.pos);
            out[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn stream_yields_consecutive_items_from_trickling_source() {
        let data = [0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g'];
        let source = Trickle {
            data: &data,
            pos: 0,
            step: 3,
        };
        let mut stream = RlpStream::new(source, true);
        let first = stream.next_item().unwrap().unwrap();
        assert_eq!(first.payload(), b"cat");
        let second = stream.next_item().unwrap().unwrap();
        assert_eq!(second.payload(), b"dog");
        assert!(stream.next_item().unwrap().is_none());
    }

    #[test]
    fn stream_yields_a_long_item_spanning_many_small_reads() {
        let payload = vec![b'z'; 100];
        let mut data = vec![0xb8, 100];
        data.extend_from_slice(&payload);
        let source = Trickle {
            data: &data,
            pos: 0,
            step: 7,
        };
        let mut stream = RlpStream::new(source, true);
        let item = stream.next_item().unwrap().unwrap();
        assert_eq!(item.payload(), &payload[..]);
        assert!(stream.next_item().unwrap().is_none());
    }

    #[test]
    fn stream_reports_clean_eof_with_zero_pending_bytes() {
        let data: [u8; 0] = [];
        let source = Trickle {
            data: &data,
            pos: 0,
            step: 4,
        };
        let mut stream = RlpStream::new(source, true);
        assert!(stream.next_item().unwrap().is_none());
    }

    #[test]
    fn stream_errors_on_truncation_mid_item() {
        // Header claims a 3-byte string but only 1 byte follows before EOF.
        let data = [0x83, b'h'];
        let source = Trickle {
            data: &data,
            pos: 0,
            step: 1,
        };
        let mut stream = RlpStream::new(source, true);
        let err = stream.next_item().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Decode(DecodeError::Truncated { .. })));
    }
}
