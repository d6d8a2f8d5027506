// Vectored byte buffer

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

/// Error signaling that a read requested more bytes than are buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not enough data in buffer")]
pub struct VecBufEob;

/// FIFO of byte segments
///
/// Reads that fall inside the first segment are zero-copy slices;
/// reads spanning segments flatten into a single copy. The sequence
/// forms (read_seq, peek_seq) never copy whole segments.
#[derive(Clone, Default)]
pub struct VecBuf {
    segments: VecDeque<Bytes>,

    // Consumed prefix of the first segment
    offset: usize,

    // Total buffered bytes, including the consumed prefix
    length: usize,
}

impl VecBuf {
    /// Creates an empty buffer
    pub fn new() -> VecBuf {
        VecBuf {
            segments: VecDeque::new(),
            offset: 0,
            length: 0,
        }
    }

    /// Creates a buffer from a sequence of segments
    pub fn from_segments<I, B>(segments: I) -> VecBuf
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut buf = VecBuf::new();
        buf.write_seq(segments);
        buf
    }

    /// Remaining (unread) bytes
    pub fn len(&self) -> usize {
        self.length - self.offset
    }

    /// Returns true if no bytes remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a segment
    pub fn write<B: Into<Bytes>>(&mut self, data: B) {
        let data = data.into();

        if data.is_empty() {
            return;
        }

        self.length += data.len();
        self.segments.push_back(data);
    }

    /// Appends a sequence of segments
    pub fn write_seq<I, B>(&mut self, segments: I)
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        for segment in segments {
            self.write(segment);
        }
    }

    /// Reads n bytes as a single segment
    ///
    /// Zero-copy when the request lies within the first segment,
    /// a single flattening copy otherwise.
    pub fn read(&mut self, n: usize) -> Result<Bytes, VecBufEob> {
        if n > self.len() {
            return Err(VecBufEob);
        }

        if n == 0 {
            return Ok(Bytes::new());
        }

        if let Some(first) = self.segments.front() {
            if self.offset + n < first.len() {
                let slice = first.slice(self.offset..self.offset + n);
                self.offset += n;
                return Ok(slice);
            }
        }

        Ok(flatten(&self.read_seq(n)?))
    }

    /// Returns n bytes from the start of the buffer as a single
    /// segment, without consuming them
    pub fn peek(&self, n: usize) -> Result<Bytes, VecBufEob> {
        if n > self.len() {
            return Err(VecBufEob);
        }

        if n == 0 {
            return Ok(Bytes::new());
        }

        if let Some(first) = self.segments.front() {
            if self.offset + n <= first.len() {
                return Ok(first.slice(self.offset..self.offset + n));
            }
        }

        Ok(flatten(&self.peek_seq(n)?))
    }

    /// Reads n bytes as a sequence of segments, iovec style
    pub fn read_seq(&mut self, n: usize) -> Result<Vec<Bytes>, VecBufEob> {
        if n > self.len() {
            return Err(VecBufEob);
        }

        let mut result = Vec::new();
        let mut remaining = n;

        while remaining > 0 {
            let first = match self.segments.pop_front() {
                Some(s) => s,
                None => return Err(VecBufEob),
            };

            let available = first.len() - self.offset;

            if remaining >= available {
                result.push(first.slice(self.offset..));
                self.length -= first.len();
                self.offset = 0;
                remaining -= available;
            } else {
                result.push(first.slice(self.offset..self.offset + remaining));
                self.offset += remaining;
                remaining = 0;
                self.segments.push_front(first);
            }
        }

        Ok(result)
    }

    /// Returns n bytes from the start of the buffer as a sequence of
    /// segments, without consuming them
    pub fn peek_seq(&self, n: usize) -> Result<Vec<Bytes>, VecBufEob> {
        if n > self.len() {
            return Err(VecBufEob);
        }

        let mut result = Vec::new();
        let mut remaining = n;
        let mut offset = self.offset;

        for segment in self.segments.iter() {
            if remaining == 0 {
                break;
            }

            let available = segment.len() - offset;

            if remaining >= available {
                result.push(segment.slice(offset..));
                remaining -= available;
            } else {
                result.push(segment.slice(offset..offset + remaining));
                remaining = 0;
            }

            offset = 0;
        }

        Ok(result)
    }

    /// Reads n bytes into a new buffer
    pub fn read_clone(&mut self, n: usize) -> Result<VecBuf, VecBufEob> {
        Ok(VecBuf::from_segments(self.read_seq(n)?))
    }

    /// Clones the remaining bytes into a new buffer, without
    /// consuming them
    pub fn clone_remaining(&self) -> VecBuf {
        VecBuf::from_segments(self.peek_seq(self.len()).unwrap_or_default())
    }

    /// Reads all remaining bytes as a single segment
    pub fn read_all(&mut self) -> Bytes {
        let n = self.len();
        self.read(n).unwrap_or_default()
    }

    /// Returns all remaining bytes as a contiguous vector, without
    /// consuming them
    pub fn to_vec(&self) -> Vec<u8> {
        let segments = self.peek_seq(self.len()).unwrap_or_default();
        flatten(&segments).to_vec()
    }
}

impl PartialEq for VecBuf {
    // equality over logical content, ignoring segmentation
    fn eq(&self, other: &VecBuf) -> bool {
        self.len() == other.len() && self.to_vec() == other.to_vec()
    }
}

impl std::fmt::Debug for VecBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VecBuf")
            .field("len", &self.len())
            .field("segments", &self.segments.len())
            .finish()
    }
}

impl From<Vec<u8>> for VecBuf {
    fn from(data: Vec<u8>) -> VecBuf {
        VecBuf::from_segments([data])
    }
}

impl From<&[u8]> for VecBuf {
    fn from(data: &[u8]) -> VecBuf {
        VecBuf::from_segments([Bytes::copy_from_slice(data)])
    }
}

impl From<Bytes> for VecBuf {
    fn from(data: Bytes) -> VecBuf {
        VecBuf::from_segments([data])
    }
}

/// Concatenates a sequence of segments into one
pub fn flatten(segments: &[Bytes]) -> Bytes {
    if segments.len() == 1 {
        return segments[0].clone();
    }

    let total: usize = segments.iter().map(|s| s.len()).sum();
    let mut out = BytesMut::with_capacity(total);

    for segment in segments {
        out.extend_from_slice(segment);
    }

    out.freeze()
}

// Tests
