// RTMP chunk header model

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{EXTENDED_TIMESTAMP, RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_2, RTMP_CHUNK_TYPE_3};

/// Fully resolved chunk header
///
/// `time` holds the raw time field as seen on the wire (absolute for
/// type 0, a delta otherwise), `abs_time` the accumulated absolute
/// timestamp in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk stream id
    pub cs_id: u32,

    /// Raw time field value
    pub time: u32,

    /// Message payload size in bytes
    pub size: usize,

    /// Message type
    pub msg_type: u32,

    /// Message stream id
    pub ms_id: u32,

    /// True if the header carried a full ms_id (type 0)
    pub absolute: bool,

    /// Accumulated absolute timestamp in milliseconds
    pub abs_time: u32,
}

impl ChunkHeader {
    /// Builds an absolute (type 0) header
    pub fn full(cs_id: u32, time: u32, size: usize, msg_type: u32, ms_id: u32) -> ChunkHeader {
        ChunkHeader {
            cs_id,
            time,
            size,
            msg_type,
            ms_id,
            absolute: true,
            abs_time: time,
        }
    }
}

/// Header fields as present on the wire; the missing ones are filled
/// from the chunk stream cache
#[derive(Clone, Debug, Default)]
pub struct PartialHeader {
    pub fmt: u32,
    pub cs_id: u32,
    pub time: Option<u32>,
    pub size: Option<usize>,
    pub msg_type: Option<u32>,
    pub ms_id: Option<u32>,
}

impl PartialHeader {
    /// Turns a type-0 wire header into an absolute header
    ///
    /// Returns None when any field is missing.
    pub fn into_absolute(self) -> Option<ChunkHeader> {
        Some(ChunkHeader::full(
            self.cs_id,
            self.time?,
            self.size?,
            self.msg_type?,
            self.ms_id?,
        ))
    }
}

/// Expands a compressed header against the last absolutized header of
/// the same chunk stream
///
/// Missing fields are inherited from the base; the time field of a
/// compressed header is a delta added to the base's absolute time.
pub fn absolutize(header: &PartialHeader, base: &ChunkHeader) -> ChunkHeader {
    let time = header.time.unwrap_or(base.time);
    let size = header.size.unwrap_or(base.size);
    let msg_type = header.msg_type.unwrap_or(base.msg_type);

    match header.ms_id {
        Some(ms_id) => ChunkHeader {
            cs_id: header.cs_id,
            time,
            size,
            msg_type,
            ms_id,
            absolute: true,
            abs_time: time,
        },
        None => ChunkHeader {
            cs_id: header.cs_id,
            time,
            size,
            msg_type,
            ms_id: base.ms_id,
            absolute: false,
            abs_time: base.abs_time.wrapping_add(time),
        },
    }
}

/// Serializes a basic header
pub fn encode_basic_header(fmt: u32, cs_id: u32) -> Vec<u8> {
    if cs_id > 0x013f {
        // 255 + 64: two extra bytes, little endian
        vec![
            ((fmt << 6) as u8) | 1,
            ((cs_id - 64) & 0xff) as u8,
            (((cs_id - 64) >> 8) & 0xff) as u8,
        ]
    } else if cs_id >= 64 {
        vec![(fmt << 6) as u8, (cs_id - 64) as u8]
    } else {
        vec![((fmt << 6) as u8) | (cs_id as u8)]
    }
}

fn push_time_size_type(out: &mut Vec<u8>, write_time: u32, size: usize, msg_type: u32) {
    let mut buf = [0u8; 4];

    BigEndian::write_u32(&mut buf, write_time);
    out.extend_from_slice(&buf[1..]);

    BigEndian::write_u32(&mut buf, size as u32);
    out.extend_from_slice(&buf[1..]);

    out.push(msg_type as u8);
}

/// Serializes an absolute (type 0) chunk header, including the
/// extended timestamp when the time saturates the 24-bit field
pub fn encode_full_header(
    cs_id: u32,
    time: u32,
    size: usize,
    msg_type: u32,
    ms_id: u32,
) -> Vec<u8> {
    let mut out = encode_basic_header(RTMP_CHUNK_TYPE_0, cs_id);

    let write_time = time.min(EXTENDED_TIMESTAMP);

    push_time_size_type(&mut out, write_time, size, msg_type);

    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, ms_id);
    out.extend_from_slice(&buf);

    if time >= EXTENDED_TIMESTAMP {
        BigEndian::write_u32(&mut buf, time);
        out.extend_from_slice(&buf);
    }

    out
}

/// Serializes any type of chunk header
pub fn encode_comp_header(
    fmt: u32,
    cs_id: u32,
    time: u32,
    size: usize,
    msg_type: u32,
    ms_id: u32,
) -> Vec<u8> {
    if fmt == RTMP_CHUNK_TYPE_0 {
        return encode_full_header(cs_id, time, size, msg_type, ms_id);
    }

    let mut out = encode_basic_header(fmt, cs_id);

    if fmt == RTMP_CHUNK_TYPE_3 {
        // just the basic header; the extended timestamp, when the
        // governing time value is saturated, follows anyway
        if time >= EXTENDED_TIMESTAMP {
            let mut buf = [0u8; 4];
            BigEndian::write_u32(&mut buf, time);
            out.extend_from_slice(&buf);
        }
        return out;
    }

    let write_time = time.min(EXTENDED_TIMESTAMP);

    if fmt == RTMP_CHUNK_TYPE_2 {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, write_time);
        out.extend_from_slice(&buf[1..]);
    } else {
        push_time_size_type(&mut out, write_time, size, msg_type);
    }

    if time >= EXTENDED_TIMESTAMP {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, time);
        out.extend_from_slice(&buf);
    }

    out
}

// Tests
