// RTMP chunk muxer

use std::cmp::min;
use std::collections::HashMap;

use bytes::Bytes;

use crate::vecbuf::VecBuf;

use super::{
    encode_basic_header, encode_comp_header, encode_full_header, ChunkHeader, DEFAULT_CHUNK_SIZE,
    EXTENDED_TIMESTAMP, RTMP_CHANNEL_PROTOCOL, RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_1,
    RTMP_CHUNK_TYPE_2, RTMP_CHUNK_TYPE_3, RTMP_TYPE_VIDEO,
};

/// One serialized chunk: header bytes plus payload segments
pub struct Chunk {
    pub header: Vec<u8>,
    pub body: Vec<Bytes>,
}

/// Sink for serialized chunks
///
/// The priority hint orders chunks under congestion: video above
/// audio above protocol control. A producer is free to ignore it, but
/// `sync` must guarantee that everything queued at the given priority
/// or above has been fully chunked before it returns.
pub trait ChunkProducer: Send {
    /// Queues the chunks of one message, in order
    fn queue_chunks(&mut self, priority: u32, chunks: Vec<Chunk>);

    /// Forces complete chunking of queued messages with priority >= the
    /// given one
    fn sync(&mut self, priority: u32);
}

/// Chunk producer that writes chunks in FIFO order as they are
/// queued, ignoring priority
pub struct SimpleChunkProducer {
    sender: tokio::sync::mpsc::UnboundedSender<Bytes>,
}

impl SimpleChunkProducer {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<Bytes>) -> SimpleChunkProducer {
        SimpleChunkProducer { sender }
    }
}

impl ChunkProducer for SimpleChunkProducer {
    fn queue_chunks(&mut self, _priority: u32, chunks: Vec<Chunk>) {
        for chunk in chunks {
            // a closed channel means the connection is gone; the
            // session loop notices on its own
            let _ = self.sender.send(Bytes::from(chunk.header));

            for segment in chunk.body {
                let _ = self.sender.send(segment);
            }
        }
    }

    fn sync(&mut self, _priority: u32) {
        // nothing is ever buffered
    }
}

struct CachedHeader {
    abs_time: u32,
    time_delta: u32,
    size: usize,
    msg_type: u32,
    ms_id: u32,
}

/// Serializes messages into chunks, compressing headers against the
/// previous message of the same chunk stream
pub struct Muxer {
    // explicitly reserved chunk stream ids: (ms_id, msg_type) => cs_id
    reserved_csids: HashMap<(u32, u32), u32>,

    // dynamically allocated chunk stream ids: (ms_id, msg_type) => cs_id
    adhoc_csids: HashMap<(u32, u32), u32>,

    // last sent header per chunk stream
    cached: HashMap<u32, CachedHeader>,

    chunk_size: usize,

    producer: Box<dyn ChunkProducer>,
}

impl Muxer {
    /// Creates a muxer writing into the given producer
    pub fn new(producer: Box<dyn ChunkProducer>) -> Muxer {
        Muxer {
            reserved_csids: HashMap::new(),
            adhoc_csids: HashMap::new(),
            cached: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            producer,
        }
    }

    /// Current outgoing chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Pins a chunk stream id for the given message identity
    pub fn reserve_chunk_stream(&mut self, ms_id: u32, msg_type: u32, cs_id: u32) {
        self.reserved_csids.insert((ms_id, msg_type), cs_id);
    }

    /// Changes the outgoing chunk size
    ///
    /// Should be called immediately after queueing the
    /// PROTO_SET_CHUNK_SIZE message; messages queued with the old size
    /// are fully chunked first.
    pub fn set_chunk_size(&mut self, new_chunk_size: usize) {
        self.producer.sync(0);
        self.chunk_size = new_chunk_size;
    }

    fn make_adhoc_csid(&mut self, key: (u32, u32)) -> u32 {
        let reserved_max = self.reserved_csids.values().copied().max().unwrap_or(2);
        let adhoc_max = self.adhoc_csids.values().copied().max().unwrap_or(2);

        let cs_id = reserved_max.max(adhoc_max) + 1;
        self.adhoc_csids.insert(key, cs_id);
        cs_id
    }

    /// Builds and queues the wire representation of a message
    ///
    /// `time` is the absolute message time in milliseconds, already
    /// wrapped to the u32 range. Protocol control messages always go
    /// out absolute on chunk stream 2 with ms_id 0.
    pub fn send_message(
        &mut self,
        time: u32,
        msg_type: u32,
        ms_id: u32,
        mut body: VecBuf,
        absolute: bool,
    ) {
        let size = body.len();

        let mut priority: u32 = 0x10;
        if msg_type == RTMP_TYPE_VIDEO {
            priority += 0x10;
        }

        let mut ms_id = ms_id;
        let mut absolute = absolute;

        let cs_id = if msg_type < 0x08 {
            ms_id = 0;
            priority -= 0x10;
            absolute = true;
            RTMP_CHANNEL_PROTOCOL
        } else {
            let key = (ms_id, msg_type);
            match self
                .reserved_csids
                .get(&key)
                .or_else(|| self.adhoc_csids.get(&key))
            {
                Some(cs_id) => *cs_id,
                None => self.make_adhoc_csid(key),
            }
        };

        let (raw_header, written_time) = if absolute || !self.cached.contains_key(&cs_id) {
            self.cached.insert(
                cs_id,
                CachedHeader {
                    abs_time: time,
                    time_delta: time,
                    size,
                    msg_type,
                    ms_id,
                },
            );

            (
                encode_full_header(cs_id, time, size, msg_type, ms_id),
                time,
            )
        } else {
            let cached = &self.cached[&cs_id];

            let (fmt, new_time) = if ms_id != cached.ms_id {
                (RTMP_CHUNK_TYPE_0, time)
            } else {
                let delta = time as i64 - cached.abs_time as i64;

                if delta < 0 {
                    // time went backwards, do not compress
                    (RTMP_CHUNK_TYPE_0, time)
                } else {
                    let delta = delta as u32;

                    if msg_type == cached.msg_type && size == cached.size {
                        if delta == cached.time_delta {
                            (RTMP_CHUNK_TYPE_3, delta)
                        } else {
                            (RTMP_CHUNK_TYPE_2, delta)
                        }
                    } else {
                        (RTMP_CHUNK_TYPE_1, delta)
                    }
                }
            };

            self.cached.insert(
                cs_id,
                CachedHeader {
                    abs_time: time,
                    time_delta: new_time,
                    size,
                    msg_type,
                    ms_id,
                },
            );

            (
                encode_comp_header(fmt, cs_id, new_time, size, msg_type, ms_id),
                new_time,
            )
        };

        // continuation chunks repeat the extension when the time
        // field is saturated
        let continuation_ext = (written_time >= EXTENDED_TIMESTAMP).then_some(written_time);

        let mut chunks = Vec::new();

        let first = min(size, self.chunk_size);
        chunks.push(Chunk {
            header: raw_header,
            body: body.read_seq(first).unwrap_or_default(),
        });

        while !body.is_empty() {
            let mut header = encode_basic_header(RTMP_CHUNK_TYPE_3, cs_id);

            if let Some(ext) = continuation_ext {
                header.extend_from_slice(&ext.to_be_bytes());
            }

            let piece = min(body.len(), self.chunk_size);
            chunks.push(Chunk {
                header,
                body: body.read_seq(piece).unwrap_or_default(),
            });
        }

        self.producer.queue_chunks(priority, chunks);
    }
}

// Tests
