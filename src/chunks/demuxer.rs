// RTMP chunk demuxer

use std::cmp::min;
use std::collections::HashMap;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;

use crate::vecbuf::VecBuf;

use super::{
    absolutize, get_rtmp_header_size, ChunkHeader, PartialHeader, DEFAULT_CHUNK_SIZE,
    EXTENDED_TIMESTAMP, RTMP_CHANNEL_PROTOCOL, RTMP_CHUNK_TYPE_0, RTMP_CHUNK_TYPE_2,
    RTMP_CHUNK_TYPE_3, RTMP_TYPE_ABORT, RTMP_TYPE_ACKNOWLEDGEMENT, RTMP_TYPE_EVENT,
    RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_SET_PEER_BANDWIDTH,
    RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE, STREAM_BEGIN, STREAM_BUFFER_LENGTH, STREAM_DRY,
    STREAM_EOF, STREAM_IS_RECORDED, STREAM_PING, STREAM_PONG,
};

/// Chunk stream error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkStreamError {
    /// Malformed basic/message header or control message body
    #[error("chunk stream parse error: {0}")]
    Parse(String),

    /// Well-formed but invalid value (e.g. chunk size 0)
    #[error("chunk stream value error: {0}")]
    Value(String),
}

/// User control sub-event (message type 4)
#[derive(Debug, Clone, PartialEq)]
pub enum UserControlEvent {
    StreamBegin { stream_id: u32 },
    StreamEof { stream_id: u32 },
    StreamDry { stream_id: u32 },
    SetBufferLength { stream_id: u32, length: u32 },
    StreamIsRecorded { stream_id: u32 },
    Ping { timestamp: u32 },
    Pong { timestamp: u32 },
    Unknown { event_type: u16, body: VecBuf },
}

/// Event produced by the demuxer
#[derive(Debug, Clone)]
pub enum DemuxedEvent {
    /// A complete non-control message
    Message { header: ChunkHeader, body: VecBuf },

    /// Chunk size change, already applied to subsequent parsing
    SetChunkSize { size: usize },

    /// The in-progress message on the chunk stream was dropped
    AbortMessage { cs_id: u32 },

    /// Peer acknowledged this many received bytes
    Acknowledgement { sequence: u32 },

    /// User control event
    UserControl {
        header: ChunkHeader,
        event: UserControlEvent,
    },

    /// Peer announced its ack window
    WindowSize { window_size: u32 },

    /// Peer requested an output bandwidth limit
    SetPeerBandwidth { window_size: u32, limit_type: u8 },

    /// Undocumented control message (type 7), surfaced raw
    ControlUnknown { header: ChunkHeader, body: VecBuf },
}

struct InProgressMessage {
    header: ChunkHeader,
    body: VecBuf,
    to_read: usize,
}

enum DemuxerState {
    NeedBasic,
    NeedHeader { fmt: u32, cs_code: u32 },
    NeedExtendedTime { partial: PartialHeader },
    NeedContinuationTime { cs_id: u32, expected: u32 },
    NeedPayload { cs_id: u32 },
}

enum StepOutcome {
    NeedMore,
    Continue,
    Event(DemuxedEvent),
}

// Extra basic-header bytes per cs_id code (0, 1, 2+)
const CSID_EXTRA_SIZES: [usize; 3] = [1, 2, 0];

/// Parses a stream of chunks into whole messages
///
/// Byte-fed: `data_received` accepts arbitrary slices of the wire
/// stream and returns the events completed by them. The sequence of
/// events does not depend on how the stream is chopped up.
pub struct Demuxer {
    buf: VecBuf,
    state: DemuxerState,
    chunk_size: usize,

    // In-flight message per chunk stream
    in_progress: HashMap<u32, InProgressMessage>,

    // Last fully absolutized header per chunk stream, used to expand
    // compressed successors
    last_headers: HashMap<u32, ChunkHeader>,
}

impl Default for Demuxer {
    fn default() -> Demuxer {
        Demuxer::new()
    }
}

impl Demuxer {
    /// Creates a demuxer with the default chunk size
    pub fn new() -> Demuxer {
        Demuxer {
            buf: VecBuf::new(),
            state: DemuxerState::NeedBasic,
            chunk_size: DEFAULT_CHUNK_SIZE,
            in_progress: HashMap::new(),
            last_headers: HashMap::new(),
        }
    }

    /// Current incoming chunk size
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Feeds bytes into the parser, returning the events they complete
    pub fn data_received(&mut self, data: &[u8]) -> Result<Vec<DemuxedEvent>, ChunkStreamError> {
        self.buf.write(data.to_vec());

        let mut events = Vec::new();

        loop {
            match self.step()? {
                StepOutcome::NeedMore => break,
                StepOutcome::Continue => {}
                StepOutcome::Event(event) => events.push(event),
            }
        }

        Ok(events)
    }

    fn step(&mut self) -> Result<StepOutcome, ChunkStreamError> {
        match &self.state {
            DemuxerState::NeedBasic => self.step_basic(),
            DemuxerState::NeedHeader { fmt, cs_code } => {
                let (fmt, cs_code) = (*fmt, *cs_code);
                self.step_header(fmt, cs_code)
            }
            DemuxerState::NeedExtendedTime { partial } => {
                let partial = partial.clone();
                self.step_extended_time(partial)
            }
            DemuxerState::NeedContinuationTime { cs_id, expected } => {
                let (cs_id, expected) = (*cs_id, *expected);
                self.step_continuation_time(cs_id, expected)
            }
            DemuxerState::NeedPayload { cs_id } => {
                let cs_id = *cs_id;
                self.step_payload(cs_id)
            }
        }
    }

    fn step_basic(&mut self) -> Result<StepOutcome, ChunkStreamError> {
        if self.buf.is_empty() {
            return Ok(StepOutcome::NeedMore);
        }

        let byte = self.read_bytes(1)?[0];

        self.state = DemuxerState::NeedHeader {
            fmt: (byte >> 6) as u32,
            cs_code: (byte & 0x3f) as u32,
        };

        Ok(StepOutcome::Continue)
    }

    fn step_header(&mut self, fmt: u32, cs_code: u32) -> Result<StepOutcome, ChunkStreamError> {
        let extra = CSID_EXTRA_SIZES[min(cs_code, 2) as usize];
        let head_size = extra + get_rtmp_header_size(fmt);

        if self.buf.len() < head_size {
            return Ok(StepOutcome::NeedMore);
        }

        let cs_id = match cs_code {
            0 => self.read_bytes(1)?[0] as u32 + 64,
            1 => LittleEndian::read_u16(&self.read_bytes(2)?) as u32 + 64,
            n => n,
        };

        let mut partial = PartialHeader {
            fmt,
            cs_id,
            ..Default::default()
        };

        if fmt == RTMP_CHUNK_TYPE_3 {
            if let Some(acc) = self.in_progress.get(&cs_id) {
                // a type-3 continuation chunk of an extended-timestamp
                // message may repeat the 4-byte extension; accept both
                // forms
                if acc.header.time >= EXTENDED_TIMESTAMP {
                    let expected = acc.header.time;
                    self.state = DemuxerState::NeedContinuationTime { cs_id, expected };
                    return Ok(StepOutcome::Continue);
                }
            } else if let Some(base) = self.last_headers.get(&cs_id) {
                // a type-3 chunk starting a new message after an
                // extended-timestamp header carries the full delta
                if base.time >= EXTENDED_TIMESTAMP {
                    self.state = DemuxerState::NeedExtendedTime { partial };
                    return Ok(StepOutcome::Continue);
                }
            }

            return self.begin_payload(partial);
        }

        if fmt == RTMP_CHUNK_TYPE_2 {
            let raw = self.read_bytes(3)?;
            partial.time = Some(read_u24(&raw));
        } else {
            let raw = self.read_bytes(7)?;
            partial.time = Some(read_u24(&raw[0..3]));
            partial.size = Some(read_u24(&raw[3..6]) as usize);
            partial.msg_type = Some(raw[6] as u32);

            if fmt == RTMP_CHUNK_TYPE_0 {
                let raw = self.read_bytes(4)?;
                partial.ms_id = Some(LittleEndian::read_u32(&raw));
            }
        }

        if partial.time == Some(EXTENDED_TIMESTAMP) {
            self.state = DemuxerState::NeedExtendedTime { partial };
            return Ok(StepOutcome::Continue);
        }

        self.begin_payload(partial)
    }

    fn step_extended_time(
        &mut self,
        mut partial: PartialHeader,
    ) -> Result<StepOutcome, ChunkStreamError> {
        if self.buf.len() < 4 {
            return Ok(StepOutcome::NeedMore);
        }

        let raw = self.read_bytes(4)?;
        partial.time = Some(BigEndian::read_u32(&raw));

        self.begin_payload(partial)
    }

    fn step_continuation_time(
        &mut self,
        cs_id: u32,
        expected: u32,
    ) -> Result<StepOutcome, ChunkStreamError> {
        if self.buf.len() < 4 {
            return Ok(StepOutcome::NeedMore);
        }

        let peeked = self.buf.peek(4).map_err(|e| {
            ChunkStreamError::Parse(format!("could not peek extended timestamp: {}", e))
        })?;

        if BigEndian::read_u32(&peeked) == expected {
            let _ = self.read_bytes(4)?;
        }

        self.begin_payload(PartialHeader {
            fmt: RTMP_CHUNK_TYPE_3,
            cs_id,
            ..Default::default()
        })
    }

    fn begin_payload(&mut self, partial: PartialHeader) -> Result<StepOutcome, ChunkStreamError> {
        let cs_id = partial.cs_id;

        if !self.in_progress.contains_key(&cs_id) {
            let header = if partial.ms_id.is_some() {
                match partial.into_absolute() {
                    Some(h) => h,
                    None => {
                        return Err(ChunkStreamError::Parse(
                            "incomplete absolute header".to_string(),
                        ))
                    }
                }
            } else if let Some(base) = self.last_headers.get(&cs_id) {
                absolutize(&partial, base)
            } else {
                // no cached base: a type-1 header can still stand
                // alone, its ms_id defaulting to 0
                match (partial.time, partial.size, partial.msg_type) {
                    (Some(time), Some(size), Some(msg_type)) => ChunkHeader {
                        cs_id,
                        time,
                        size,
                        msg_type,
                        ms_id: 0,
                        absolute: false,
                        abs_time: time,
                    },
                    _ => {
                        return Err(ChunkStreamError::Parse(format!(
                            "compressed header without a cached base on chunk stream {}",
                            cs_id
                        )))
                    }
                }
            };

            let to_read = header.size;

            self.in_progress.insert(
                cs_id,
                InProgressMessage {
                    header,
                    body: VecBuf::new(),
                    to_read,
                },
            );
        }

        self.state = DemuxerState::NeedPayload { cs_id };
        Ok(StepOutcome::Continue)
    }

    fn step_payload(&mut self, cs_id: u32) -> Result<StepOutcome, ChunkStreamError> {
        let chunk_size = self.chunk_size;

        let acc = self.in_progress.get_mut(&cs_id).ok_or_else(|| {
            ChunkStreamError::Parse(format!("no message in progress on chunk stream {}", cs_id))
        })?;

        let need = min(acc.to_read, chunk_size);

        if self.buf.len() < need {
            return Ok(StepOutcome::NeedMore);
        }

        if need > 0 {
            let segments = self
                .buf
                .read_seq(need)
                .map_err(|e| ChunkStreamError::Parse(format!("payload read failed: {}", e)))?;
            acc.body.write_seq(segments);
            acc.to_read -= need;
        }

        self.state = DemuxerState::NeedBasic;

        if acc.to_read > 0 {
            return Ok(StepOutcome::Continue);
        }

        let finished = match self.in_progress.remove(&cs_id) {
            Some(f) => f,
            None => return Ok(StepOutcome::Continue),
        };

        self.last_headers.insert(cs_id, finished.header.clone());

        let header = finished.header;
        let body = finished.body;

        if header.cs_id == RTMP_CHANNEL_PROTOCOL
            && header.msg_type > 0
            && header.msg_type < 8
            && header.ms_id == 0
        {
            return Ok(StepOutcome::Event(self.control_message(header, body)?));
        }

        Ok(StepOutcome::Event(DemuxedEvent::Message { header, body }))
    }

    fn control_message(
        &mut self,
        header: ChunkHeader,
        mut body: VecBuf,
    ) -> Result<DemuxedEvent, ChunkStreamError> {
        let verify = |expected: usize, got: usize| -> Result<(), ChunkStreamError> {
            if got != expected {
                return Err(ChunkStreamError::Parse(format!(
                    "expected control msg of size: {}, got: {}",
                    expected, got
                )));
            }
            Ok(())
        };

        match header.msg_type {
            RTMP_TYPE_SET_CHUNK_SIZE => {
                verify(4, body.len())?;
                let size = read_control_u32(&mut body)?;

                if size == 0 {
                    return Err(ChunkStreamError::Value(
                        "set chunk size: need positive chunk size".to_string(),
                    ));
                }

                self.chunk_size = size as usize;
                Ok(DemuxedEvent::SetChunkSize {
                    size: size as usize,
                })
            }
            RTMP_TYPE_ABORT => {
                verify(4, body.len())?;
                let cs_id = read_control_u32(&mut body)?;

                if let Some(dropped) = self.in_progress.remove(&cs_id) {
                    self.last_headers.insert(cs_id, dropped.header);
                }

                Ok(DemuxedEvent::AbortMessage { cs_id })
            }
            RTMP_TYPE_ACKNOWLEDGEMENT => {
                verify(4, body.len())?;
                Ok(DemuxedEvent::Acknowledgement {
                    sequence: read_control_u32(&mut body)?,
                })
            }
            RTMP_TYPE_EVENT => {
                if body.len() < 2 {
                    return Err(ChunkStreamError::Parse(format!(
                        "expected user control msg of size >= 2, got: {}",
                        body.len()
                    )));
                }

                let raw = body
                    .read(2)
                    .map_err(|e| ChunkStreamError::Parse(e.to_string()))?;
                let event_type = BigEndian::read_u16(&raw);

                let event = self.user_control_event(event_type, body)?;
                Ok(DemuxedEvent::UserControl { header, event })
            }
            RTMP_TYPE_WINDOW_ACKNOWLEDGEMENT_SIZE => {
                verify(4, body.len())?;
                Ok(DemuxedEvent::WindowSize {
                    window_size: read_control_u32(&mut body)?,
                })
            }
            RTMP_TYPE_SET_PEER_BANDWIDTH => {
                verify(5, body.len())?;
                let window_size = read_control_u32(&mut body)?;
                let limit_type = body
                    .read(1)
                    .map_err(|e| ChunkStreamError::Parse(e.to_string()))?[0];

                Ok(DemuxedEvent::SetPeerBandwidth {
                    window_size,
                    limit_type,
                })
            }
            _ => Ok(DemuxedEvent::ControlUnknown { header, body }),
        }
    }

    fn user_control_event(
        &mut self,
        event_type: u16,
        mut body: VecBuf,
    ) -> Result<UserControlEvent, ChunkStreamError> {
        let expected = match event_type {
            STREAM_BUFFER_LENGTH => 8,
            STREAM_BEGIN | STREAM_EOF | STREAM_DRY | STREAM_IS_RECORDED | STREAM_PING
            | STREAM_PONG => 4,
            _ => {
                return Ok(UserControlEvent::Unknown { event_type, body });
            }
        };

        if body.len() != expected {
            return Err(ChunkStreamError::Parse(format!(
                "expected user ctrl msg of size: {}, got: {}",
                expected,
                body.len()
            )));
        }

        let first = read_control_u32(&mut body)?;

        Ok(match event_type {
            STREAM_BEGIN => UserControlEvent::StreamBegin { stream_id: first },
            STREAM_EOF => UserControlEvent::StreamEof { stream_id: first },
            STREAM_DRY => UserControlEvent::StreamDry { stream_id: first },
            STREAM_BUFFER_LENGTH => UserControlEvent::SetBufferLength {
                stream_id: first,
                length: read_control_u32(&mut body)?,
            },
            STREAM_IS_RECORDED => UserControlEvent::StreamIsRecorded { stream_id: first },
            STREAM_PING => UserControlEvent::Ping { timestamp: first },
            _ => UserControlEvent::Pong { timestamp: first },
        })
    }

    fn read_bytes(&mut self, n: usize) -> Result<bytes::Bytes, ChunkStreamError> {
        self.buf
            .read(n)
            .map_err(|e| ChunkStreamError::Parse(format!("short read: {}", e)))
    }
}

fn read_u24(raw: &[u8]) -> u32 {
    ((raw[0] as u32) << 16) | ((raw[1] as u32) << 8) | (raw[2] as u32)
}

fn read_control_u32(body: &mut VecBuf) -> Result<u32, ChunkStreamError> {
    let raw = body
        .read(4)
        .map_err(|e| ChunkStreamError::Parse(e.to_string()))?;
    Ok(BigEndian::read_u32(&raw))
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(demuxer: &mut Demuxer, hex_data: &str) -> Vec<DemuxedEvent> {
        let data = hex::decode(hex_data).unwrap();
        demuxer.data_received(&data).unwrap()
    }

    fn only_message(events: Vec<DemuxedEvent>) -> (ChunkHeader, VecBuf) {
        assert_eq!(events.len(), 1);
        match events.into_iter().next().unwrap() {
            DemuxedEvent::Message { header, body } => (header, body),
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_set_chunk_size_roundtrip() {
        let mut demuxer = Demuxer::new();

        let events = feed(&mut demuxer, "02000000000004010000000000000020");

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            DemuxedEvent::SetChunkSize { size: 32 }
        ));
        assert_eq!(demuxer.chunk_size(), 32);
    }

    #[test]
    fn test_chunk_size_zero_is_rejected() {
        let mut demuxer = Demuxer::new();

        let data = hex::decode("02000000000004010000000000000000").unwrap();
        let result = demuxer.data_received(&data);

        assert!(matches!(result, Err(ChunkStreamError::Value(_))));
    }

    #[test]
    fn test_fragmented_audio_message() {
        let mut demuxer = Demuxer::new();

        // switch to chunk size 32 first
        feed(&mut demuxer, "02000000000004010000000000000020");

        let mut data = hex::decode("4600000000004308").unwrap();
        data.extend(std::iter::repeat(0x01).take(32));
        data.push(0xc6);
        data.extend(std::iter::repeat(0x02).take(32));
        data.push(0xc6);
        data.extend(std::iter::repeat(0x03).take(3));

        let events = demuxer.data_received(&data).unwrap();
        let (header, body) = only_message(events);

        assert_eq!(header.cs_id, 6);
        assert_eq!(header.abs_time, 0);
        assert_eq!(header.msg_type, 8);
        assert_eq!(header.ms_id, 0);
        assert_eq!(header.size, 67);

        let mut expected = vec![0x01u8; 32];
        expected.extend(vec![0x02; 32]);
        expected.extend(vec![0x03; 3]);
        assert_eq!(body.to_vec(), expected);
    }

    #[test]
    fn test_extended_timestamp() {
        let mut demuxer = Demuxer::new();

        let events = feed(&mut demuxer, "07ffffff0000000890bd000001000000");
        let (header, body) = only_message(events);

        assert_eq!(header.cs_id, 7);
        assert_eq!(header.abs_time, 0x01000000);
        assert_eq!(header.size, 0);
        assert_eq!(header.msg_type, 8);
        assert_eq!(header.ms_id, 48528);
        assert!(body.is_empty());
    }

    #[test]
    fn test_header_compression_chain() {
        let mut demuxer = Demuxer::new();

        // full header: cs 3, time 10, size 2, type 8, ms_id 1
        let events = feed(&mut demuxer, "0300000a0000020801000000");
        assert!(events.is_empty());
        let events = feed(&mut demuxer, "abab");
        let (header, _) = only_message(events);
        assert_eq!(header.abs_time, 10);

        // type 2: delta 20
        let events = feed(&mut demuxer, "83000014abab");
        let (header, _) = only_message(events);
        assert_eq!(header.abs_time, 30);
        assert_eq!(header.size, 2);
        assert_eq!(header.msg_type, 8);
        assert_eq!(header.ms_id, 1);

        // type 3: inherits the delta too
        let events = feed(&mut demuxer, "c3abab");
        let (header, _) = only_message(events);
        assert_eq!(header.abs_time, 50);
    }

    #[test]
    fn test_chunking_invariance() {
        // the same byte stream, fed in different patterns, must
        // produce the same messages
        let mut stream = hex::decode("0300000a0000430801000000").unwrap();
        stream.extend(vec![0x11u8; 67]);
        stream.push(0xc3);
        stream.extend(vec![0x22u8; 67]);

        let windows: [usize; 4] = [stream.len(), 1, 4, 7];

        let mut all_results: Vec<Vec<(u32, u32, Vec<u8>)>> = Vec::new();

        for window in windows {
            let mut demuxer = Demuxer::new();
            let mut results = Vec::new();

            for piece in stream.chunks(window) {
                for event in demuxer.data_received(piece).unwrap() {
                    if let DemuxedEvent::Message { header, body } = event {
                        results.push((header.cs_id, header.abs_time, body.to_vec()));
                    }
                }
            }

            all_results.push(results);
        }

        for results in &all_results[1..] {
            assert_eq!(results, &all_results[0]);
        }

        assert_eq!(all_results[0].len(), 2);
        assert_eq!(all_results[0][0].2, vec![0x11u8; 67]);
        assert_eq!(all_results[0][1].2, vec![0x22u8; 67]);
    }

    #[test]
    fn test_interleaved_chunk_streams() {
        let mut demuxer = Demuxer::new();

        // two messages interleaved on cs 3 and cs 4, 130 bytes each
        let mut data = hex::decode("030000000000820801000000").unwrap();
        data.extend(vec![0xaa; 128]);
        data.extend(hex::decode("040000000000820902000000").unwrap());
        data.extend(vec![0xbb; 128]);
        data.push(0xc3);
        data.extend(vec![0xaa; 2]);
        data.push(0xc4);
        data.extend(vec![0xbb; 2]);

        let mut messages = Vec::new();
        for event in demuxer.data_received(&data).unwrap() {
            if let DemuxedEvent::Message { header, body } = event {
                messages.push((header.cs_id, header.msg_type, body.to_vec().len()));
            }
        }

        assert_eq!(messages, vec![(3, 8, 130), (4, 9, 130)]);
    }

    #[test]
    fn test_abort_message() {
        let mut demuxer = Demuxer::new();

        // start a 130-byte message on cs 3, deliver only 128 bytes
        let mut data = hex::decode("030000000000820801000000").unwrap();
        data.extend(vec![0xaa; 128]);
        assert!(demuxer.data_received(&data).unwrap().is_empty());

        // abort cs 3
        let events = feed(&mut demuxer, "02000000000004020000000000000003");
        assert!(matches!(
            events[0],
            DemuxedEvent::AbortMessage { cs_id: 3 }
        ));

        // a fresh absolute message on cs 3 parses normally
        let mut data = hex::decode("030000000000020801000000").unwrap();
        data.extend([0x01, 0x02]);
        let events = demuxer.data_received(&data).unwrap();
        let (header, body) = only_message(events);
        assert_eq!(header.size, 2);
        assert_eq!(body.to_vec(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_user_control_events() {
        let mut demuxer = Demuxer::new();

        // stream begin, stream id 1
        let events = feed(&mut demuxer, "020000000000060400000000000000000001");
        match &events[0] {
            DemuxedEvent::UserControl { event, .. } => {
                assert_eq!(event, &UserControlEvent::StreamBegin { stream_id: 1 });
            }
            other => panic!("unexpected event {:?}", other),
        }

        // set buffer length, stream 1, 3000ms
        let events = feed(
            &mut demuxer,
            "0200000000000a040000000000030000000100000bb8",
        );
        match &events[0] {
            DemuxedEvent::UserControl { event, .. } => {
                assert_eq!(
                    event,
                    &UserControlEvent::SetBufferLength {
                        stream_id: 1,
                        length: 3000
                    }
                );
            }
            other => panic!("unexpected event {:?}", other),
        }

        // ping with timestamp 7
        let events = feed(&mut demuxer, "020000000000060400000000000600000007");
        match &events[0] {
            DemuxedEvent::UserControl { event, .. } => {
                assert_eq!(event, &UserControlEvent::Ping { timestamp: 7 });
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_control_size_validation() {
        let mut demuxer = Demuxer::new();

        // ack with a 3-byte body
        let data = hex::decode("0200000000000303000000000000b0").unwrap();
        assert!(matches!(
            demuxer.data_received(&data),
            Err(ChunkStreamError::Parse(_))
        ));
    }

    #[test]
    fn test_compressed_header_without_base_fails() {
        let mut demuxer = Demuxer::new();

        // type-2 header on a chunk stream that was never seen
        let data = hex::decode("85000014").unwrap();
        assert!(matches!(
            demuxer.data_received(&data),
            Err(ChunkStreamError::Parse(_))
        ));
    }

    #[test]
    fn test_extended_timestamp_on_continuation() {
        let mut demuxer = Demuxer::new();

        // 130-byte message with extended timestamp; the continuation
        // chunk repeats the extension
        let mut data = hex::decode("03ffffff0000820801000000").unwrap();
        data.extend(hex::decode("01000000").unwrap());
        data.extend(vec![0x55; 128]);
        data.push(0xc3);
        data.extend(hex::decode("01000000").unwrap());
        data.extend(vec![0x55; 2]);

        let events = demuxer.data_received(&data).unwrap();
        let (header, body) = only_message(events);

        assert_eq!(header.abs_time, 0x01000000);
        assert_eq!(body.to_vec(), vec![0x55; 130]);
    }
}
