// Per-session message streams

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use byteorder::{BigEndian, ByteOrder};

use crate::amf::{encode, AMF0EncodeError, AMF0Value};
use crate::chunks::{
    Muxer, RTMP_TYPE_EVENT, RTMP_TYPE_INVOKE, RTMP_TYPE_SET_CHUNK_SIZE, STREAM_BEGIN,
    STREAM_IS_RECORDED,
};
use crate::vecbuf::VecBuf;

/// Client-reported buffer length default, in milliseconds
pub const DEFAULT_BUFFER_LENGTH: u32 = 100;

struct NetStreamInner {
    id: u32,
    muxer: Arc<Mutex<Muxer>>,
    buffer_length: AtomicU32,
}

/// A message stream within one session
///
/// Cheap to clone; all clones address the same stream id and muxer.
#[derive(Clone)]
pub struct NetStream {
    inner: Arc<NetStreamInner>,
}

impl NetStream {
    pub fn new(muxer: Arc<Mutex<Muxer>>, id: u32) -> NetStream {
        NetStream {
            inner: Arc::new(NetStreamInner {
                id,
                muxer,
                buffer_length: AtomicU32::new(DEFAULT_BUFFER_LENGTH),
            }),
        }
    }

    fn muxer(&self) -> MutexGuard<'_, Muxer> {
        self.inner
            .muxer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Message stream id
    pub fn id(&self) -> u32 {
        self.inner.id
    }

    /// Buffer length the client reported, in milliseconds
    pub fn buffer_length(&self) -> u32 {
        self.inner.buffer_length.load(Ordering::Relaxed)
    }

    pub fn set_buffer_length(&self, length: u32) {
        self.inner.buffer_length.store(length, Ordering::Relaxed);
    }

    /// Sends a message on this stream
    pub fn send(&self, ts: u32, msg_type: u32, body: VecBuf) {
        self.muxer().send_message(ts, msg_type, self.inner.id, body, false);
    }

    /// AMF-encodes the values and sends them on this stream
    pub fn send_amf(
        &self,
        ts: u32,
        msg_type: u32,
        values: &[AMF0Value],
    ) -> Result<(), AMF0EncodeError> {
        let body = encode(values)?;
        self.send(ts, msg_type, body);
        Ok(())
    }

    /// Sends a command without expecting a reply (transaction id 0)
    pub fn signal(&self, cmd: &str, args: &[AMF0Value]) -> Result<(), AMF0EncodeError> {
        let mut values = vec![AMF0Value::string(cmd), AMF0Value::number(0.0)];
        values.extend_from_slice(args);

        self.send_amf(0, RTMP_TYPE_INVOKE, &values)
    }

    fn send_user_control(&self, event_type: u16, stream_id: u32) {
        let mut body = [0u8; 6];
        BigEndian::write_u16(&mut body[0..2], event_type);
        BigEndian::write_u32(&mut body[2..6], stream_id);

        self.muxer()
            .send_message(0, RTMP_TYPE_EVENT, 0, VecBuf::from(body.to_vec()), false);
    }

    /// Announces this stream with a StreamBegin user-control event
    pub fn ctrl_stream_begin(&self) {
        self.send_user_control(STREAM_BEGIN, self.inner.id);
    }

    /// Marks this stream as recorded
    pub fn ctrl_stream_recorded(&self) {
        self.send_user_control(STREAM_IS_RECORDED, self.inner.id);
    }

    /// Announces and applies a new outgoing chunk size
    pub fn set_chunk_size(&self, new_size: usize) {
        let mut body = [0u8; 4];
        BigEndian::write_u32(&mut body, new_size as u32);

        let mut muxer = self.muxer();
        muxer.send_message(
            0,
            RTMP_TYPE_SET_CHUNK_SIZE,
            0,
            VecBuf::from(body.to_vec()),
            false,
        );
        muxer.set_chunk_size(new_size);
    }
}

/// Allocates and tracks the session's message streams
#[derive(Default)]
pub struct NetStreamManager {
    streams: HashMap<u32, NetStream>,
    next_id: u32,
}

impl NetStreamManager {
    pub fn new() -> NetStreamManager {
        NetStreamManager {
            streams: HashMap::new(),
            next_id: 1,
        }
    }

    /// Creates the next message stream
    pub fn make_stream(&mut self, muxer: &Arc<Mutex<Muxer>>) -> NetStream {
        let id = self.next_id;
        self.next_id += 1;

        let stream = NetStream::new(muxer.clone(), id);
        self.streams.insert(id, stream.clone());
        stream
    }

    pub fn del_stream(&mut self, ms_id: u32) {
        self.streams.remove(&ms_id);
    }

    pub fn get_stream(&self, ms_id: u32) -> Option<NetStream> {
        self.streams.get(&ms_id).cloned()
    }

    pub fn streams(&self) -> Vec<NetStream> {
        self.streams.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{DemuxedEvent, Demuxer, SimpleChunkProducer};
    use bytes::Bytes;
    use tokio::sync::mpsc;

    fn make_muxer() -> (Arc<Mutex<Muxer>>, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Mutex::new(Muxer::new(Box::new(SimpleChunkProducer::new(
                tx,
            ))))),
            rx,
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(piece) = rx.try_recv() {
            out.extend_from_slice(&piece);
        }
        out
    }

    #[test]
    fn test_manager_allocates_monotonic_ids() {
        let (muxer, _rx) = make_muxer();
        let mut manager = NetStreamManager::new();

        let a = manager.make_stream(&muxer);
        let b = manager.make_stream(&muxer);

        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);

        assert!(manager.get_stream(1).is_some());
        manager.del_stream(1);
        assert!(manager.get_stream(1).is_none());
        assert!(manager.get_stream(2).is_some());
    }

    #[test]
    fn test_signal_sends_command_with_zero_transaction() {
        let (muxer, mut rx) = make_muxer();
        let stream = NetStream::new(muxer, 1);

        stream
            .signal("onStatus", &[AMF0Value::Null])
            .unwrap();

        let wire = drain(&mut rx);
        let mut demuxer = Demuxer::new();

        let events = demuxer.data_received(&wire).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            DemuxedEvent::Message { header, body } => {
                assert_eq!(header.msg_type, RTMP_TYPE_INVOKE);
                assert_eq!(header.ms_id, 1);

                let mut body = body.clone();
                let args = crate::amf::decode(&mut body).unwrap();
                assert_eq!(args[0], AMF0Value::string("onStatus"));
                assert_eq!(args[1], AMF0Value::number(0.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_ctrl_stream_begin() {
        let (muxer, mut rx) = make_muxer();
        let stream = NetStream::new(muxer, 3);

        stream.ctrl_stream_begin();

        let wire = drain(&mut rx);
        let mut demuxer = Demuxer::new();

        let events = demuxer.data_received(&wire).unwrap();

        match &events[0] {
            DemuxedEvent::UserControl { event, .. } => {
                assert_eq!(
                    event,
                    &crate::chunks::UserControlEvent::StreamBegin { stream_id: 3 }
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_set_chunk_size_announces_then_applies() {
        let (muxer, mut rx) = make_muxer();
        let stream = NetStream::new(muxer.clone(), 1);

        stream.set_chunk_size(4096);
        stream.send(0, crate::chunks::RTMP_TYPE_VIDEO, VecBuf::from(vec![0u8; 600]));

        let wire = drain(&mut rx);
        let mut demuxer = Demuxer::new();
        let events = demuxer.data_received(&wire).unwrap();

        // the announcement parses first, then the 600-byte body
        // arrives unfragmented under the new chunk size
        assert!(matches!(events[0], DemuxedEvent::SetChunkSize { size: 4096 }));
        match &events[1] {
            DemuxedEvent::Message { body, .. } => assert_eq!(body.len(), 600),
            other => panic!("unexpected {:?}", other),
        }
    }
}
