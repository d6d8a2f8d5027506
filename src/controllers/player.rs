// Player controller

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::amf::{AMF0Object, AMF0Value};
use crate::chunks::{RTMP_TYPE_AUDIO, RTMP_TYPE_DATA, RTMP_TYPE_VIDEO};
use crate::proto::{CallError, CallResultError};
use crate::server::NetStream;
use crate::store::{MediaStream, StreamGroup, Subscription};

use super::{BufferingWriter, DefaultBurstPolicy, TYPE_AUDIO, TYPE_VIDEO};

/// Chunk size raised before media starts flowing
const PLAYBACK_CHUNK_SIZE: usize = 4096;

/// Feeds a stored stream group into a NetStream
///
/// `start` scans the group for one audio and one video track, sends
/// the play status sequence, the stored metadata and header frames,
/// then subscribes with the burst policy's preroll.
pub struct Player {
    group: StreamGroup,
    nstream: NetStream,

    tracks: Vec<(MediaStream, u32)>,
    subscription: Vec<(MediaStream, Subscription)>,
    writer: Option<Arc<Mutex<BufferingWriter>>>,

    send_audio: bool,
    send_video: bool,

    stream_meta: Option<AMF0Object>,

    burst_policy: DefaultBurstPolicy,
}

impl Player {
    pub fn new(group: StreamGroup, nstream: NetStream) -> Player {
        Player {
            group,
            nstream,
            tracks: Vec::new(),
            subscription: Vec::new(),
            writer: None,
            send_audio: true,
            send_video: true,
            stream_meta: None,
            burst_policy: DefaultBurstPolicy::default(),
        }
    }

    /// Starts playback towards the NetStream
    pub fn start(&mut self) -> Result<(), CallError> {
        self.scan_tracks();
        self.send_status()?;
        self.send_meta()?;
        self.add_headers();
        self.subscribe()?;
        Ok(())
    }

    /// Stops forwarding and releases the subscriptions
    pub fn stop(&mut self) {
        for (stream, subscription) in self.subscription.drain(..) {
            stream.unsubscribe(subscription);
        }

        self.writer = None;
    }

    /// Applies a receiveAudio / receiveVideo request
    pub fn on_mute(&mut self, msg_type: u32, do_send: bool) {
        if msg_type == RTMP_TYPE_AUDIO {
            self.send_audio = do_send;
        } else {
            self.send_video = do_send;
        }
    }

    fn scan_tracks(&mut self) {
        // selecting *some* of the matching tracks
        for (type_name, msg_type) in [(TYPE_AUDIO, RTMP_TYPE_AUDIO), (TYPE_VIDEO, RTMP_TYPE_VIDEO)]
        {
            let mut template = HashMap::new();
            template.insert("type".to_string(), type_name.to_string());

            if let Some(stream) = self.group.streams_by_params(&template).into_iter().next() {
                self.tracks.push((stream, msg_type));
            }
        }
    }

    fn send_status(&mut self) -> Result<(), CallError> {
        self.nstream
            .signal(
                "onStatus",
                &[
                    AMF0Value::Null,
                    AMF0Value::object(
                        AMF0Object::new()
                            .with("code", AMF0Value::string("NetStream.Play.Reset"))
                            .with("level", AMF0Value::string("status"))
                            .with("description", AMF0Value::string("reset")),
                    ),
                ],
            )
            .map_err(|e| CallResultError::play_failed(e.to_string()))?;

        self.nstream.ctrl_stream_begin();

        self.nstream
            .signal(
                "onStatus",
                &[
                    AMF0Value::Null,
                    AMF0Value::object(
                        AMF0Object::new()
                            .with("code", AMF0Value::string("NetStream.Play.Start"))
                            .with("level", AMF0Value::string("status"))
                            .with("description", AMF0Value::string("started")),
                    ),
                ],
            )
            .map_err(|e| CallResultError::play_failed(e.to_string()))?;

        // increase the chunk size, we're gonna send some data
        self.nstream.set_chunk_size(PLAYBACK_CHUNK_SIZE);

        Ok(())
    }

    fn send_meta(&mut self) -> Result<(), CallError> {
        let meta = self.group.meta();

        if meta.is_empty() {
            return Ok(());
        }

        self.stream_meta = Some(meta.clone());

        self.nstream
            .send_amf(
                0,
                RTMP_TYPE_DATA,
                &[
                    AMF0Value::string("onStatus"),
                    AMF0Value::object(
                        AMF0Object::new()
                            .with("code", AMF0Value::string("NetStream.Data.Start")),
                    ),
                ],
            )
            .map_err(|e| CallResultError::play_failed(e.to_string()))?;

        self.nstream
            .send_amf(
                0,
                RTMP_TYPE_DATA,
                &[
                    AMF0Value::string("onMetaData"),
                    AMF0Value::object(meta),
                ],
            )
            .map_err(|e| CallResultError::play_failed(e.to_string()))?;

        Ok(())
    }

    fn add_headers(&mut self) {
        for (stream, msg_type) in self.tracks.iter() {
            let nstream = self.nstream.clone();
            let msg_type = *msg_type;

            stream.read_headers(move |_grpos, _flags, data| {
                nstream.send(0, msg_type, data);
            });
        }
    }

    fn subscribe(&mut self) -> Result<(), CallError> {
        let track_types: Vec<u32> = self.tracks.iter().map(|(_, t)| *t).collect();

        let params = self.burst_policy.select(
            self.stream_meta.as_ref(),
            &track_types,
            self.nstream.buffer_length(),
        );

        let writer = Arc::new(Mutex::new(BufferingWriter::new(
            self.nstream.clone(),
            &track_types,
            false,
            false,
        )));

        writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .begin_preroll();

        let mut subscriptions = Vec::with_capacity(self.tracks.len());

        for ((stream, msg_type), p) in self.tracks.iter().zip(params.iter()) {
            let writer_cb = writer.clone();
            let msg_type = *msg_type;

            let subscription = stream
                .subscribe(
                    Box::new(move |grpos, flags, data| {
                        writer_cb
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .write(msg_type, grpos, flags, data);
                    }),
                    p.grpos_range,
                    p.frames,
                    None,
                    p.flag_mask,
                )
                .map_err(|e| CallResultError::play_failed(e.to_string()))?;

            subscriptions.push((stream.clone(), subscription));
        }

        self.subscription = subscriptions;

        writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .preroll_done();

        self.writer = Some(writer);

        Ok(())
    }
}
