// Recorder controller

use std::collections::HashMap;

use crate::amf::{AMF0Object, AMF0Value};
use crate::chunks::{RTMP_TYPE_AUDIO, RTMP_TYPE_VIDEO};
use crate::proto::{CallError, CallResultError};
use crate::server::NetStream;
use crate::store::{MediaStream, StreamGroup, FF_INTERFRAME, FF_KEYFRAME};
use crate::vecbuf::VecBuf;

use super::{DefaultCachePolicy, TYPE_AUDIO, TYPE_VIDEO};

// FLV tag first-byte fields
const VF_H264: u8 = 7;
const AF_AAC: u8 = 10;

const FT_VIDEO_KEYFRAME: u8 = 1;

const FT_H264_HEADER: u8 = 0;
const FT_AAC_HEADER: u8 = 0;

/// Feeds a published NetStream into a stored stream group
///
/// Creates one group stream per media type on first data, applies the
/// cache policy, and separates codec sequence headers from data
/// frames by looking at the FLV tag head.
pub struct Recorder {
    group: StreamGroup,
    nstream: NetStream,

    tracks: HashMap<u32, MediaStream>,

    stream_meta: Option<AMF0Object>,
    audio_headers: u32,

    cache_policy: DefaultCachePolicy,
}

impl Recorder {
    pub fn new(group: StreamGroup, nstream: NetStream) -> Recorder {
        Recorder {
            group,
            nstream,
            tracks: HashMap::new(),
            stream_meta: None,
            audio_headers: 0,
            cache_policy: DefaultCachePolicy::default(),
        }
    }

    /// Announces the publish to the peer
    pub fn start(&mut self) -> Result<(), CallError> {
        self.nstream
            .signal(
                "onStatus",
                &[
                    AMF0Value::Null,
                    AMF0Value::object(
                        AMF0Object::new()
                            .with("code", AMF0Value::string("NetStream.Publish.Start"))
                            .with("level", AMF0Value::string("status"))
                            .with("description", AMF0Value::string("published")),
                    ),
                ],
            )
            .map_err(|e| CallError::Result(CallResultError::failed(e.to_string())))?;

        Ok(())
    }

    pub fn stop(&mut self) {
        self.stream_meta = None;
    }

    /// The stream group this recorder writes into
    pub fn group(&self) -> StreamGroup {
        self.group.clone()
    }

    /// Handles a metadata message from the publisher
    pub fn on_meta(&mut self, _ts: u32, args: &[AMF0Value]) {
        let meta = if args.len() > 2
            && args[0].get_string() == "@setDataFrame"
            && args[1].get_string() == "onMetaData"
        {
            args[2].get_object()
        } else if args.len() > 1 && args[0].get_string() == "onMetaData" {
            args[1].get_object()
        } else {
            None
        };

        if let Some(meta) = meta {
            self.stream_meta = Some(meta.clone());
            self.group.set_meta(meta.clone());
        }
    }

    /// Handles a media payload from the publisher
    pub fn on_data(&mut self, ts: u32, msg_type: u32, data: VecBuf) {
        let stream = match self.tracks.get(&msg_type) {
            Some(stream) => stream.clone(),
            None => match self.make_stream(msg_type) {
                Some(stream) => stream,
                None => return,
            },
        };

        let mut flags = 0;

        if msg_type == RTMP_TYPE_VIDEO {
            let head = data.peek(2.min(data.len())).unwrap_or_default();

            let (frame_type, codec_id) = match head.first() {
                Some(b) => (Some(b >> 4), Some(b & 0x0f)),
                None => (None, None),
            };
            let h264_type = head.get(1).copied();

            if frame_type == Some(FT_VIDEO_KEYFRAME)
                && codec_id == Some(VF_H264)
                && h264_type == Some(FT_H264_HEADER)
            {
                // AVC sequence header
                stream.write_headers(data, 0, 0);
                return;
            }

            if let Some(frame_type) = frame_type {
                flags = if frame_type == FT_VIDEO_KEYFRAME {
                    FF_KEYFRAME
                } else {
                    FF_INTERFRAME
                };
            }
        } else if msg_type == RTMP_TYPE_AUDIO {
            let head = data.peek(2.min(data.len())).unwrap_or_default();

            let codec_id = head.first().map(|b| b >> 4);
            let aac_type = head.get(1).copied();

            if codec_id == Some(AF_AAC) && aac_type == Some(FT_AAC_HEADER) {
                // AAC sequence header
                self.audio_headers += 1;
                stream.write_headers(data, 0, 0);
                return;
            }

            if codec_id.is_some() && codec_id != Some(AF_AAC) && self.audio_headers == 0 {
                // flash doesn't use real headers for those formats;
                // mark that there is an audio track with an empty
                // packet early on
                self.audio_headers += 1;
                let marker = data.peek(1).unwrap_or_default();
                stream.write_headers(VecBuf::from(marker), 0, 0);
            }

            if codec_id.is_some() {
                // audio usually is all keyframes
                flags = FF_KEYFRAME;
            }
        } else {
            return;
        }

        stream.write(ts, flags, data);
    }

    fn make_stream(&mut self, msg_type: u32) -> Option<MediaStream> {
        let type_name = match msg_type {
            RTMP_TYPE_VIDEO => TYPE_VIDEO,
            RTMP_TYPE_AUDIO => TYPE_AUDIO,
            _ => return None,
        };

        let stream = self.group.make_stream();

        let mut params = HashMap::new();
        params.insert("type".to_string(), type_name.to_string());
        stream.set_params(params);

        self.tracks.insert(msg_type, stream.clone());

        // recompute caching over all known tracks
        let track_types: Vec<u32> = self.tracks.keys().copied().collect();
        let cache_params = self
            .cache_policy
            .select(self.stream_meta.as_ref(), &track_types);

        for (track_type, p) in track_types.iter().zip(cache_params.iter()) {
            if let Some(track) = self.tracks.get(track_type) {
                track.set_buffering(p.grpos_range, p.frames, p.flag_mask);
            }
        }

        Some(stream)
    }
}

// Tests
