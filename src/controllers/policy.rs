// Preroll and cache policies

use crate::amf::AMF0Object;
use crate::chunks::RTMP_TYPE_VIDEO;

/// Buffering bounds: one of grpos range / frame count, plus an
/// optional anchor mask
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BufferParams {
    pub grpos_range: u32,
    pub frames: usize,
    pub flag_mask: i32,
}

fn is_h264(meta: Option<&AMF0Object>) -> bool {
    meta.and_then(|m| m.get("videocodecid"))
        .map(|v| v.get_string() == "avc1")
        .unwrap_or(false)
}

/// Chooses how much stored data a new subscriber gets replayed
///
/// H.264 prerolls a fixed number of video frames (the headers carry
/// the decoding state, time-based windows would cut into a group of
/// pictures); anything else prerolls a grpos range bounded by the
/// subscriber's buffer length.
pub struct DefaultBurstPolicy {
    pub max_grpos_range: u32,
    pub h264_frames: usize,
}

impl Default for DefaultBurstPolicy {
    fn default() -> DefaultBurstPolicy {
        DefaultBurstPolicy {
            max_grpos_range: 3000,
            h264_frames: 64,
        }
    }
}

impl DefaultBurstPolicy {
    /// Per-track subscribe params, aligned with `track_types`
    pub fn select(
        &self,
        meta: Option<&AMF0Object>,
        track_types: &[u32],
        buffer_length: u32,
    ) -> Vec<BufferParams> {
        if is_h264(meta) {
            track_types
                .iter()
                .map(|t| {
                    if *t == RTMP_TYPE_VIDEO {
                        BufferParams {
                            frames: self.h264_frames,
                            ..Default::default()
                        }
                    } else {
                        BufferParams::default()
                    }
                })
                .collect()
        } else {
            let grpos_range = buffer_length.min(self.max_grpos_range);

            track_types
                .iter()
                .map(|_| BufferParams {
                    grpos_range,
                    ..Default::default()
                })
                .collect()
        }
    }
}

/// Chooses how much a live stream retains for preroll
pub struct DefaultCachePolicy {
    pub grpos_range: u32,
    pub h264_frames: usize,
}

impl Default for DefaultCachePolicy {
    fn default() -> DefaultCachePolicy {
        DefaultCachePolicy {
            grpos_range: 3000,
            h264_frames: 64,
        }
    }
}

impl DefaultCachePolicy {
    /// Per-track buffering params, aligned with `track_types`
    pub fn select(&self, meta: Option<&AMF0Object>, track_types: &[u32]) -> Vec<BufferParams> {
        if is_h264(meta) {
            track_types
                .iter()
                .map(|t| {
                    if *t == RTMP_TYPE_VIDEO {
                        BufferParams {
                            frames: self.h264_frames,
                            ..Default::default()
                        }
                    } else {
                        BufferParams::default()
                    }
                })
                .collect()
        } else {
            track_types
                .iter()
                .map(|_| BufferParams {
                    grpos_range: self.grpos_range,
                    ..Default::default()
                })
                .collect()
        }
    }
}

// Tests
