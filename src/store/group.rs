// Stream groups

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::amf::AMF0Object;
use crate::vecbuf::VecBuf;

use super::stream::StreamCore;
use super::{MediaStream, StoreError, Subscription};

/// Shared callback for group subscriptions; the extra u32 is the
/// per-stream tag supplied at subscribe time (commonly a message
/// type)
pub type GroupFrameCallback = Arc<Mutex<dyn FnMut(u32, u32, VecBuf, u32) + Send>>;

/// A group-wide subscription: one per-member subscription each
pub struct GroupSubscription {
    subs: Vec<(MediaStream, Subscription)>,
}

struct GroupCore {
    name: String,
    namespace: Option<String>,
    meta: AMF0Object,
    streams: Vec<Arc<Mutex<StreamCore>>>,
    live: bool,
}

/// Ordered set of media streams sharing a playback clock
#[derive(Clone)]
pub struct StreamGroup {
    inner: Arc<Mutex<GroupCore>>,
}

impl StreamGroup {
    pub(crate) fn new(name: &str, namespace: Option<&str>, live: bool) -> StreamGroup {
        StreamGroup {
            inner: Arc::new(Mutex::new(GroupCore {
                name: name.to_string(),
                namespace: namespace.map(|s| s.to_string()),
                meta: AMF0Object::new(),
                streams: Vec::new(),
                live,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GroupCore> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stream group name within its namespace
    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    /// Namespace the group lives in
    pub fn namespace(&self) -> Option<String> {
        self.lock().namespace.clone()
    }

    /// True for groups opened for live publishing
    pub fn is_live(&self) -> bool {
        self.lock().live
    }

    /// Two handles to the same group
    pub fn same_group(&self, other: &StreamGroup) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Group metadata
    pub fn meta(&self) -> AMF0Object {
        self.lock().meta.clone()
    }

    pub fn set_meta(&self, meta: AMF0Object) {
        self.lock().meta = meta;
    }

    /// Fresh handles to all member streams
    pub fn streams(&self) -> Vec<MediaStream> {
        self.lock()
            .streams
            .iter()
            .map(|core| MediaStream::new(core.clone()))
            .collect()
    }

    /// Member streams whose params contain every template entry
    pub fn streams_by_params(&self, template: &HashMap<String, String>) -> Vec<MediaStream> {
        self.streams()
            .into_iter()
            .filter(|stream| {
                let params = stream.params();
                template
                    .iter()
                    .all(|(key, value)| params.get(key) == Some(value))
            })
            .collect()
    }

    /// Creates a new member stream
    pub fn make_stream(&self) -> MediaStream {
        let mut core = self.lock();

        let stream_core = Arc::new(Mutex::new(StreamCore::new(core.live)));
        core.streams.push(stream_core.clone());

        MediaStream::new(stream_core)
    }

    /// Subscribes to every member stream with the chosen preroll
    ///
    /// `tags` supplies the per-stream extra argument appended to each
    /// callback invocation, aligned with `streams()`. With
    /// `preroll_from_frames` given (aligned frame indices), the
    /// explicit-frame preroll is used instead of the grpos range.
    /// Each member's preroll is emitted separately, not interleaved.
    pub fn subscribe(
        &self,
        callback: GroupFrameCallback,
        preroll_grpos_range: u32,
        preroll_from_frames: Option<&[u64]>,
        tags: &[u32],
    ) -> Result<GroupSubscription, StoreError> {
        let streams = self.streams();

        let mut subs = Vec::with_capacity(streams.len());

        for (i, stream) in streams.into_iter().enumerate() {
            let tag = tags.get(i).copied().unwrap_or(0);
            let cb = callback.clone();

            let wrapped: super::FrameCallback = Box::new(move |grpos, flags, data| {
                let mut cb = cb.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                (*cb)(grpos, flags, data, tag);
            });

            let subscription = match preroll_from_frames {
                Some(frames) => {
                    let from_frame = frames.get(i).copied();
                    stream.subscribe(wrapped, 0, 0, from_frame, 0)?
                }
                None => stream.subscribe(wrapped, preroll_grpos_range, 0, None, 0)?,
            };

            subs.push((stream, subscription));
        }

        Ok(GroupSubscription { subs })
    }

    /// Removes a group-wide subscription
    pub fn unsubscribe(&self, subscription: GroupSubscription) {
        for (stream, sub) in subscription.subs {
            stream.unsubscribe(sub);
        }
    }
}

// Tests
