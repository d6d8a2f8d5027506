// Stored media streams

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::amf::AMF0Object;
use crate::vecbuf::VecBuf;

use super::StoreError;

// Frame flags
pub const FF_KEYFRAME: u32 = 1;
pub const FF_INTERFRAME: u32 = 2;

/// Callback receiving (grpos, flags, payload)
pub type FrameCallback = Box<dyn FnMut(u32, u32, VecBuf) + Send>;

/// One stored frame: group position, flags and payload
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub grpos: u32,
    pub flags: u32,
    pub data: VecBuf,
}

/// Handle to a live listener installed with `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub(crate) id: u64,
}

// Write strategy selected by set_buffering
#[derive(Clone, Copy, PartialEq, Eq)]
enum WriteStrategy {
    // plain stored stream: frames accumulate
    Append,

    // live stream without buffering: each write replaces the single
    // retained slot
    Replace,

    // keep at most buffer_grpos milliseconds
    GrposWindow,

    // keep at most buffer_frames frames
    FrameWindow,

    // like the windows above, but never cut past the last anchor
    // frame preceding the window
    GrposWindowAnchored,
    FrameWindowAnchored,
}

pub(crate) struct StreamCore {
    params: HashMap<String, String>,
    meta: AMF0Object,

    headers: Vec<Frame>,

    data: VecDeque<Frame>,

    // frames trimmed so far; absolute frame i lives at i - data_offset
    data_offset: u64,

    listeners: HashMap<u64, FrameCallback>,
    next_listener_id: u64,

    strategy: WriteStrategy,
    buffer_grpos: u32,
    buffer_frames: usize,
    buffer_flagmask: u32,

    // sparse (absolute frame, grpos) index of anchor frames
    index: Vec<(u64, u32)>,

    grpos_first: Option<u32>,
    grpos_last: Option<u32>,
}

impl StreamCore {
    pub(crate) fn new(live: bool) -> StreamCore {
        StreamCore {
            params: HashMap::new(),
            meta: AMF0Object::new(),
            headers: Vec::new(),
            data: VecDeque::new(),
            data_offset: 0,
            listeners: HashMap::new(),
            next_listener_id: 1,
            strategy: if live {
                WriteStrategy::Replace
            } else {
                WriteStrategy::Append
            },
            buffer_grpos: 0,
            buffer_frames: 0,
            buffer_flagmask: 0,
            index: Vec::new(),
            grpos_first: None,
            grpos_last: None,
        }
    }

    fn set_buffering(&mut self, grpos_range: u32, frames: usize, flag_mask: i32) {
        if grpos_range > 0 {
            self.buffer_grpos = grpos_range;
            self.buffer_frames = 0;

            if flag_mask != 0 {
                self.strategy = WriteStrategy::GrposWindowAnchored;
                self.buffer_flagmask = flag_mask.unsigned_abs();
                self.init_index();
            } else {
                self.strategy = WriteStrategy::GrposWindow;
                self.buffer_flagmask = 0;
                self.index.clear();
            }
        } else if frames > 0 {
            self.buffer_frames = frames;
            self.buffer_grpos = 0;

            if flag_mask != 0 {
                self.strategy = WriteStrategy::FrameWindowAnchored;
                self.buffer_flagmask = flag_mask.unsigned_abs();
                self.init_index();
            } else {
                self.strategy = WriteStrategy::FrameWindow;
                self.buffer_flagmask = 0;
                self.index.clear();
            }
        } else {
            self.buffer_grpos = 0;
            self.buffer_frames = 0;
            self.buffer_flagmask = 0;
            self.strategy = WriteStrategy::Replace;
            self.index.clear();
        }
    }

    fn init_index(&mut self) {
        let mut index = Vec::new();
        let offset = self.data_offset;

        for (i, frame) in self.data.iter().enumerate() {
            if self.buffer_flagmask & frame.flags != 0 {
                index.push((offset + i as u64, frame.grpos));
            }
        }

        self.index = index;
    }

    fn apply_write(&mut self, grpos: u32, flags: u32, data: VecBuf) {
        match self.strategy {
            WriteStrategy::Append => {
                self.data.push_back(Frame { grpos, flags, data });
                if self.grpos_first.is_none() {
                    self.grpos_first = Some(grpos);
                }
                self.grpos_last = Some(grpos);
            }
            WriteStrategy::Replace => {
                let frame = Frame { grpos, flags, data };

                if let Some(slot) = self.data.front_mut() {
                    *slot = frame;
                } else {
                    self.data.push_back(frame);
                }

                self.data_offset += 1;
                self.grpos_first = Some(grpos);
                self.grpos_last = Some(grpos);
            }
            WriteStrategy::GrposWindow => {
                self.push_frame(grpos, flags, data);
                self.cut_grpos();
            }
            WriteStrategy::FrameWindow => {
                self.push_frame(grpos, flags, data);
                self.cut_frames();
            }
            WriteStrategy::GrposWindowAnchored => {
                self.push_indexed_frame(grpos, flags, data);
                self.cut_grpos_flagmask();
            }
            WriteStrategy::FrameWindowAnchored => {
                self.push_indexed_frame(grpos, flags, data);
                self.cut_frames_flagmask();
            }
        }
    }

    fn push_frame(&mut self, grpos: u32, flags: u32, data: VecBuf) {
        self.data.push_back(Frame { grpos, flags, data });

        if self.grpos_first.is_none() {
            self.grpos_first = self.data.front().map(|f| f.grpos);
        }
        self.grpos_last = Some(grpos);
    }

    fn push_indexed_frame(&mut self, grpos: u32, flags: u32, data: VecBuf) {
        self.push_frame(grpos, flags, data);

        if flags & self.buffer_flagmask != 0 {
            let frame = self.data_offset + self.data.len() as u64 - 1;
            self.index.push((frame, grpos));
        }
    }

    fn drop_head(&mut self, count: usize) {
        if count == 0 {
            return;
        }

        self.data_offset += count as u64;
        self.data.drain(..count);
        self.grpos_first = self.data.front().map(|f| f.grpos);
    }

    fn cut_grpos(&mut self) {
        let last = match self.grpos_last {
            Some(last) => last,
            None => return,
        };

        let target = last.saturating_sub(self.buffer_grpos);

        let mut pos = 0;
        let mut grpos = match self.grpos_first {
            Some(first) => first,
            None => return,
        };

        while grpos < target && pos + 1 < self.data.len() {
            pos += 1;
            grpos = self.data[pos].grpos;
        }

        self.drop_head(pos);
    }

    fn cut_frames(&mut self) {
        if self.data.len() > self.buffer_frames {
            let pos = self.data.len() - self.buffer_frames;
            self.drop_head(pos);
        }
    }

    fn cut_grpos_flagmask(&mut self) {
        let last = match self.grpos_last {
            Some(last) => last,
            None => return,
        };

        let target = last.saturating_sub(self.buffer_grpos);

        let mut i_pos = 0;
        while i_pos < self.index.len() {
            if self.index[i_pos].1 > target {
                break;
            }
            i_pos += 1;
        }

        if i_pos > 0 {
            // keep the last anchor at or before the window start
            i_pos -= 1;
            let pos = (self.index[i_pos].0 - self.data_offset) as usize;
            self.index.drain(..i_pos);
            self.drop_head(pos);
        }
    }

    fn cut_frames_flagmask(&mut self) {
        if self.data.len() <= self.buffer_frames {
            return;
        }

        let target = self.data_offset + (self.data.len() - self.buffer_frames) as u64;

        let mut i_pos = 0;
        while i_pos < self.index.len() {
            if self.index[i_pos].0 > target {
                break;
            }
            i_pos += 1;
        }

        if i_pos > 0 {
            i_pos -= 1;
            let pos = (self.index[i_pos].0 - self.data_offset) as usize;
            self.index.drain(..i_pos);
            self.drop_head(pos);
        }
    }

    fn scan_from_end(&self, grpos_range: u32, frames: usize, flag_mask: i32) -> Option<u64> {
        if self.data.is_empty() {
            return None;
        }

        let mut pos = self.data.len() - 1;

        if grpos_range > 0 {
            let target = self.data[pos].grpos.saturating_sub(grpos_range);

            while pos > 0 {
                pos -= 1;
                if self.data[pos].grpos < target {
                    pos += 1;
                    break;
                }
            }
        } else if frames > 0 {
            pos = self.data.len().saturating_sub(frames);
        }

        if flag_mask < 0 {
            // search backward for an anchor
            let mask = flag_mask.unsigned_abs();
            let mut fpos = pos as i64;

            while fpos >= 0 {
                if self.data[fpos as usize].flags & mask != 0 {
                    break;
                }
                fpos -= 1;
            }

            if fpos >= 0 {
                pos = fpos as usize;
            }
        } else if flag_mask > 0 {
            // search forward for an anchor
            let mask = flag_mask as u32;
            let end = self.data.len() - 1;
            let mut fpos = pos;

            while fpos <= end {
                if self.data[fpos].flags & mask != 0 {
                    break;
                }
                fpos += 1;
            }

            if fpos <= end {
                pos = fpos;
            }
        }

        Some(self.data_offset + pos as u64)
    }
}

/// Handle to a stored media stream
///
/// Each handle carries its own sequential read cursor; the stored
/// frames are shared between handles.
pub struct MediaStream {
    core: Arc<Mutex<StreamCore>>,

    // read cursor: absolute frame position and group position
    pos: u64,
    grpos: u32,
}

impl Clone for MediaStream {
    fn clone(&self) -> MediaStream {
        MediaStream {
            core: self.core.clone(),
            pos: self.pos,
            grpos: self.grpos,
        }
    }
}

impl MediaStream {
    pub(crate) fn new(core: Arc<Mutex<StreamCore>>) -> MediaStream {
        MediaStream {
            core,
            pos: 0,
            grpos: 0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StreamCore> {
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stream parameters (e.g. the frame type)
    pub fn params(&self) -> HashMap<String, String> {
        self.lock().params.clone()
    }

    pub fn set_params(&self, params: HashMap<String, String>) {
        self.lock().params = params;
    }

    /// Stream metadata
    pub fn meta(&self) -> AMF0Object {
        self.lock().meta.clone()
    }

    pub fn set_meta(&self, meta: AMF0Object) {
        self.lock().meta = meta;
    }

    /// Delivers every recorded header frame to the callback
    pub fn read_headers<F: FnMut(u32, u32, VecBuf)>(&self, mut callback: F) {
        let core = self.lock();

        for frame in core.headers.iter() {
            callback(frame.grpos, frame.flags, frame.data.clone());
        }
    }

    /// Appends a header frame
    pub fn write_headers(&self, data: VecBuf, grpos: u32, flags: u32) {
        self.lock().headers.push(Frame { grpos, flags, data });
    }

    /// Number of recorded header frames
    pub fn header_count(&self) -> usize {
        self.lock().headers.len()
    }

    /// Sequentially delivers frames from the read cursor
    ///
    /// Exactly one of `grpos_range` (frames with grpos in
    /// [current, current+range)) or `frames` (the next n frames)
    /// selects the amount. The cursor advances to the highest group
    /// position delivered.
    pub fn read<F: FnMut(u32, u32, VecBuf)>(
        &mut self,
        grpos_range: Option<u32>,
        frames: Option<usize>,
        mut callback: F,
    ) {
        let core = self.lock();

        if let Some(range) = grpos_range {
            let end_grpos = self.grpos.saturating_add(range);
            let mut pos = self.pos;
            let mut grpos = self.grpos;

            loop {
                let mut idx = pos as i64 - core.data_offset as i64;
                if idx < 0 {
                    // frames under the cursor were trimmed away
                    pos += (-idx) as u64;
                    idx = 0;
                }

                match core.data.get(idx as usize) {
                    None => break,
                    Some(frame) => {
                        grpos = frame.grpos;
                        if grpos >= end_grpos {
                            grpos = end_grpos;
                            break;
                        }
                        callback(frame.grpos, frame.flags, frame.data.clone());
                        pos += 1;
                    }
                }
            }

            drop(core);
            self.pos = pos;
            self.grpos = grpos;
        } else if let Some(count) = frames {
            let mut remaining = count as i64;
            let mut pos = self.pos;
            let mut grpos = self.grpos;

            loop {
                let mut idx = pos as i64 - core.data_offset as i64;
                if idx < 0 {
                    pos += (-idx) as u64;
                    remaining += idx;
                    idx = 0;
                }

                if remaining < 1 {
                    break;
                }

                match core.data.get(idx as usize) {
                    None => break,
                    Some(frame) => {
                        grpos = frame.grpos;
                        callback(frame.grpos, frame.flags, frame.data.clone());
                        pos += 1;
                        remaining -= 1;
                    }
                }
            }

            drop(core);
            self.pos = pos;
            self.grpos = grpos;
        }
    }

    /// Appends a frame and notifies live listeners
    pub fn write(&self, grpos: u32, flags: u32, data: VecBuf) {
        let mut core = self.lock();

        core.apply_write(grpos, flags, data.clone());

        for (_, listener) in core.listeners.iter_mut() {
            listener(grpos, flags, data.clone());
        }
    }

    /// Selects the live write strategy
    ///
    /// One of `grpos_range` / `frames` bounds the retained window; a
    /// non-zero `flag_mask` keeps the window head anchored on a
    /// matching frame. Both zero disables buffering: each write
    /// replaces the previous frame.
    pub fn set_buffering(&self, grpos_range: u32, frames: usize, flag_mask: i32) {
        self.lock().set_buffering(grpos_range, frames, flag_mask);
    }

    /// Drops the earliest frames so the retained window satisfies the
    /// given policy
    ///
    /// A negative `flag_mask` anchors the new head on the nearest
    /// preceding matching frame, a positive one on the nearest
    /// following.
    pub fn trim(&self, grpos_range: u32, frames: usize, flag_mask: i32) {
        let mut core = self.lock();

        if let Some(raw_pos) = core.scan_from_end(grpos_range, frames, flag_mask) {
            let pos = raw_pos.saturating_sub(core.data_offset) as usize;
            core.drop_head(pos);
        }
    }

    /// Replays a suffix of stored frames per the preroll policy, then
    /// installs the callback as a live listener
    ///
    /// Exactly one of `preroll_grpos_range`, `preroll_frames` or
    /// `preroll_from_frame` picks the replayed suffix.
    pub fn subscribe(
        &self,
        mut callback: FrameCallback,
        preroll_grpos_range: u32,
        preroll_frames: usize,
        preroll_from_frame: Option<u64>,
        flag_mask: i32,
    ) -> Result<Subscription, StoreError> {
        let mut core = self.lock();

        let mut pos: Option<usize> = None;

        if preroll_grpos_range > 0 || preroll_frames > 0 {
            if let Some(raw) = core.scan_from_end(preroll_grpos_range, preroll_frames, flag_mask) {
                pos = Some((raw - core.data_offset) as usize);
            }
        } else if let Some(from_frame) = preroll_from_frame {
            let rel = from_frame as i64 - core.data_offset as i64;

            if rel < 0 || rel as usize >= core.data.len() {
                return Err(StoreError::InvalidFrameNumber(from_frame as i64));
            }

            pos = Some(rel as usize);
        }

        if let Some(pos) = pos {
            for i in pos..core.data.len() {
                let frame = core.data[i].clone();
                callback(frame.grpos, frame.flags, frame.data);
            }
        }

        let id = core.next_listener_id;
        core.next_listener_id += 1;
        core.listeners.insert(id, callback);

        Ok(Subscription { id })
    }

    /// Removes a live listener
    pub fn unsubscribe(&self, subscription: Subscription) {
        self.lock().listeners.remove(&subscription.id);
    }

    /// Number of installed live listeners
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Finds the absolute frame index matching the backward seek
    /// policy; stable across trims
    pub fn find_frame_backward(
        &self,
        grpos_range: u32,
        frames: usize,
        flag_mask: i32,
    ) -> Option<u64> {
        self.lock().scan_from_end(grpos_range, frames, flag_mask)
    }

    /// Group position of the given absolute frame index
    ///
    /// Negative indices count from the end.
    pub fn frame_to_grpos(&self, frame: i64) -> Result<u32, StoreError> {
        let core = self.lock();

        let data_len = core.data.len() as i64;

        let frame = if frame < 0 {
            core.data_offset as i64 + data_len + frame
        } else {
            frame
        };

        let raw_frame = frame - core.data_offset as i64;

        if raw_frame >= 0 && raw_frame < data_len {
            return Ok(core.data[raw_frame as usize].grpos);
        }

        Err(StoreError::InvalidFrameNumber(frame))
    }

    /// Number of retained frames
    pub fn frame_count(&self) -> usize {
        self.lock().data.len()
    }

    /// Group positions of the retained frames, earliest first
    pub fn retained_grpos(&self) -> Vec<u32> {
        self.lock().data.iter().map(|f| f.grpos).collect()
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stream(live: bool) -> MediaStream {
        MediaStream::new(Arc::new(Mutex::new(StreamCore::new(live))))
    }

    fn payload(n: u8) -> VecBuf {
        VecBuf::from(vec![n; 4])
    }

    fn fill(s: &MediaStream, grpos_list: &[u32]) {
        for (i, grpos) in grpos_list.iter().enumerate() {
            s.write(*grpos, FF_KEYFRAME, payload(i as u8));
        }
    }

    #[test]
    fn test_read_cursor_advances() {
        let mut s = stream(false);
        fill(&s, &[0, 40, 80, 120, 160, 200]);

        let mut seen = Vec::new();
        s.read(Some(100), None, |grpos, _, _| seen.push(grpos));

        // [0, 100): frames at 0, 40, 80
        assert_eq!(seen, vec![0, 40, 80]);

        let mut seen = Vec::new();
        s.read(Some(100), None, |grpos, _, _| seen.push(grpos));

        // [100, 200): frames at 120, 160
        assert_eq!(seen, vec![120, 160]);
    }

    #[test]
    fn test_read_cursor_split_equals_whole() {
        let grpos_list = [0, 40, 80, 120, 160, 200, 240];

        let mut split = stream(false);
        fill(&split, &grpos_list);

        let mut whole = split.clone();

        let mut seen_split = Vec::new();
        split.read(Some(110), None, |g, _, _| seen_split.push(g));
        split.read(Some(110), None, |g, _, _| seen_split.push(g));

        let mut seen_whole = Vec::new();
        whole.read(Some(220), None, |g, _, _| seen_whole.push(g));

        assert_eq!(seen_split, seen_whole);
    }

    #[test]
    fn test_read_by_frames() {
        let mut s = stream(false);
        fill(&s, &[0, 40, 80, 120]);

        let mut seen = Vec::new();
        s.read(None, Some(2), |grpos, _, _| seen.push(grpos));
        assert_eq!(seen, vec![0, 40]);

        let mut seen = Vec::new();
        s.read(None, Some(10), |grpos, _, _| seen.push(grpos));
        assert_eq!(seen, vec![80, 120]);
    }

    #[test]
    fn test_trim_by_grpos() {
        let s = stream(false);
        fill(&s, &[0, 40, 80, 120, 160]);

        s.trim(100, 0, 0);

        // window of 100ms back from 160
        assert_eq!(s.retained_grpos(), vec![80, 120, 160]);
    }

    #[test]
    fn test_trim_by_frames() {
        let s = stream(false);
        fill(&s, &[0, 40, 80, 120, 160]);

        s.trim(0, 2, 0);

        assert_eq!(s.retained_grpos(), vec![120, 160]);
    }

    #[test]
    fn test_trim_with_backward_anchor() {
        let s = stream(false);

        s.write(0, FF_KEYFRAME, payload(0));
        s.write(40, FF_INTERFRAME, payload(1));
        s.write(80, FF_INTERFRAME, payload(2));
        s.write(120, FF_KEYFRAME, payload(3));
        s.write(160, FF_INTERFRAME, payload(4));

        // 2 frames back lands on 120 which is a keyframe already;
        // 3 frames back lands on 80 and the negative mask pulls the
        // cut point back to the keyframe at 0
        s.trim(0, 3, -(FF_KEYFRAME as i32));

        assert_eq!(s.retained_grpos(), vec![0, 40, 80, 120, 160]);

        // positive mask pushes forward to the next keyframe instead
        s.trim(0, 3, FF_KEYFRAME as i32);

        assert_eq!(s.retained_grpos(), vec![120, 160]);
    }

    #[test]
    fn test_frame_indices_stable_across_trims() {
        let s = stream(false);
        fill(&s, &[0, 40, 80, 120, 160]);

        assert_eq!(s.frame_to_grpos(3).unwrap(), 120);

        s.trim(0, 2, 0);

        // frame 3 keeps its identity after trimming
        assert_eq!(s.frame_to_grpos(3).unwrap(), 120);

        // trimmed frames are gone
        assert_eq!(
            s.frame_to_grpos(0),
            Err(StoreError::InvalidFrameNumber(0))
        );

        // negative index counts from the end
        assert_eq!(s.frame_to_grpos(-1).unwrap(), 160);
    }

    #[test]
    fn test_find_frame_backward() {
        let s = stream(false);

        s.write(0, FF_KEYFRAME, payload(0));
        s.write(40, FF_INTERFRAME, payload(1));
        s.write(80, FF_KEYFRAME, payload(2));
        s.write(120, FF_INTERFRAME, payload(3));

        assert_eq!(s.find_frame_backward(0, 1, 0), Some(3));
        assert_eq!(
            s.find_frame_backward(0, 1, -(FF_KEYFRAME as i32)),
            Some(2)
        );
        assert_eq!(s.find_frame_backward(60, 0, 0), Some(2));

        let empty = stream(false);
        assert_eq!(empty.find_frame_backward(0, 1, 0), None);
    }

    #[test]
    fn test_subscribe_preroll_by_grpos() {
        let s = stream(false);
        fill(&s, &[0, 40, 80, 120, 160]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_in = seen.clone();

        let sub = s
            .subscribe(
                Box::new(move |grpos, _, _| seen_in.lock().unwrap().push(grpos)),
                90,
                0,
                None,
                0,
            )
            .unwrap();

        // preroll: 90ms back from 160
        assert_eq!(*seen.lock().unwrap(), vec![80, 120, 160]);

        // live forwarding after preroll
        s.write(200, FF_KEYFRAME, payload(9));
        assert_eq!(*seen.lock().unwrap(), vec![80, 120, 160, 200]);

        s.unsubscribe(sub);
        s.write(240, FF_KEYFRAME, payload(10));
        assert_eq!(*seen.lock().unwrap(), vec![80, 120, 160, 200]);
    }

    #[test]
    fn test_subscribe_preroll_from_frame() {
        let s = stream(false);
        fill(&s, &[0, 40, 80]);

        let count = Arc::new(AtomicUsize::new(0));
        let count_in = count.clone();

        s.subscribe(
            Box::new(move |_, _, _| {
                count_in.fetch_add(1, Ordering::SeqCst);
            }),
            0,
            0,
            Some(1),
            0,
        )
        .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 2);

        // out of the retained window
        let result = s.subscribe(Box::new(|_, _, _| {}), 0, 0, Some(7), 0);
        assert_eq!(result, Err(StoreError::InvalidFrameNumber(7)));
    }

    #[test]
    fn test_live_no_buffering_replaces() {
        let s = stream(true);

        fill(&s, &[0, 40, 80]);

        // a single slot, data_offset advancing every write
        assert_eq!(s.frame_count(), 1);
        assert_eq!(s.retained_grpos(), vec![80]);
        assert_eq!(s.frame_to_grpos(3).unwrap(), 80);
        assert!(s.frame_to_grpos(2).is_err());
    }

    #[test]
    fn test_live_grpos_window() {
        let s = stream(true);
        s.set_buffering(100, 0, 0);

        fill(&s, &[0, 40, 80, 120, 160, 200]);

        let retained = s.retained_grpos();
        let first = retained[0];
        let last = *retained.last().unwrap();

        assert!(last - first <= 100);
        assert_eq!(retained, vec![120, 160, 200]);
    }

    #[test]
    fn test_live_frame_window() {
        let s = stream(true);
        s.set_buffering(0, 3, 0);

        fill(&s, &[0, 40, 80, 120, 160]);

        assert_eq!(s.retained_grpos(), vec![80, 120, 160]);
    }

    #[test]
    fn test_live_grpos_window_anchored() {
        let s = stream(true);
        s.set_buffering(100, 0, FF_KEYFRAME as i32);

        s.write(0, FF_KEYFRAME, payload(0));
        s.write(40, FF_INTERFRAME, payload(1));
        s.write(80, FF_INTERFRAME, payload(2));
        s.write(120, FF_KEYFRAME, payload(3));
        s.write(160, FF_INTERFRAME, payload(4));
        s.write(200, FF_INTERFRAME, payload(5));

        // a plain 100ms window would start at 120, but the head stays
        // on the last keyframe at or before the window start
        assert_eq!(s.retained_grpos(), vec![0, 40, 80, 120, 160, 200]);

        // once the window start passes the keyframe at 120, the cut
        // moves up to it
        s.write(240, FF_INTERFRAME, payload(6));
        assert_eq!(s.retained_grpos(), vec![120, 160, 200, 240]);

        // no further anchor: the head stays put
        s.write(280, FF_INTERFRAME, payload(7));
        assert_eq!(s.retained_grpos()[0], 120);
    }

    #[test]
    fn test_live_frame_window_anchored() {
        let s = stream(true);
        s.set_buffering(0, 2, FF_KEYFRAME as i32);

        s.write(0, FF_KEYFRAME, payload(0));
        s.write(40, FF_INTERFRAME, payload(1));
        s.write(80, FF_INTERFRAME, payload(2));

        // the head is anchored on the keyframe at 0
        assert_eq!(s.retained_grpos(), vec![0, 40, 80]);

        s.write(120, FF_KEYFRAME, payload(3));
        s.write(160, FF_INTERFRAME, payload(4));

        // a new anchor lets the window move up
        assert_eq!(s.retained_grpos(), vec![120, 160]);
    }

    #[test]
    fn test_headers() {
        let s = stream(true);

        s.write_headers(payload(1), 0, 0);
        s.write_headers(payload(2), 0, 0);

        let mut seen = 0;
        s.read_headers(|_, _, _| seen += 1);

        assert_eq!(seen, 2);
        assert_eq!(s.header_count(), 2);
    }

    #[test]
    fn test_params_and_meta() {
        let s = stream(false);

        let mut params = HashMap::new();
        params.insert("type".to_string(), "audio/x-flv-tag-audio".to_string());
        s.set_params(params.clone());

        assert_eq!(s.params(), params);

        let meta = AMF0Object::new().with("duration", crate::amf::AMF0Value::number(0.0));
        s.set_meta(meta.clone());
        assert_eq!(s.meta(), meta);
    }
}
