// Buffered outgoing media writer

use std::collections::{HashMap, VecDeque};

use crate::chunks::{RTMP_TYPE_AUDIO, RTMP_TYPE_VIDEO};
use crate::server::NetStream;
use crate::vecbuf::VecBuf;

/// Buffers preroll frames per track, then switches to live
/// forwarding
///
/// With `rewrite_ts` the outgoing timestamps restart from the highest
/// prerolled group position. Info markers are codec sentinel frames
/// bracketing a video-only preroll; without them the client's jitter
/// buffer keeps waiting for audio that never comes.
pub struct BufferingWriter {
    nstream: NetStream,
    bufs: HashMap<u32, VecDeque<(u32, VecBuf)>>,
    rewrite: bool,
    mark: bool,
    prerolling: bool,
    base_gp: u32,
}

impl BufferingWriter {
    pub fn new(
        nstream: NetStream,
        track_types: &[u32],
        rewrite_ts: bool,
        use_info_marks: bool,
    ) -> BufferingWriter {
        let mut mark = use_info_marks;
        let mut rewrite = rewrite_ts;

        if track_types.len() == 1 {
            if track_types.contains(&RTMP_TYPE_VIDEO) {
                // force info markers, otherwise flash buffers a lot
                // before deciding there's not gonna be any audio
                mark = true;
            } else {
                // no video - no markers
                mark = false;
            }
        }

        // markers only make sense on a rebased timeline
        if mark {
            rewrite = true;
        }

        BufferingWriter {
            nstream,
            bufs: track_types.iter().map(|t| (*t, VecDeque::new())).collect(),
            rewrite,
            mark,
            prerolling: false,
            base_gp: 0,
        }
    }

    /// Begins buffering until `preroll_done`
    pub fn begin_preroll(&mut self) {
        self.prerolling = true;
    }

    /// True while preroll frames are being collected
    pub fn is_prerolling(&self) -> bool {
        self.prerolling
    }

    /// Writes one frame; buffered during preroll, forwarded live
    /// afterwards
    pub fn write(&mut self, msg_type: u32, grpos: u32, _flags: u32, data: VecBuf) {
        if self.prerolling {
            self.bufs.entry(msg_type).or_default().push_back((grpos, data));
        } else if self.rewrite {
            self.nstream
                .send(grpos.saturating_sub(self.base_gp), msg_type, data);
        } else {
            self.nstream.send(grpos, msg_type, data);
        }
    }

    /// Flushes the buffered preroll and switches to live forwarding
    pub fn preroll_done(&mut self) {
        if self.rewrite {
            self.base_gp = self
                .bufs
                .values()
                .filter_map(|buf| buf.back().map(|(gp, _)| *gp))
                .max()
                .unwrap_or(0);
        }

        for (msg_type, marked) in [(RTMP_TYPE_VIDEO, self.mark), (RTMP_TYPE_AUDIO, false)] {
            let rewrite = self.rewrite;
            let frames = match self.bufs.get_mut(&msg_type) {
                Some(frames) => frames,
                None => continue,
            };

            if marked {
                // info marker open: frame type 5 (info), codec id 7
                self.nstream
                    .send(0, msg_type, VecBuf::from(vec![0x57, 0x00]));

                Self::flush(&self.nstream, msg_type, frames, rewrite);

                // info marker close
                self.nstream
                    .send(0, msg_type, VecBuf::from(vec![0x57, 0x01]));
            } else {
                Self::flush(&self.nstream, msg_type, frames, rewrite);
            }
        }

        self.prerolling = false;
    }

    fn flush(
        nstream: &NetStream,
        msg_type: u32,
        frames: &mut VecDeque<(u32, VecBuf)>,
        rewrite: bool,
    ) {
        for (grpos, data) in frames.drain(..) {
            // on a rebased timeline the whole preroll lands at 0
            let ts = if rewrite { 0 } else { grpos };
            nstream.send(ts, msg_type, data);
        }
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{DemuxedEvent, Demuxer, Muxer, SimpleChunkProducer};
    use bytes::Bytes;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    fn make_nstream(id: u32) -> (NetStream, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let muxer = Arc::new(Mutex::new(Muxer::new(Box::new(SimpleChunkProducer::new(
            tx,
        )))));
        (NetStream::new(muxer, id), rx)
    }

    fn sent_frames(rx: &mut mpsc::UnboundedReceiver<Bytes>) -> Vec<(u32, u32, Vec<u8>)> {
        let mut wire = Vec::new();
        while let Ok(piece) = rx.try_recv() {
            wire.extend_from_slice(&piece);
        }

        let mut demuxer = Demuxer::new();
        let mut frames = Vec::new();

        for event in demuxer.data_received(&wire).unwrap() {
            if let DemuxedEvent::Message { header, body } = event {
                frames.push((header.msg_type, header.abs_time, body.to_vec()));
            }
        }

        frames
    }

    #[test]
    fn test_passthrough_without_preroll() {
        let (nstream, mut rx) = make_nstream(1);

        let mut writer = BufferingWriter::new(
            nstream,
            &[RTMP_TYPE_AUDIO, RTMP_TYPE_VIDEO],
            false,
            false,
        );

        writer.write(RTMP_TYPE_AUDIO, 40, 0, VecBuf::from(vec![1u8]));

        let frames = sent_frames(&mut rx);
        assert_eq!(frames, vec![(RTMP_TYPE_AUDIO, 40, vec![1u8])]);
    }

    #[test]
    fn test_preroll_buffers_then_flushes() {
        let (nstream, mut rx) = make_nstream(1);

        let mut writer = BufferingWriter::new(
            nstream,
            &[RTMP_TYPE_AUDIO, RTMP_TYPE_VIDEO],
            false,
            false,
        );

        writer.begin_preroll();
        writer.write(RTMP_TYPE_AUDIO, 0, 0, VecBuf::from(vec![1u8]));
        writer.write(RTMP_TYPE_VIDEO, 0, 0, VecBuf::from(vec![2u8]));
        writer.write(RTMP_TYPE_AUDIO, 40, 0, VecBuf::from(vec![3u8]));

        // nothing goes out during preroll
        assert!(sent_frames(&mut rx).is_empty());

        writer.preroll_done();

        // video flushes before audio
        let frames = sent_frames(&mut rx);
        assert_eq!(
            frames,
            vec![
                (RTMP_TYPE_VIDEO, 0, vec![2u8]),
                (RTMP_TYPE_AUDIO, 0, vec![1u8]),
                (RTMP_TYPE_AUDIO, 40, vec![3u8]),
            ]
        );

        // live frames pass through now
        writer.write(RTMP_TYPE_AUDIO, 80, 0, VecBuf::from(vec![4u8]));
        let frames = sent_frames(&mut rx);
        assert_eq!(frames, vec![(RTMP_TYPE_AUDIO, 80, vec![4u8])]);
    }

    #[test]
    fn test_video_only_gets_info_markers_and_rebased_timeline() {
        let (nstream, mut rx) = make_nstream(1);

        let mut writer = BufferingWriter::new(nstream, &[RTMP_TYPE_VIDEO], false, false);

        writer.begin_preroll();
        writer.write(RTMP_TYPE_VIDEO, 1000, 0, VecBuf::from(vec![9u8]));
        writer.preroll_done();

        let frames = sent_frames(&mut rx);

        assert_eq!(
            frames,
            vec![
                (RTMP_TYPE_VIDEO, 0, vec![0x57, 0x00]),
                (RTMP_TYPE_VIDEO, 0, vec![9u8]),
                (RTMP_TYPE_VIDEO, 0, vec![0x57, 0x01]),
            ]
        );

        // live timestamps are rebased on the preroll end
        writer.write(RTMP_TYPE_VIDEO, 1040, 0, VecBuf::from(vec![8u8]));
        let frames = sent_frames(&mut rx);
        assert_eq!(frames, vec![(RTMP_TYPE_VIDEO, 40, vec![8u8])]);
    }
}
