//! The single-producer parse job.
//!
//! Runs once on a background thread: decodes the header, reserves the
//! store, then classifies tags until the end marker. Frames are built
//! op by op and published at each frame boundary. The terminal latch
//! and the advisory abort flag are checked once per decoded tag; a
//! tag in flight always finishes.

use crate::header::MovieHeader;
use crate::tag::{Tag, TagReader};
use flick_core::{ControlOp, FrameOp, Result};
use flick_player::{FrameStore, Lifecycle};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Cooperative cancellation handle for a running parse job.
#[derive(Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Ask the job to stop after the tag currently being decoded. The
    /// store is marked failed, the same path a decode error takes.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Decodes one stream into one frame store.
pub struct ParseJob<R> {
    reader: R,
    store: Arc<FrameStore>,
    abort: AbortHandle,
}

impl<R: Read> ParseJob<R> {
    pub fn new(reader: R, store: Arc<FrameStore>) -> Self {
        Self {
            reader,
            store,
            abort: AbortHandle::default(),
        }
    }

    /// Handle for requesting a cooperative abort from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Decode the stream to completion.
    ///
    /// Returns `Ok` on the end marker, on shutdown, and on abort (the
    /// abort already marks the store failed). Decode errors propagate
    /// to the caller, which owns converting them into the store's
    /// failed state and the coordinator's error latch.
    pub fn run(mut self, lifecycle: &Lifecycle) -> Result<()> {
        let header = MovieHeader::read(&mut self.reader)?;
        self.store.set_canvas(header.canvas);
        self.store.set_frame_rate(header.frame_rate);
        self.store.reserve(header.frame_count as usize)?;

        let mut tags = TagReader::new(self.reader);
        let mut empty = true;
        loop {
            match tags.read_tag()? {
                Tag::End => {
                    debug!("end of parsing");
                    if empty {
                        self.store.revert();
                    } else {
                        self.store.commit(false)?;
                    }
                    break;
                }
                Tag::Dictionary(entry) => {
                    trace!(id = entry.id, "dictionary entry");
                    self.store.add_to_dictionary(entry);
                }
                Tag::DisplayList(op) => {
                    self.store.append(FrameOp::Display(op))?;
                    empty = false;
                }
                Tag::Control(op) => {
                    self.store.append(FrameOp::Control(op))?;
                    empty = false;
                }
                Tag::ShowFrame => {
                    self.store.commit(true)?;
                    empty = true;
                }
                Tag::FrameLabel(name) => {
                    self.store.label_current_frame(name)?;
                    empty = false;
                }
                Tag::SetBackground(color) => {
                    self.store.set_background(color);
                    self.store.append(FrameOp::Control(ControlOp {
                        data: vec![color.r, color.g, color.b],
                    }))?;
                    empty = false;
                }
                Tag::Unknown(kind) => {
                    trace!(kind, "ignoring unknown tag");
                }
            }
            if lifecycle.should_terminate() {
                debug!("parse loop observed terminal latch");
                break;
            }
            if self.abort.is_aborted() {
                debug!("parse loop aborted");
                self.store.mark_failed("parsing aborted");
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::encode;
    use flick_core::{FlickError, FrameRate};
    use std::io::Cursor;

    fn header_bytes(frame_count: u16) -> Vec<u8> {
        crate::header::test_header_bytes(b"FWS", 24 * 256, frame_count, (0, 0))
    }

    #[test]
    fn test_two_frame_stream() {
        // header {sig="FWS", version=6, rate=24.0, frame_count=2},
        // stream = [display-op A, boundary, display-op B, end].
        let mut bytes = header_bytes(2);
        encode::display_list(&mut bytes, 1, b"A");
        encode::show_frame(&mut bytes);
        encode::display_list(&mut bytes, 1, b"B");
        encode::end(&mut bytes);

        let store = Arc::new(FrameStore::new(None));
        let lifecycle = Lifecycle::new();
        ParseJob::new(Cursor::new(bytes), store.clone())
            .run(&lifecycle)
            .unwrap();

        assert!(!store.is_failed());
        assert_eq!(store.frames_loaded(), 2);
        assert_eq!(store.try_frame_rate(), Some(FrameRate::from_fixed_8_8(24 * 256)));
        let frame0 = store.wait_for_frame(0).unwrap();
        let frame1 = store.wait_for_frame(1).unwrap();
        assert_eq!(frame0.ops.len(), 1);
        assert_eq!(frame1.ops.len(), 1);
        match (&frame0.ops[0], &frame1.ops[0]) {
            (FrameOp::Display(a), FrameOp::Display(b)) => {
                assert_eq!(a.data, b"A");
                assert_eq!(b.data, b"B");
            }
            other => panic!("unexpected ops: {:?}", other),
        }
    }

    #[test]
    fn test_trailing_empty_frame_is_reverted() {
        let mut bytes = header_bytes(1);
        encode::display_list(&mut bytes, 1, b"A");
        encode::show_frame(&mut bytes);
        // Boundary already committed frame 0; nothing else before End.
        encode::end(&mut bytes);

        let store = Arc::new(FrameStore::new(None));
        ParseJob::new(Cursor::new(bytes), store.clone())
            .run(&Lifecycle::new())
            .unwrap();
        assert_eq!(store.frames_loaded(), 1);
        assert!(store.is_closed());
    }

    #[test]
    fn test_label_and_dictionary() {
        let mut bytes = header_bytes(1);
        encode::dictionary(&mut bytes, 9, &[1, 2, 3]);
        encode::frame_label(&mut bytes, "only");
        encode::end(&mut bytes);

        let store = Arc::new(FrameStore::new(None));
        ParseJob::new(Cursor::new(bytes), store.clone())
            .run(&Lifecycle::new())
            .unwrap();
        // A labelled frame counts as content even with no ops.
        assert_eq!(store.frames_loaded(), 1);
        assert_eq!(
            store.wait_for_frame(0).unwrap().label.as_deref(),
            Some("only")
        );
        assert!(store.dictionary_lookup(9).is_some());
    }

    #[test]
    fn test_unknown_tags_are_skipped() {
        let mut bytes = header_bytes(1);
        encode::unknown(&mut bytes, 250, &[9, 9]);
        encode::display_list(&mut bytes, 1, b"A");
        encode::end(&mut bytes);

        let store = Arc::new(FrameStore::new(None));
        ParseJob::new(Cursor::new(bytes), store.clone())
            .run(&Lifecycle::new())
            .unwrap();
        assert_eq!(store.frames_loaded(), 1);
    }

    #[test]
    fn test_background_tag_reaches_store() {
        let mut bytes = header_bytes(1);
        encode::set_background(&mut bytes, 10, 20, 30);
        encode::end(&mut bytes);

        let store = Arc::new(FrameStore::new(None));
        ParseJob::new(Cursor::new(bytes), store.clone())
            .run(&Lifecycle::new())
            .unwrap();
        let bg = store.background();
        assert_eq!((bg.r, bg.g, bg.b), (10, 20, 30));
    }

    #[test]
    fn test_truncated_stream_propagates_error() {
        let mut bytes = header_bytes(2);
        encode::display_list(&mut bytes, 1, b"A");
        // No end marker; the reader hits EOF mid-tag.
        let store = Arc::new(FrameStore::new(None));
        let err = ParseJob::new(Cursor::new(bytes), store)
            .run(&Lifecycle::new())
            .unwrap_err();
        assert!(matches!(err, FlickError::Io(_)));
    }

    #[test]
    fn test_abort_marks_store_failed() {
        let mut bytes = header_bytes(3);
        encode::display_list(&mut bytes, 1, b"A");
        encode::show_frame(&mut bytes);
        encode::display_list(&mut bytes, 1, b"B");
        encode::show_frame(&mut bytes);
        encode::end(&mut bytes);

        let store = Arc::new(FrameStore::new(None));
        let job = ParseJob::new(Cursor::new(bytes), store.clone());
        // Abort before the loop starts: the first decoded tag is the
        // last one processed.
        job.abort_handle().abort();
        job.run(&Lifecycle::new()).unwrap();
        assert!(store.is_failed());
    }

    #[test]
    fn test_shutdown_stops_loop_without_failing() {
        let mut bytes = header_bytes(3);
        encode::display_list(&mut bytes, 1, b"A");
        encode::show_frame(&mut bytes);
        encode::end(&mut bytes);

        let store = Arc::new(FrameStore::new(None));
        let lifecycle = Lifecycle::new();
        lifecycle.request_shutdown();
        ParseJob::new(Cursor::new(bytes), store.clone())
            .run(&lifecycle)
            .unwrap();
        assert!(!store.is_failed());
    }
}
