//! Tag stream decoding.
//!
//! After the header the stream is a flat sequence of tags:
//! kind byte, payload length (u16 LE), payload. The reader classifies
//! each tag; unknown kinds are skipped rather than failing the stream,
//! so newer streams stay playable.

use crate::header::{read_u16, read_u8};
use flick_core::{ControlOp, DictionaryEntry, DisplayListOp, FlickError, Result, Rgb};
use std::io::Read;

/// Tag kind bytes in the container.
mod kind {
    pub const END: u8 = 0;
    pub const DICTIONARY: u8 = 1;
    pub const DISPLAY_LIST: u8 = 2;
    pub const CONTROL: u8 = 3;
    pub const SHOW_FRAME: u8 = 4;
    pub const FRAME_LABEL: u8 = 5;
    pub const SET_BACKGROUND: u8 = 6;
}

/// One classified unit of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    /// Terminal marker; nothing follows.
    End,
    /// Resource definition, no frame effect.
    Dictionary(DictionaryEntry),
    /// Display-list mutation for the current frame.
    DisplayList(DisplayListOp),
    /// Control operation for the current frame.
    Control(ControlOp),
    /// Frame boundary: commit and continue.
    ShowFrame,
    /// Label for the current frame.
    FrameLabel(String),
    /// Stage background color.
    SetBackground(Rgb),
    /// Unimplemented tag kind; ignored.
    Unknown(u8),
}

/// Streaming tag reader over any byte source.
pub struct TagReader<R> {
    reader: R,
}

impl<R: Read> TagReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    fn read_payload(&mut self, len: u16) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; len as usize];
        self.reader.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Decode the next tag.
    pub fn read_tag(&mut self) -> Result<Tag> {
        let kind = read_u8(&mut self.reader)?;
        let len = read_u16(&mut self.reader)?;
        match kind {
            kind::END => {
                if len != 0 {
                    return Err(FlickError::Format(
                        "end marker carries a payload".to_string(),
                    ));
                }
                Ok(Tag::End)
            }
            kind::DICTIONARY => {
                if len < 2 {
                    return Err(FlickError::Format(
                        "dictionary tag shorter than its id".to_string(),
                    ));
                }
                let id = read_u16(&mut self.reader)?;
                let data = self.read_payload(len - 2)?;
                Ok(Tag::Dictionary(DictionaryEntry { id, data }))
            }
            kind::DISPLAY_LIST => {
                if len < 2 {
                    return Err(FlickError::Format(
                        "display-list tag shorter than its depth".to_string(),
                    ));
                }
                let depth = read_u16(&mut self.reader)?;
                let data = self.read_payload(len - 2)?;
                Ok(Tag::DisplayList(DisplayListOp { depth, data }))
            }
            kind::CONTROL => {
                let data = self.read_payload(len)?;
                Ok(Tag::Control(ControlOp { data }))
            }
            kind::SHOW_FRAME => {
                if len != 0 {
                    return Err(FlickError::Format(
                        "frame boundary carries a payload".to_string(),
                    ));
                }
                Ok(Tag::ShowFrame)
            }
            kind::FRAME_LABEL => {
                let payload = self.read_payload(len)?;
                let name = String::from_utf8(payload).map_err(|_| {
                    FlickError::Format("frame label is not valid UTF-8".to_string())
                })?;
                Ok(Tag::FrameLabel(name))
            }
            kind::SET_BACKGROUND => {
                if len != 3 {
                    return Err(FlickError::Format(
                        "background tag must carry exactly 3 bytes".to_string(),
                    ));
                }
                let payload = self.read_payload(len)?;
                Ok(Tag::SetBackground(Rgb {
                    r: payload[0],
                    g: payload[1],
                    b: payload[2],
                }))
            }
            other => {
                // Skip the payload so the stream stays aligned.
                self.read_payload(len)?;
                Ok(Tag::Unknown(other))
            }
        }
    }
}

/// Encoding helpers used by tests and tooling to assemble streams.
pub mod encode {
    use super::kind;

    fn tag(out: &mut Vec<u8>, kind: u8, payload: &[u8]) {
        out.push(kind);
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
    }

    /// Assemble an uncompressed stream header. The declared length
    /// field is advisory and left at zero.
    pub fn header(out: &mut Vec<u8>, rate_raw: u16, frame_count: u16, width: i32, height: i32) {
        out.extend_from_slice(b"FWS");
        out.push(6); // version
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&rate_raw.to_le_bytes());
        out.extend_from_slice(&frame_count.to_le_bytes());
    }

    pub fn end(out: &mut Vec<u8>) {
        tag(out, kind::END, &[]);
    }

    pub fn dictionary(out: &mut Vec<u8>, id: u16, data: &[u8]) {
        let mut payload = id.to_le_bytes().to_vec();
        payload.extend_from_slice(data);
        tag(out, kind::DICTIONARY, &payload);
    }

    pub fn display_list(out: &mut Vec<u8>, depth: u16, data: &[u8]) {
        let mut payload = depth.to_le_bytes().to_vec();
        payload.extend_from_slice(data);
        tag(out, kind::DISPLAY_LIST, &payload);
    }

    pub fn control(out: &mut Vec<u8>, data: &[u8]) {
        tag(out, kind::CONTROL, data);
    }

    pub fn show_frame(out: &mut Vec<u8>) {
        tag(out, kind::SHOW_FRAME, &[]);
    }

    pub fn frame_label(out: &mut Vec<u8>, name: &str) {
        tag(out, kind::FRAME_LABEL, name.as_bytes());
    }

    pub fn set_background(out: &mut Vec<u8>, r: u8, g: u8, b: u8) {
        tag(out, kind::SET_BACKGROUND, &[r, g, b]);
    }

    pub fn unknown(out: &mut Vec<u8>, kind_byte: u8, data: &[u8]) {
        tag(out, kind_byte, data);
    }
}
