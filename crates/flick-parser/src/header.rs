//! Container header decoding.
//!
//! Layout: 3-byte signature (`FWS` uncompressed, `CWS` compressed),
//! version byte, declared total length (u32 LE), canvas rectangle as
//! four i32 LE values with the origin fixed at (0,0), frame rate as an
//! 8.8 fixed-point u16 LE, declared frame count (u16 LE).

use flick_core::{FlickError, FrameRate, Rect, Result, Vec2};
use std::io::Read;
use tracing::info;

/// Decoded stream header.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieHeader {
    pub version: u8,
    pub file_length: u32,
    pub canvas: Rect,
    pub frame_rate: FrameRate,
    pub frame_count: u16,
}

pub(crate) fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

impl MovieHeader {
    /// Decode a header from the start of `reader`.
    ///
    /// An unrecognized signature yields `FlickError::NotThisFormat`, a
    /// non-fatal result the caller may use to fall back to another
    /// handler. A recognized but compressed stream is a format error.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut signature = [0u8; 3];
        reader.read_exact(&mut signature)?;
        let compressed = match &signature {
            b"FWS" => false,
            b"CWS" => true,
            _ => return Err(FlickError::NotThisFormat),
        };

        let version = read_u8(reader)?;
        let file_length = read_u32(reader)?;
        if compressed {
            info!(version, file_length, "compressed flick stream");
            return Err(FlickError::Format(
                "compressed streams are not supported".to_string(),
            ));
        }
        info!(version, file_length, "uncompressed flick stream");

        let xmin = read_i32(reader)?;
        let ymin = read_i32(reader)?;
        let xmax = read_i32(reader)?;
        let ymax = read_i32(reader)?;
        let canvas = Rect::from_corners(
            Vec2::new(xmin as f32, ymin as f32),
            Vec2::new(xmax as f32, ymax as f32),
        );
        if !canvas.is_origin_anchored() {
            return Err(FlickError::Format(format!(
                "canvas origin must be (0,0), got ({},{})",
                xmin, ymin
            )));
        }
        if xmax < 0 || ymax < 0 {
            return Err(FlickError::Format(
                "negative canvas extent".to_string(),
            ));
        }

        let frame_rate = FrameRate::from_fixed_8_8(read_u16(reader)?);
        let frame_count = read_u16(reader)?;
        info!(%frame_rate, frame_count, "stream metadata");

        Ok(Self {
            version,
            file_length,
            canvas,
            frame_rate,
            frame_count,
        })
    }
}

/// Assemble header bytes for tests.
#[cfg(test)]
pub(crate) fn test_header_bytes(
    sig: &[u8; 3],
    rate_raw: u16,
    frame_count: u16,
    origin: (i32, i32),
) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(sig);
    bytes.push(6); // version
    bytes.extend_from_slice(&64u32.to_le_bytes()); // declared length
    bytes.extend_from_slice(&origin.0.to_le_bytes());
    bytes.extend_from_slice(&origin.1.to_le_bytes());
    bytes.extend_from_slice(&640i32.to_le_bytes());
    bytes.extend_from_slice(&480i32.to_le_bytes());
    bytes.extend_from_slice(&rate_raw.to_le_bytes());
    bytes.extend_from_slice(&frame_count.to_le_bytes());
    bytes
}
