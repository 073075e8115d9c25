//! GLB container framing
//!
//! A GLB file is a 12-byte header followed by a JSON chunk and an optional
//! BIN chunk. Every chunk is padded to a 4-byte boundary: JSON with spaces,
//! BIN with zeros.

use crate::error::{CodecError, Result};

pub const GLB_MAGIC: &[u8; 4] = b"glTF";
pub const GLB_VERSION: u32 = 2;
pub const CHUNK_JSON: u32 = 0x4E4F534A; // "JSON"
pub const CHUNK_BIN: u32 = 0x004E4942; // "BIN\0"

const HEADER_LENGTH: usize = 12;
const CHUNK_HEADER_LENGTH: usize = 8;

/// Borrowed view of the chunks of a GLB file
#[derive(Debug, Clone, Copy)]
pub struct GlbChunks<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

/// Whether `data` starts with the GLB magic
pub fn is_glb(data: &[u8]) -> bool {
    data.len() >= 4 && &data[0..4] == GLB_MAGIC
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Split a GLB file into its JSON and BIN chunks
pub fn split(data: &[u8]) -> Result<GlbChunks<'_>> {
    if data.len() < HEADER_LENGTH {
        return Err(CodecError::InvalidGlb(
            "file too small for GLB header".to_string(),
        ));
    }
    if !is_glb(data) {
        return Err(CodecError::InvalidGlb("bad magic".to_string()));
    }

    let version = read_u32(data, 4);
    if version != GLB_VERSION {
        return Err(CodecError::InvalidGlb(format!(
            "unsupported container version {}",
            version
        )));
    }

    let length = read_u32(data, 8) as usize;
    if length > data.len() {
        return Err(CodecError::InvalidGlb(format!(
            "header declares {} bytes but file has {}",
            length,
            data.len()
        )));
    }

    let mut offset = HEADER_LENGTH;
    let mut json = None;
    let mut bin = None;

    while offset + CHUNK_HEADER_LENGTH <= length {
        let chunk_length = read_u32(data, offset) as usize;
        let chunk_type = read_u32(data, offset + 4);
        offset += CHUNK_HEADER_LENGTH;

        let end = offset
            .checked_add(chunk_length)
            .filter(|end| *end <= length)
            .ok_or_else(|| CodecError::InvalidGlb("chunk extends past end of file".to_string()))?;
        let chunk = &data[offset..end];

        match chunk_type {
            CHUNK_JSON if json.is_none() => {
                if offset != HEADER_LENGTH + CHUNK_HEADER_LENGTH {
                    return Err(CodecError::InvalidGlb(
                        "JSON chunk must come first".to_string(),
                    ));
                }
                json = Some(chunk);
            }
            CHUNK_BIN if bin.is_none() && json.is_some() => bin = Some(chunk),
            CHUNK_JSON | CHUNK_BIN => {
                return Err(CodecError::InvalidGlb(format!(
                    "unexpected chunk 0x{:08X} at offset {}",
                    chunk_type,
                    offset - CHUNK_HEADER_LENGTH
                )));
            }
            other => {
                tracing::debug!("Skipping unknown GLB chunk 0x{:08X}", other);
            }
        }

        offset = end;
    }

    let json = json.ok_or_else(|| CodecError::InvalidGlb("missing JSON chunk".to_string()))?;
    Ok(GlbChunks { json, bin })
}

/// Assemble a GLB file from JSON text and binary buffer data
pub fn assemble(json: &[u8], bin: Option<&[u8]>) -> Result<Vec<u8>> {
    // Pad JSON to 4-byte alignment
    let json_padding = (4 - (json.len() % 4)) % 4;
    let json_chunk_length = json.len() + json_padding;

    // Pad buffer to 4-byte alignment
    let bin_chunk_length = bin.map(|b| b.len() + (4 - (b.len() % 4)) % 4);

    let total_length = HEADER_LENGTH
        + CHUNK_HEADER_LENGTH
        + json_chunk_length
        + bin_chunk_length.map_or(0, |len| CHUNK_HEADER_LENGTH + len);

    if total_length > u32::MAX as usize {
        return Err(CodecError::InvalidGlb(format!(
            "{} bytes exceeds the 4 GiB container limit",
            total_length
        )));
    }

    let mut glb = Vec::with_capacity(total_length);

    // GLB header
    glb.extend_from_slice(GLB_MAGIC);
    glb.extend_from_slice(&GLB_VERSION.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    // JSON chunk
    glb.extend_from_slice(&(json_chunk_length as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(json);
    glb.resize(glb.len() + json_padding, b' ');

    // Binary chunk
    if let (Some(bin), Some(chunk_length)) = (bin, bin_chunk_length) {
        glb.extend_from_slice(&(chunk_length as u32).to_le_bytes());
        glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        glb.extend_from_slice(bin);
        glb.resize(glb.len() + chunk_length - bin.len(), 0);
    }

    Ok(glb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_pads_chunks() {
        let glb = assemble(b"{}", Some(&[1, 2, 3])).unwrap();

        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(glb.len() % 4, 0);
        assert_eq!(read_u32(&glb, 8) as usize, glb.len());
        // JSON chunk: "{}" + two spaces
        assert_eq!(read_u32(&glb, 12), 4);
        assert_eq!(&glb[20..24], b"{}  ");
        // BIN chunk: 3 bytes + one zero
        assert_eq!(read_u32(&glb, 24), 4);
        assert_eq!(&glb[32..36], &[1, 2, 3, 0]);
    }

    #[test]
    fn test_split_round_trip() {
        let glb = assemble(br#"{"asset":{"version":"2.0"}}"#, Some(&[9; 8])).unwrap();
        let chunks = split(&glb).unwrap();
        assert!(chunks.json.starts_with(br#"{"asset""#));
        assert_eq!(chunks.bin, Some(&[9u8; 8][..]));
    }

    #[test]
    fn test_split_without_bin() {
        let glb = assemble(b"{}", None).unwrap();
        let chunks = split(&glb).unwrap();
        assert!(chunks.bin.is_none());
    }

    #[test]
    fn test_split_rejects_truncated() {
        let mut glb = assemble(b"{}", Some(&[0; 16])).unwrap();
        glb.truncate(glb.len() - 4);
        assert!(matches!(split(&glb), Err(CodecError::InvalidGlb(_))));
    }

    #[test]
    fn test_split_rejects_wrong_version() {
        let mut glb = assemble(b"{}", None).unwrap();
        glb[4] = 1;
        assert!(split(&glb).is_err());
    }

    #[test]
    fn test_split_skips_unknown_chunks() {
        let mut glb = assemble(b"{}", None).unwrap();
        glb.extend_from_slice(&4u32.to_le_bytes());
        glb.extend_from_slice(&0x12345678u32.to_le_bytes());
        glb.extend_from_slice(&[0; 4]);
        let total = glb.len() as u32;
        glb[8..12].copy_from_slice(&total.to_le_bytes());

        let chunks = split(&glb).unwrap();
        assert_eq!(chunks.json, b"{}  ");
    }
}
