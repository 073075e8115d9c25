//! Buffer views

use crate::error::{CodecError, Result};

/// GPU binding hint of a buffer view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    ArrayBuffer,
    ElementArrayBuffer,
}

impl BufferTarget {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            34962 => Some(Self::ArrayBuffer),
            34963 => Some(Self::ElementArrayBuffer),
            _ => None,
        }
    }

    pub fn to_gl(self) -> u32 {
        match self {
            Self::ArrayBuffer => 34962,
            Self::ElementArrayBuffer => 34963,
        }
    }
}

/// A contiguous byte range of one buffer
#[derive(Debug, Clone, PartialEq)]
pub struct BufferView {
    pub name: Option<String>,
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<BufferTarget>,
}

impl BufferView {
    pub fn end(&self) -> usize {
        self.byte_offset.saturating_add(self.byte_length)
    }
}

/// Bytes covered by a buffer view, checked against the buffer length
pub(crate) fn view_bytes<'a>(
    index: usize,
    views: &[BufferView],
    buffers: &'a [Vec<u8>],
) -> Result<&'a [u8]> {
    let view = views
        .get(index)
        .ok_or_else(|| CodecError::out_of_range("buffer view", index, views.len()))?;
    let buffer = buffers
        .get(view.buffer)
        .ok_or_else(|| CodecError::out_of_range("buffer", view.buffer, buffers.len()))?;

    if view.end() > buffer.len() {
        return Err(CodecError::BufferViewOutOfBounds {
            view: index,
            buffer: view.buffer,
            start: view.byte_offset,
            end: view.end(),
            len: buffer.len(),
        });
    }

    Ok(&buffer[view.byte_offset..view.end()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_bytes_in_range() {
        let buffers = vec![vec![0u8, 1, 2, 3, 4, 5]];
        let views = vec![BufferView {
            name: None,
            buffer: 0,
            byte_offset: 2,
            byte_length: 3,
            byte_stride: None,
            target: None,
        }];
        assert_eq!(view_bytes(0, &views, &buffers).unwrap(), &[2, 3, 4]);
    }

    #[test]
    fn test_view_past_buffer_end() {
        let buffers = vec![vec![0u8; 4]];
        let views = vec![BufferView {
            name: None,
            buffer: 0,
            byte_offset: 2,
            byte_length: 4,
            byte_stride: None,
            target: None,
        }];
        assert!(matches!(
            view_bytes(0, &views, &buffers),
            Err(CodecError::BufferViewOutOfBounds { end: 6, len: 4, .. })
        ));
    }
}
