//! Accessors: typed views over buffer view bytes

use crate::error::{CodecError, Result};
use crate::model::buffer::{BufferView, view_bytes};

/// Largest zero-filled payload a view-less accessor may decode to
pub const MAX_ZERO_FILLED_BYTES: usize = 1 << 28;

/// Component data type of an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            5120 => Some(Self::I8),
            5121 => Some(Self::U8),
            5122 => Some(Self::I16),
            5123 => Some(Self::U16),
            5125 => Some(Self::U32),
            5126 => Some(Self::F32),
            _ => None,
        }
    }

    pub fn to_gl(self) -> u32 {
        match self {
            Self::I8 => 5120,
            Self::U8 => 5121,
            Self::I16 => 5122,
            Self::U16 => 5123,
            Self::U32 => 5125,
            Self::F32 => 5126,
        }
    }

    /// Size in bytes of one component
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    pub fn is_unsigned_int(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32)
    }
}

/// Element shape of an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AccessorType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT2" => Some(Self::Mat2),
            "MAT3" => Some(Self::Mat3),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
            Self::Vec4 => "VEC4",
            Self::Mat2 => "MAT2",
            Self::Mat3 => "MAT3",
            Self::Mat4 => "MAT4",
        }
    }

    /// Number of components per element
    pub fn components(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }

    /// (columns, rows) for matrix types
    pub fn matrix_dims(self) -> Option<(usize, usize)> {
        match self {
            Self::Mat2 => Some((2, 2)),
            Self::Mat3 => Some((3, 3)),
            Self::Mat4 => Some((4, 4)),
            _ => None,
        }
    }
}

/// Sparse substitution applied on top of an accessor's dense data
#[derive(Debug, Clone, PartialEq)]
pub struct SparseAccessor {
    pub count: usize,
    pub indices_buffer_view: usize,
    pub indices_byte_offset: usize,
    pub indices_component_type: ComponentType,
    pub values_buffer_view: usize,
    pub values_byte_offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub name: Option<String>,
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub accessor_type: AccessorType,
    pub normalized: bool,
    pub count: usize,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub sparse: Option<SparseAccessor>,
}

impl Accessor {
    pub fn new(
        buffer_view: Option<usize>,
        component_type: ComponentType,
        accessor_type: AccessorType,
        count: usize,
    ) -> Self {
        Self {
            name: None,
            buffer_view,
            byte_offset: 0,
            component_type,
            accessor_type,
            normalized: false,
            count,
            min: Vec::new(),
            max: Vec::new(),
            sparse: None,
        }
    }

    /// Components per element
    pub fn components(&self) -> usize {
        self.accessor_type.components()
    }

    /// Byte size of one element, including matrix column padding
    pub fn element_size(&self) -> usize {
        let size = self.component_type.size();
        match self.accessor_type.matrix_dims() {
            Some((columns, rows)) => columns * align4(rows * size),
            None => self.components() * size,
        }
    }

    /// Byte offset of each component inside one element
    fn component_offsets(&self) -> Vec<usize> {
        let size = self.component_type.size();
        match self.accessor_type.matrix_dims() {
            Some((columns, rows)) => {
                let column_stride = align4(rows * size);
                (0..columns)
                    .flat_map(|c| (0..rows).map(move |r| c * column_stride + r * size))
                    .collect()
            }
            None => (0..self.components()).map(|c| c * size).collect(),
        }
    }

    /// Decode as floats, applying normalization to normalized integer data
    pub fn read_f32(
        &self,
        index: usize,
        views: &[BufferView],
        buffers: &[Vec<u8>],
    ) -> Result<Vec<f32>> {
        let component_type = self.component_type;
        let normalized = self.normalized;
        self.decode(index, views, buffers, |bytes| {
            component_to_f32(bytes, component_type, normalized)
        })
    }

    /// Decode as unsigned integers (indices, joints)
    pub fn read_u32(
        &self,
        index: usize,
        views: &[BufferView],
        buffers: &[Vec<u8>],
    ) -> Result<Vec<u32>> {
        if !self.component_type.is_unsigned_int() {
            return Err(CodecError::InvalidAccessor {
                accessor: index,
                reason: format!(
                    "expected unsigned integer components, got {:?}",
                    self.component_type
                ),
            });
        }
        let component_type = self.component_type;
        self.decode(index, views, buffers, |bytes| {
            component_to_u32(bytes, component_type)
        })
    }

    fn decode<T, F>(
        &self,
        index: usize,
        views: &[BufferView],
        buffers: &[Vec<u8>],
        read: F,
    ) -> Result<Vec<T>>
    where
        T: Copy + Default,
        F: Fn(&[u8]) -> T,
    {
        let components = self.components();
        let component_size = self.component_type.size();
        let element_size = self.element_size();
        let offsets = self.component_offsets();

        let mut out = Vec::new();

        if let Some(view_index) = self.buffer_view {
            let view = views
                .get(view_index)
                .ok_or_else(|| CodecError::out_of_range("buffer view", view_index, views.len()))?;
            let bytes = view_bytes(view_index, views, buffers)?;
            let stride = view.byte_stride.unwrap_or(element_size);
            if stride < element_size {
                return Err(CodecError::InvalidAccessor {
                    accessor: index,
                    reason: format!(
                        "byte stride {} is smaller than element size {}",
                        stride, element_size
                    ),
                });
            }

            if self.count > 0 {
                let end = stride
                    .checked_mul(self.count - 1)
                    .and_then(|n| n.checked_add(self.byte_offset))
                    .and_then(|n| n.checked_add(element_size))
                    .unwrap_or(usize::MAX);
                if end > bytes.len() {
                    return Err(CodecError::AccessorOutOfBounds {
                        accessor: index,
                        start: self.byte_offset,
                        end,
                        len: bytes.len(),
                    });
                }
            }

            out.reserve(self.count.saturating_mul(components));
            for i in 0..self.count {
                let base = self.byte_offset + i * stride;
                for offset in &offsets {
                    let at = base + offset;
                    out.push(read(&bytes[at..at + component_size]));
                }
            }
        } else {
            let size = self.count.checked_mul(element_size);
            if size.is_none_or(|size| size > MAX_ZERO_FILLED_BYTES) {
                return Err(CodecError::InvalidAccessor {
                    accessor: index,
                    reason: format!(
                        "{} elements without a buffer view exceed {} bytes",
                        self.count, MAX_ZERO_FILLED_BYTES
                    ),
                });
            }
            out.resize(self.count * components, T::default());
        }

        if let Some(sparse) = &self.sparse {
            self.apply_sparse(index, sparse, views, buffers, &mut out, &read)?;
        }

        Ok(out)
    }

    fn apply_sparse<T, F>(
        &self,
        index: usize,
        sparse: &SparseAccessor,
        views: &[BufferView],
        buffers: &[Vec<u8>],
        out: &mut [T],
        read: &F,
    ) -> Result<()>
    where
        T: Copy,
        F: Fn(&[u8]) -> T,
    {
        if !sparse.indices_component_type.is_unsigned_int() {
            return Err(CodecError::InvalidAccessor {
                accessor: index,
                reason: "sparse indices must be unsigned integers".to_string(),
            });
        }

        if sparse.count > self.count {
            return Err(CodecError::InvalidAccessor {
                accessor: index,
                reason: format!(
                    "sparse count {} exceeds accessor count {}",
                    sparse.count, self.count
                ),
            });
        }

        let components = self.components();
        let component_size = self.component_type.size();
        let element_size = self.element_size();
        let offsets = self.component_offsets();

        let index_size = sparse.indices_component_type.size();
        let index_bytes = view_bytes(sparse.indices_buffer_view, views, buffers)?;
        let index_end = sparse
            .count
            .checked_mul(index_size)
            .and_then(|n| n.checked_add(sparse.indices_byte_offset))
            .unwrap_or(usize::MAX);
        if index_end > index_bytes.len() {
            return Err(CodecError::AccessorOutOfBounds {
                accessor: index,
                start: sparse.indices_byte_offset,
                end: index_end,
                len: index_bytes.len(),
            });
        }

        let value_bytes = view_bytes(sparse.values_buffer_view, views, buffers)?;
        let value_end = sparse
            .count
            .checked_mul(element_size)
            .and_then(|n| n.checked_add(sparse.values_byte_offset))
            .unwrap_or(usize::MAX);
        if value_end > value_bytes.len() {
            return Err(CodecError::AccessorOutOfBounds {
                accessor: index,
                start: sparse.values_byte_offset,
                end: value_end,
                len: value_bytes.len(),
            });
        }

        for k in 0..sparse.count {
            let at = sparse.indices_byte_offset + k * index_size;
            let target = component_to_u32(
                &index_bytes[at..at + index_size],
                sparse.indices_component_type,
            ) as usize;
            if target >= self.count {
                return Err(CodecError::InvalidAccessor {
                    accessor: index,
                    reason: format!(
                        "sparse index {} out of range (count {})",
                        target, self.count
                    ),
                });
            }

            let base = sparse.values_byte_offset + k * element_size;
            for (c, offset) in offsets.iter().enumerate() {
                let at = base + offset;
                out[target * components + c] = read(&value_bytes[at..at + component_size]);
            }
        }

        Ok(())
    }
}

pub(crate) fn align4(n: usize) -> usize {
    (n + 3) & !3
}

fn component_to_f32(bytes: &[u8], component_type: ComponentType, normalized: bool) -> f32 {
    match component_type {
        ComponentType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        ComponentType::I8 => {
            let v = bytes[0] as i8 as f32;
            if normalized { (v / 127.0).max(-1.0) } else { v }
        }
        ComponentType::U8 => {
            let v = bytes[0] as f32;
            if normalized { v / 255.0 } else { v }
        }
        ComponentType::I16 => {
            let v = i16::from_le_bytes([bytes[0], bytes[1]]) as f32;
            if normalized { (v / 32767.0).max(-1.0) } else { v }
        }
        ComponentType::U16 => {
            let v = u16::from_le_bytes([bytes[0], bytes[1]]) as f32;
            if normalized { v / 65535.0 } else { v }
        }
        ComponentType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
    }
}

fn component_to_u32(bytes: &[u8], component_type: ComponentType) -> u32 {
    match component_type {
        ComponentType::U8 => bytes[0] as u32,
        ComponentType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
        ComponentType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        // Callers only pass unsigned component types
        ComponentType::I8 | ComponentType::I16 | ComponentType::F32 => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(buffer: usize, byte_offset: usize, byte_length: usize) -> BufferView {
        BufferView {
            name: None,
            buffer,
            byte_offset,
            byte_length,
            byte_stride: None,
            target: None,
        }
    }

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_read_vec3_tightly_packed() {
        let buffers = vec![f32_bytes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])];
        let views = vec![view(0, 0, 24)];
        let accessor = Accessor::new(Some(0), ComponentType::F32, AccessorType::Vec3, 2);

        let values = accessor.read_f32(0, &views, &buffers).unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_read_honours_stride_and_offset() {
        // Interleaved: [x y] [pad pad] repeated, reading starts at byte 4 of the view
        let buffers = vec![f32_bytes(&[
            0.0, 1.0, 2.0, 9.0, 9.0, 3.0, 4.0, 9.0, 9.0, 0.0,
        ])];
        let mut views = vec![view(0, 0, 40)];
        views[0].byte_stride = Some(16);
        let mut accessor = Accessor::new(Some(0), ComponentType::F32, AccessorType::Vec2, 2);
        accessor.byte_offset = 4;

        let values = accessor.read_f32(0, &views, &buffers).unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_normalized_integers() {
        let buffers = vec![vec![0u8, 255, 0x80, 0x7F]];
        let views = vec![view(0, 0, 4)];

        let mut unsigned = Accessor::new(Some(0), ComponentType::U8, AccessorType::Vec2, 1);
        unsigned.normalized = true;
        assert_eq!(unsigned.read_f32(0, &views, &buffers).unwrap(), vec![0.0, 1.0]);

        let mut signed = Accessor::new(Some(0), ComponentType::I8, AccessorType::Vec2, 1);
        signed.normalized = true;
        signed.byte_offset = 2;
        // -128 clamps to -1.0, 127 maps to 1.0
        assert_eq!(signed.read_f32(0, &views, &buffers).unwrap(), vec![-1.0, 1.0]);
    }

    #[test]
    fn test_mat2_byte_columns_are_padded() {
        // Two columns of two u8 components, each column padded to 4 bytes
        let buffers = vec![vec![1u8, 2, 0, 0, 3, 4, 0, 0]];
        let views = vec![view(0, 0, 8)];
        let accessor = Accessor::new(Some(0), ComponentType::U8, AccessorType::Mat2, 1);

        assert_eq!(accessor.element_size(), 8);
        assert_eq!(
            accessor.read_f32(0, &views, &buffers).unwrap(),
            vec![1.0, 2.0, 3.0, 4.0]
        );
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let buffers = vec![f32_bytes(&[1.0, 2.0, 3.0])];
        let views = vec![view(0, 0, 12)];
        let accessor = Accessor::new(Some(0), ComponentType::F32, AccessorType::Vec3, 2);

        assert!(matches!(
            accessor.read_f32(0, &views, &buffers),
            Err(CodecError::AccessorOutOfBounds { end: 24, len: 12, .. })
        ));
    }

    #[test]
    fn test_sparse_without_buffer_view() {
        // indices: u16 [1, 3]; values: f32 [5.0, 7.0]
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&3u16.to_le_bytes());
        data.extend_from_slice(&f32_bytes(&[5.0, 7.0]));
        let buffers = vec![data];
        let views = vec![view(0, 0, 4), view(0, 4, 8)];

        let mut accessor = Accessor::new(None, ComponentType::F32, AccessorType::Scalar, 4);
        accessor.sparse = Some(SparseAccessor {
            count: 2,
            indices_buffer_view: 0,
            indices_byte_offset: 0,
            indices_component_type: ComponentType::U16,
            values_buffer_view: 1,
            values_byte_offset: 0,
        });

        assert_eq!(
            accessor.read_f32(0, &views, &buffers).unwrap(),
            vec![0.0, 5.0, 0.0, 7.0]
        );
    }

    #[test]
    fn test_read_u32_rejects_floats() {
        let buffers = vec![f32_bytes(&[1.0])];
        let views = vec![view(0, 0, 4)];
        let accessor = Accessor::new(Some(0), ComponentType::F32, AccessorType::Scalar, 1);
        assert!(accessor.read_u32(0, &views, &buffers).is_err());
    }

    #[test]
    fn test_read_u16_indices() {
        let buffers = vec![[0u16, 1, 2, 65535]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect()];
        let views = vec![view(0, 0, 8)];
        let accessor = Accessor::new(Some(0), ComponentType::U16, AccessorType::Scalar, 4);
        assert_eq!(
            accessor.read_u32(0, &views, &buffers).unwrap(),
            vec![0, 1, 2, 65535]
        );
    }
}
