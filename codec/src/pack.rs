//! Binary buffer packing with automatic alignment and accessor creation
//!
//! Every `pack_*` call appends one buffer view (aligned to 4 bytes) and,
//! except for raw bytes, one accessor over it. Returned indices are positions
//! in the builder's view and accessor lists, which become the document's
//! lists when the flattener is done.

use glam::Mat4;

use crate::model::accessor::align4;
use crate::model::{Accessor, AccessorType, BufferTarget, BufferView, ComponentType};

/// Compute the component-wise bounds of fixed-width float elements
pub fn compute_bounds<const N: usize>(data: &[[f32; N]]) -> (Vec<f64>, Vec<f64>) {
    let mut min = [f32::MAX; N];
    let mut max = [f32::MIN; N];

    for item in data {
        for i in 0..N {
            min[i] = min[i].min(item[i]);
            max[i] = max[i].max(item[i]);
        }
    }

    (
        min.iter().map(|&v| f64::from(v)).collect(),
        max.iter().map(|&v| f64::from(v)).collect(),
    )
}

/// Pad buffer to a 4-byte boundary
pub fn align_buffer(buffer: &mut Vec<u8>) {
    buffer.resize(align4(buffer.len()), 0);
}

/// Builder for a single binary buffer
#[derive(Debug, Default)]
pub struct BufferBuilder {
    buffer: Vec<u8>,
    views: Vec<BufferView>,
    accessors: Vec<Accessor>,
}

impl BufferBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the binary buffer data
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    pub fn views(&self) -> &[BufferView] {
        &self.views
    }

    pub fn accessors(&self) -> &[Accessor] {
        &self.accessors
    }

    /// Consume the builder, returning buffer bytes, views and accessors
    pub fn finish(self) -> (Vec<u8>, Vec<BufferView>, Vec<Accessor>) {
        (self.buffer, self.views, self.accessors)
    }

    /// Pack Vec3 positions with bounds calculation
    pub fn pack_positions(&mut self, positions: &[[f32; 3]]) -> usize {
        let index = self.pack_vec3(positions);
        let (min, max) = compute_bounds(positions);
        let accessor = &mut self.accessors[index];
        accessor.min = min;
        accessor.max = max;
        index
    }

    /// Pack Vec3 data (normals, translations, scales, morph deltas)
    pub fn pack_vec3(&mut self, data: &[[f32; 3]]) -> usize {
        self.push_accessor(
            bytemuck::cast_slice(data),
            ComponentType::F32,
            AccessorType::Vec3,
            data.len(),
            Some(BufferTarget::ArrayBuffer),
        )
    }

    /// Pack Vec2 data (UVs)
    pub fn pack_vec2(&mut self, data: &[[f32; 2]]) -> usize {
        self.push_accessor(
            bytemuck::cast_slice(data),
            ComponentType::F32,
            AccessorType::Vec2,
            data.len(),
            Some(BufferTarget::ArrayBuffer),
        )
    }

    /// Pack Vec4 data (colors, tangents, weights)
    pub fn pack_vec4(&mut self, data: &[[f32; 4]]) -> usize {
        self.push_accessor(
            bytemuck::cast_slice(data),
            ComponentType::F32,
            AccessorType::Vec4,
            data.len(),
            Some(BufferTarget::ArrayBuffer),
        )
    }

    /// Pack Vec4 keyframe values (rotations); no GPU target
    pub fn pack_keyframes_vec4(&mut self, data: &[[f32; 4]]) -> usize {
        self.push_accessor(
            bytemuck::cast_slice(data),
            ComponentType::F32,
            AccessorType::Vec4,
            data.len(),
            None,
        )
    }

    /// Pack Vec3 keyframe values (translations, scales); no GPU target
    pub fn pack_keyframes_vec3(&mut self, data: &[[f32; 3]]) -> usize {
        self.push_accessor(
            bytemuck::cast_slice(data),
            ComponentType::F32,
            AccessorType::Vec3,
            data.len(),
            None,
        )
    }

    /// Pack scalar floats (morph weights keyframes)
    pub fn pack_scalars(&mut self, data: &[f32]) -> usize {
        self.push_accessor(
            bytemuck::cast_slice(data),
            ComponentType::F32,
            AccessorType::Scalar,
            data.len(),
            None,
        )
    }

    /// Pack scalar floats with min/max (animation input times)
    pub fn pack_scalars_with_bounds(&mut self, data: &[f32]) -> usize {
        let index = self.pack_scalars(data);
        let min = data.iter().copied().fold(f32::MAX, f32::min);
        let max = data.iter().copied().fold(f32::MIN, f32::max);
        let accessor = &mut self.accessors[index];
        accessor.min = vec![f64::from(min)];
        accessor.max = vec![f64::from(max)];
        index
    }

    /// Pack joint indices, as u8 when every index fits
    pub fn pack_joints(&mut self, joints: &[[u16; 4]]) -> usize {
        let fits_u8 = joints.iter().flatten().all(|&j| j <= u16::from(u8::MAX));
        if fits_u8 {
            let narrow: Vec<u8> = joints.iter().flatten().map(|&j| j as u8).collect();
            self.push_accessor(
                &narrow,
                ComponentType::U8,
                AccessorType::Vec4,
                joints.len(),
                Some(BufferTarget::ArrayBuffer),
            )
        } else {
            self.push_accessor(
                bytemuck::cast_slice(joints),
                ComponentType::U16,
                AccessorType::Vec4,
                joints.len(),
                Some(BufferTarget::ArrayBuffer),
            )
        }
    }

    /// Pack triangle indices, as u16 when every index fits
    ///
    /// The largest value of each width is reserved for primitive restart.
    pub fn pack_indices(&mut self, indices: &[u32]) -> usize {
        let fits_u16 = indices.iter().all(|&i| i < u32::from(u16::MAX));
        if fits_u16 {
            let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
            self.push_accessor(
                bytemuck::cast_slice(&narrow),
                ComponentType::U16,
                AccessorType::Scalar,
                indices.len(),
                Some(BufferTarget::ElementArrayBuffer),
            )
        } else {
            self.push_accessor(
                bytemuck::cast_slice(indices),
                ComponentType::U32,
                AccessorType::Scalar,
                indices.len(),
                Some(BufferTarget::ElementArrayBuffer),
            )
        }
    }

    /// Pack 4x4 matrices (inverse bind matrices)
    pub fn pack_mat4(&mut self, matrices: &[Mat4]) -> usize {
        let columns: Vec<[f32; 16]> = matrices.iter().map(Mat4::to_cols_array).collect();
        self.push_accessor(
            bytemuck::cast_slice(&columns),
            ComponentType::F32,
            AccessorType::Mat4,
            matrices.len(),
            None,
        )
    }

    /// Pack raw bytes (encoded images), returning the buffer view index
    pub fn pack_bytes(&mut self, data: &[u8]) -> usize {
        self.push_view(data, None)
    }

    fn push_view(&mut self, bytes: &[u8], target: Option<BufferTarget>) -> usize {
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        self.views.push(BufferView {
            name: None,
            buffer: 0,
            byte_offset: offset,
            byte_length: bytes.len(),
            byte_stride: None,
            target,
        });
        align_buffer(&mut self.buffer);
        self.views.len() - 1
    }

    fn push_accessor(
        &mut self,
        bytes: &[u8],
        component_type: ComponentType,
        accessor_type: AccessorType,
        count: usize,
        target: Option<BufferTarget>,
    ) -> usize {
        let view = self.push_view(bytes, target);
        self.accessors
            .push(Accessor::new(Some(view), component_type, accessor_type, count));
        self.accessors.len() - 1
    }
}
