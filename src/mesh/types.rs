//! Core mesh types: parallel attribute buffers over one index buffer

use serde::{Deserialize, Serialize};

pub const POSITION_STRIDE: usize = 3;
pub const NORMAL_STRIDE: usize = 3;
pub const TEXCOORD_STRIDE: usize = 2;

/// Flat per-vertex attribute data with a fixed number of components per vertex
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeBuffer {
    pub stride: usize,
    pub data: Vec<f32>,
}

impl AttributeBuffer {
    pub fn new(stride: usize) -> Self {
        Self { stride, data: Vec::new() }
    }

    /// Buffer of `count` zeroed elements
    pub fn zeroed(stride: usize, count: usize) -> Self {
        Self { stride, data: vec![0.0; stride * count] }
    }

    pub fn count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Components of element `index`
    pub fn get(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.stride)?;
        self.data.get(start..start + self.stride)
    }

    /// Append one element and return its index. Short input is zero-padded,
    /// extra components are dropped.
    pub fn push(&mut self, element: &[f32]) -> u32 {
        let index = self.count() as u32;
        self.data.extend((0..self.stride).map(|i| element.get(i).copied().unwrap_or(0.0)));
        index
    }

    /// Overwrite element `index`, zero-padding short input. Returns false when out of range.
    pub fn set(&mut self, index: usize, element: &[f32]) -> bool {
        let start = index * self.stride;
        match self.data.get_mut(start..start + self.stride) {
            Some(slot) => {
                for (i, value) in slot.iter_mut().enumerate() {
                    *value = element.get(i).copied().unwrap_or(0.0);
                }
                true
            }
            None => false,
        }
    }

    /// Grow with zeroed elements until the buffer holds `count` elements
    pub fn resize(&mut self, count: usize) {
        self.data.resize(count * self.stride, 0.0);
    }
}

/// Contiguous range of the index buffer drawn with one material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubMesh {
    pub material: Option<String>,
    #[serde(rename = "firstIndex")]
    pub first_index: usize,
    #[serde(rename = "indexCount")]
    pub index_count: usize,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

/// Single-indexed mesh: one index buffer over parallel position, normal and texcoord buffers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledMesh {
    pub vertices: AttributeBuffer,
    pub normals: AttributeBuffer,
    pub texcoords: AttributeBuffer,
    pub indices: Vec<u32>,
    #[serde(default)]
    pub submeshes: Vec<SubMesh>,
}

impl Default for ReconciledMesh {
    fn default() -> Self {
        Self {
            vertices: AttributeBuffer::new(POSITION_STRIDE),
            normals: AttributeBuffer::new(NORMAL_STRIDE),
            texcoords: AttributeBuffer::new(TEXCOORD_STRIDE),
            indices: Vec::new(),
            submeshes: Vec::new(),
        }
    }
}

impl ReconciledMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.count()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check the upload contract: equal attribute counts and every index in range
    pub fn validate(&self) -> Result<(), String> {
        if self.vertices.stride != POSITION_STRIDE
            || self.normals.stride != NORMAL_STRIDE
            || self.texcoords.stride != TEXCOORD_STRIDE
        {
            return Err(format!(
                "unexpected strides: vertices {}, normals {}, texcoords {}",
                self.vertices.stride, self.normals.stride, self.texcoords.stride
            ));
        }

        let count = self.vertices.count();
        if self.normals.count() != count || self.texcoords.count() != count {
            return Err(format!(
                "attribute counts differ: {} vertices, {} normals, {} texcoords",
                count,
                self.normals.count(),
                self.texcoords.count()
            ));
        }

        if let Some(&bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(format!("index {} out of range for {} vertices", bad, count));
        }

        Ok(())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut elements = self.vertices.data.chunks_exact(POSITION_STRIDE);
        let first = elements.next()?;
        let mut bounds = Bounds {
            min: [first[0], first[1], first[2]],
            max: [first[0], first[1], first[2]],
        };
        for p in elements {
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(p[axis]);
                bounds.max[axis] = bounds.max[axis].max(p[axis]);
            }
        }
        Some(bounds)
    }
}
