//! Vertex reconciliation
//!
//! COLLADA addresses positions, normals and texture coordinates through
//! independent index streams. The GPU wants one index per vertex. Each
//! face-corner is resolved to an output vertex keyed by its original position
//! index and its texcoord tuple (and, optionally, its normal tuple). The first
//! combination seen for a position keeps the position's own index; every other
//! combination (a UV seam) appends a duplicate vertex at the end of the
//! buffers.

use crate::error::{ImportError, ImportResult};
use crate::mesh::{AttributeBuffer, ReconciledMesh, NORMAL_STRIDE, POSITION_STRIDE, TEXCOORD_STRIDE};

use super::sources::AttributeSource;

/// A source together with the per-corner indices into it
#[derive(Debug, Clone, Copy)]
pub struct Channel<'a> {
    pub source: &'a AttributeSource,
    pub indices: &'a [u32],
}

impl<'a> Channel<'a> {
    pub fn new(source: &'a AttributeSource, indices: &'a [u32]) -> Self {
        Channel { source, indices }
    }

    fn element(&self, corner: usize, semantic: &'static str) -> ImportResult<&'a [f32]> {
        let index = self.indices[corner];
        self.source
            .element(index)
            .ok_or_else(|| ImportError::IndexOutOfRange {
                semantic,
                source_id: self.source.id.clone(),
                index,
                count: self.source.element_count(),
            })
    }
}

/// The channels of one face group
#[derive(Debug, Clone, Copy)]
pub struct CornerChannels<'a> {
    pub positions: Channel<'a>,
    pub normals: Option<Channel<'a>>,
    pub texcoords: Option<Channel<'a>>,
}

impl<'a> CornerChannels<'a> {
    fn check_lengths(&self) -> ImportResult<()> {
        let expected = self.positions.indices.len();
        for (name, channel) in [("NORMAL", &self.normals), ("TEXCOORD", &self.texcoords)] {
            if let Some(channel) = channel {
                if channel.indices.len() != expected {
                    return Err(ImportError::IndexStreamLengthMismatch {
                        details: format!(
                            "POSITION has {} entries, {} has {}",
                            expected,
                            name,
                            channel.indices.len()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// An output vertex already emitted for some original position
#[derive(Debug, Clone)]
struct EmittedVertex {
    texcoord: Vec<f32>,
    normal: Option<Vec<f32>>,
    index: u32,
}

/// Reconciles one geometry. Several face groups may be fed through the same
/// reconciler; they then share output buffers and split decisions.
pub struct Reconciler {
    vertices: AttributeBuffer,
    normals: AttributeBuffer,
    texcoords: AttributeBuffer,
    /// Original position index -> vertices emitted for it, in first-seen order
    registry: Vec<Vec<EmittedVertex>>,
    /// Output vertex -> whether a NORMAL channel supplied its normal
    supplied_normals: Vec<bool>,
    position_count: usize,
    split_normal_seams: bool,
}

impl Reconciler {
    /// Start with one output vertex per original position, zero normals and texcoords
    pub fn new(positions: &AttributeSource, split_normal_seams: bool) -> Self {
        let position_count = positions.element_count();
        let mut vertices = AttributeBuffer::new(POSITION_STRIDE);
        for index in 0..position_count as u32 {
            vertices.push(positions.element(index).unwrap_or(&[]));
        }

        Reconciler {
            vertices,
            normals: AttributeBuffer::zeroed(NORMAL_STRIDE, position_count),
            texcoords: AttributeBuffer::zeroed(TEXCOORD_STRIDE, position_count),
            registry: vec![Vec::new(); position_count],
            supplied_normals: vec![false; position_count],
            position_count,
            split_normal_seams,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.count()
    }

    /// Per output vertex, whether some face-corner supplied its normal
    pub fn supplied_normals(&self) -> &[bool] {
        &self.supplied_normals
    }

    /// Resolve every face-corner of one face group to an output vertex index
    pub fn add_corners(&mut self, channels: &CornerChannels<'_>) -> ImportResult<Vec<u32>> {
        channels.check_lengths()?;

        let corner_count = channels.positions.indices.len();
        let mut resolved = Vec::with_capacity(corner_count);
        for corner in 0..corner_count {
            let position = channels.positions.indices[corner];
            if position as usize >= self.position_count {
                return Err(ImportError::IndexOutOfRange {
                    semantic: "POSITION",
                    source_id: channels.positions.source.id.clone(),
                    index: position,
                    count: self.position_count,
                });
            }

            let normal = match &channels.normals {
                Some(channel) => Some(channel.element(corner, "NORMAL")?),
                None => None,
            };

            let index = match &channels.texcoords {
                Some(channel) => {
                    let texcoord = channel.element(corner, "TEXCOORD")?;
                    self.resolve(position, texcoord, normal)
                }
                None => self.resolve_untextured(position, normal),
            };
            resolved.push(index);
        }

        Ok(resolved)
    }

    fn resolve(&mut self, position: u32, texcoord: &[f32], normal: Option<&[f32]>) -> u32 {
        let split_normal_seams = self.split_normal_seams;
        let emitted = &self.registry[position as usize];

        if emitted.is_empty() {
            self.texcoords.set(position as usize, texcoord);
            self.supply_normal(position, normal);
            self.registry[position as usize].push(EmittedVertex {
                texcoord: texcoord.to_vec(),
                normal: normal.map(<[f32]>::to_vec),
                index: position,
            });
            return position;
        }

        // every component must match; a partial match is a different vertex
        let existing = emitted.iter().find(|e| {
            e.texcoord.as_slice() == texcoord
                && (!split_normal_seams || e.normal.as_deref() == normal)
        });
        if let Some(existing) = existing {
            let index = existing.index;
            self.supply_normal(index, normal);
            return index;
        }

        // UV seam: duplicate the position under a new index
        let canonical = self.registry[position as usize][0].index as usize;
        let position_data = self.vertices.get(position as usize).map(<[f32]>::to_vec).unwrap_or_default();
        let normal_data = match normal {
            Some(normal) => normal.to_vec(),
            None => self.normals.get(canonical).map(<[f32]>::to_vec).unwrap_or_default(),
        };

        let supplied = normal.is_some() || self.supplied_normals[canonical];
        let index = self.vertices.push(&position_data);
        self.normals.push(&normal_data);
        self.supplied_normals.push(supplied);
        self.texcoords.push(texcoord);
        debug_assert_eq!(self.vertices.count(), self.normals.count());
        debug_assert_eq!(self.vertices.count(), self.texcoords.count());

        self.registry[position as usize].push(EmittedVertex {
            texcoord: texcoord.to_vec(),
            normal: normal.map(<[f32]>::to_vec),
            index,
        });
        index
    }

    // Without texture coordinates the position index is used unchanged
    fn resolve_untextured(&mut self, position: u32, normal: Option<&[f32]>) -> u32 {
        self.supply_normal(position, normal);
        let emitted = &mut self.registry[position as usize];
        if emitted.is_empty() {
            emitted.push(EmittedVertex {
                texcoord: vec![0.0; TEXCOORD_STRIDE],
                normal: normal.map(<[f32]>::to_vec),
                index: position,
            });
        }
        position
    }

    // the first supplied normal of a vertex wins
    fn supply_normal(&mut self, index: u32, normal: Option<&[f32]>) {
        let index = index as usize;
        if let Some(normal) = normal {
            if !self.supplied_normals[index] {
                self.normals.set(index, normal);
                self.supplied_normals[index] = true;
            }
        }
    }

    /// Hand over the attribute buffers as a mesh with no indices yet
    pub fn finish(self) -> ReconciledMesh {
        ReconciledMesh {
            vertices: self.vertices,
            normals: self.normals,
            texcoords: self.texcoords,
            indices: Vec::new(),
            submeshes: Vec::new(),
        }
    }
}

/// Reconcile a single face group; the indices are the resolved face-corners
pub fn reconcile(channels: &CornerChannels<'_>, split_normal_seams: bool) -> ImportResult<ReconciledMesh> {
    let mut reconciler = Reconciler::new(channels.positions.source, split_normal_seams);
    let indices = reconciler.add_corners(channels)?;
    let mut mesh = reconciler.finish();
    mesh.indices = indices;
    Ok(mesh)
}
