//! Index stream extraction
//!
//! A face group stores one flat index list in which each face-corner is a
//! record of `max_offset + 1` indices. Each semantic reads its own index out
//! of every record at its offset.

use crate::error::{Diagnostic, Diagnostics, ImportError, ImportResult};
use crate::parse_xml::XmlNode;

use super::semantics::{InputDecl, ResolvedInputs, Semantic};
use super::sources::parse_count_attr;

/// Face-list element kinds that carry geometry
pub const FACE_GROUP_TAGS: &[&str] = &["polylist", "triangles", "polygons"];

/// Parse whitespace-separated non-negative integers
pub fn parse_index_block(text: &str, context: &str) -> ImportResult<Vec<u32>> {
    text.split_whitespace()
        .map(|token| {
            token.parse::<u32>().map_err(|_| ImportError::MalformedData {
                context: context.to_string(),
                token: token.to_string(),
                expected: "index",
            })
        })
        .collect()
}

/// Take every `width`-th index starting at `offset`
pub fn extract_stream(combined: &[u32], offset: usize, width: usize) -> Vec<u32> {
    combined
        .iter()
        .skip(offset)
        .step_by(width.max(1))
        .copied()
        .collect()
}

/// One face-list element: its inputs, polygon sizes and combined index list
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGroup {
    pub tag: String,
    pub material: Option<String>,
    pub inputs: Vec<InputDecl>,
    /// Corner count of each polygon; `None` means a plain triangle list
    pub vcount: Option<Vec<usize>>,
    pub indices: Vec<u32>,
}

impl FaceGroup {
    pub fn from_node(node: &XmlNode) -> ImportResult<Self> {
        let inputs = node
            .children_named("input")
            .map(InputDecl::from_node)
            .collect::<ImportResult<Vec<_>>>()?;
        let width = inputs.iter().map(|i| i.offset).max().unwrap_or(0) + 1;
        let context = node.name.as_str();

        let (vcount, indices) = match node.name.as_str() {
            "polygons" => {
                // one <p> per polygon
                let mut vcount = Vec::new();
                let mut indices = Vec::new();
                for p in node.children_named("p") {
                    let polygon = parse_index_block(&p.text_content, context)?;
                    vcount.push(polygon.len() / width);
                    indices.extend(polygon);
                }
                (Some(vcount), indices)
            }
            _ => {
                let indices = match node.child("p") {
                    Some(p) => parse_index_block(&p.text_content, context)?,
                    // a group with count="0" may omit <p>
                    None if parse_count_attr(node, "count")? == Some(0) => Vec::new(),
                    None => return Err(ImportError::missing(context, "p")),
                };
                let vcount = match node.child("vcount") {
                    Some(v) => Some(
                        parse_index_block(&v.text_content, "vcount")?
                            .into_iter()
                            .map(|n| n as usize)
                            .collect(),
                    ),
                    None => None,
                };
                (vcount, indices)
            }
        };

        Ok(FaceGroup {
            tag: node.name.clone(),
            material: node.attr("material").map(str::to_string),
            inputs,
            vcount,
            indices,
        })
    }

    /// Name used in diagnostics and errors
    pub fn label(&self) -> String {
        match &self.material {
            Some(material) => format!("{} material=\"{}\"", self.tag, material),
            None => self.tag.clone(),
        }
    }
}

/// Per-semantic index arrays of one face group, one entry per face-corner
#[derive(Debug, Clone, PartialEq)]
pub struct CornerStreams {
    pub positions: Vec<u32>,
    pub normals: Option<Vec<u32>>,
    pub texcoords: Option<Vec<u32>>,
}

impl CornerStreams {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// All present streams must have one entry per face-corner
    pub fn check_lengths(&self) -> ImportResult<()> {
        let expected = self.positions.len();
        for (name, stream) in [("NORMAL", &self.normals), ("TEXCOORD", &self.texcoords)] {
            if let Some(stream) = stream {
                if stream.len() != expected {
                    return Err(ImportError::IndexStreamLengthMismatch {
                        details: format!(
                            "POSITION has {} entries, {} has {}",
                            expected,
                            name,
                            stream.len()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Split the combined index list into per-semantic streams
pub fn extract_streams(group: &FaceGroup, resolved: &ResolvedInputs) -> ImportResult<CornerStreams> {
    let width = resolved.record_width();
    let stream_for = |semantic: Semantic| {
        resolved
            .binding(semantic)
            .map(|b| extract_stream(&group.indices, b.offset, width))
    };

    let streams = CornerStreams {
        positions: stream_for(Semantic::Position).unwrap_or_default(),
        normals: stream_for(Semantic::Normal),
        texcoords: stream_for(Semantic::Texcoord),
    };
    streams.check_lengths()?;

    if let Some(vcount) = &group.vcount {
        let corners: usize = vcount.iter().sum();
        if corners != streams.len() {
            return Err(ImportError::IndexStreamLengthMismatch {
                details: format!(
                    "vcount of {} declares {} corners, index list holds {}",
                    group.label(),
                    corners,
                    streams.len()
                ),
            });
        }
    }

    Ok(streams)
}

/// Fan-triangulate polygons: a polygon of n corners emits (c0, ci, ci+1) for i in 1..n-1.
/// Without `vcount` the corners are already a triangle list.
pub fn triangulate(corners: &[u32], vcount: Option<&[usize]>, diagnostics: &mut Diagnostics) -> Vec<u32> {
    let vcount = match vcount {
        Some(vcount) => vcount,
        None => return corners.to_vec(),
    };

    let mut triangles = Vec::with_capacity(corners.len() * 3);
    let mut start = 0;
    for (polygon, &n) in vcount.iter().enumerate() {
        let Some(ring) = corners.get(start..start + n) else {
            break;
        };
        start += n;
        if n < 3 {
            diagnostics.push(Diagnostic::DegeneratePolygon { polygon, corners: n });
            continue;
        }
        for i in 1..n - 1 {
            triangles.extend_from_slice(&[ring[0], ring[i], ring[i + 1]]);
        }
    }
    triangles
}
