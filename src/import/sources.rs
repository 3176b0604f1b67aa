//! Attribute source table
//!
//! Parses `mesh/source` elements: the flat numeric array each accessor points
//! at, plus the accessor's element count and stride.

use std::collections::HashMap;

use crate::error::{Diagnostic, Diagnostics, ImportError, ImportResult};
use crate::parse_xml::{XmlIndex, XmlNode};

/// Flat numeric data with its declared layout
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSource {
    pub id: String,
    pub data: Vec<f32>,
    /// Element count declared on the data array
    pub declared_count: usize,
    /// Element count declared on the accessor
    pub vertex_count: usize,
    pub stride: usize,
}

impl AttributeSource {
    /// Number of whole elements actually present in `data`
    pub fn element_count(&self) -> usize {
        if self.stride == 0 {
            0
        } else {
            self.data.len() / self.stride
        }
    }

    /// All `stride` components of element `index`
    pub fn element(&self, index: u32) -> Option<&[f32]> {
        let start = (index as usize).checked_mul(self.stride)?;
        self.data.get(start..start + self.stride)
    }
}

/// Parse whitespace-separated floats. Any non-numeric token fails the block.
pub fn parse_float_block(text: &str, context: &str) -> ImportResult<Vec<f32>> {
    text.split_whitespace()
        .map(|token| {
            token.parse::<f32>().map_err(|_| ImportError::MalformedData {
                context: context.to_string(),
                token: token.to_string(),
                expected: "float",
            })
        })
        .collect()
}

/// Build a source from raw text and its declared counts.
/// A declared/parsed count mismatch is reported and the parsed data kept.
pub fn build_source(
    id: &str,
    text: &str,
    declared_count: Option<usize>,
    vertex_count: usize,
    stride: usize,
    diagnostics: &mut Diagnostics,
) -> ImportResult<AttributeSource> {
    let data = parse_float_block(text, id)?;

    let declared_count = match declared_count {
        Some(declared) => {
            if declared != data.len() {
                diagnostics.push(Diagnostic::DataCountMismatch {
                    source_id: id.to_string(),
                    declared,
                    parsed: data.len(),
                });
            }
            declared
        }
        None => data.len(),
    };

    Ok(AttributeSource {
        id: id.to_string(),
        data,
        declared_count,
        vertex_count,
        stride,
    })
}

/// All sources of one mesh, keyed by source id
#[derive(Debug, Default)]
pub struct SourceTable {
    sources: HashMap<String, AttributeSource>,
}

impl SourceTable {
    /// Parse every `source` child of a `mesh` element
    pub fn from_mesh(mesh: &XmlNode, index: &XmlIndex<'_>, diagnostics: &mut Diagnostics) -> ImportResult<Self> {
        let mut sources = HashMap::new();
        for source_node in mesh.children_named("source") {
            let source = parse_source(source_node, index, diagnostics)?;
            sources.insert(source.id.clone(), source);
        }
        Ok(SourceTable { sources })
    }

    /// Look up a source by id or `#id` reference
    pub fn get(&self, reference: &str) -> Option<&AttributeSource> {
        self.sources.get(reference.strip_prefix('#').unwrap_or(reference))
    }

    pub fn insert(&mut self, source: AttributeSource) {
        self.sources.insert(source.id.clone(), source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn parse_source(source: &XmlNode, index: &XmlIndex<'_>, diagnostics: &mut Diagnostics) -> ImportResult<AttributeSource> {
    let id = source
        .attr("id")
        .ok_or_else(|| ImportError::missing("source", "id attribute"))?;

    let accessor = source
        .child("technique_common")
        .and_then(|t| t.child("accessor"))
        .ok_or_else(|| ImportError::missing(format!("source id=\"{}\"", id), "technique_common/accessor"))?;

    // The accessor names its array by URI; fall back to the array embedded in this source
    let array = match accessor.attr("source") {
        Some(uri) => index.resolve(uri).ok_or_else(|| ImportError::unresolved(uri))?,
        None => source
            .children
            .iter()
            .find(|n| n.name == "float_array" || n.name == "int_array")
            .ok_or_else(|| ImportError::missing(format!("source id=\"{}\"", id), "float_array"))?,
    };

    let declared_count = parse_count_attr(array, "count")?;
    let vertex_count = parse_count_attr(accessor, "count")?.unwrap_or(0);
    let stride = parse_count_attr(accessor, "stride")?.unwrap_or(1);

    build_source(id, &array.text_content, declared_count, vertex_count, stride, diagnostics)
}

pub(crate) fn parse_count_attr(node: &XmlNode, name: &str) -> ImportResult<Option<usize>> {
    match node.attr(name) {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ImportError::MalformedData {
                context: format!("{}@{}", node.name, name),
                token: value.to_string(),
                expected: "integer",
            }),
        None => Ok(None),
    }
}
