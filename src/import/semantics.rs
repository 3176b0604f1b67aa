//! Semantic resolver
//!
//! Maps the `input` channels of a face group to concrete sources and
//! interleave offsets. The POSITION channel is usually declared on the mesh's
//! `vertices` element and referenced from the face group through a `VERTEX`
//! input; channels declared on `vertices` share that input's offset.

use crate::error::{Diagnostic, Diagnostics, ImportError, ImportResult};
use crate::parse_xml::XmlNode;

use super::sources::parse_count_attr;

/// Role of an attribute channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Texcoord,
    Other,
}

impl Semantic {
    /// Classify a semantic name; `VERTEX` is handled separately by the resolver
    pub fn from_name(name: &str) -> Semantic {
        match name {
            "POSITION" => Semantic::Position,
            "NORMAL" => Semantic::Normal,
            "TEXCOORD" => Semantic::Texcoord,
            _ => Semantic::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Semantic::Position => "POSITION",
            Semantic::Normal => "NORMAL",
            Semantic::Texcoord => "TEXCOORD",
            Semantic::Other => "OTHER",
        }
    }
}

/// One `input` element as declared in the document
#[derive(Debug, Clone, PartialEq)]
pub struct InputDecl {
    pub semantic: String,
    pub source: String,
    pub offset: usize,
    pub set: Option<usize>,
}

impl InputDecl {
    pub fn new(semantic: &str, source: &str, offset: usize) -> Self {
        InputDecl {
            semantic: semantic.to_string(),
            source: source.to_string(),
            offset,
            set: None,
        }
    }

    pub fn from_node(node: &XmlNode) -> ImportResult<Self> {
        let semantic = node
            .attr("semantic")
            .ok_or_else(|| ImportError::missing("input", "semantic attribute"))?;
        let source = node
            .attr("source")
            .ok_or_else(|| ImportError::missing("input", "source attribute"))?;
        Ok(InputDecl {
            semantic: semantic.to_string(),
            source: source.to_string(),
            offset: parse_count_attr(node, "offset")?.unwrap_or(0),
            set: parse_count_attr(node, "set")?,
        })
    }

    fn source_id(&self) -> &str {
        self.source.strip_prefix('#').unwrap_or(&self.source)
    }
}

/// The mesh's `vertices` element: an id plus the channels declared on it
#[derive(Debug, Clone, PartialEq)]
pub struct VertexChannels {
    pub id: String,
    pub inputs: Vec<InputDecl>,
}

impl VertexChannels {
    pub fn from_node(node: &XmlNode) -> ImportResult<Self> {
        let id = node
            .attr("id")
            .ok_or_else(|| ImportError::missing("vertices", "id attribute"))?;
        let inputs = node
            .children_named("input")
            .map(InputDecl::from_node)
            .collect::<ImportResult<Vec<_>>>()?;
        Ok(VertexChannels { id: id.to_string(), inputs })
    }
}

/// A channel bound to its source and interleave offset
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticBinding {
    pub semantic: Semantic,
    pub source_id: String,
    pub offset: usize,
    pub set: Option<usize>,
}

/// Bindings of one face group and the width of its interleaved index record
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInputs {
    pub bindings: Vec<SemanticBinding>,
    pub max_offset: usize,
}

impl ResolvedInputs {
    /// Number of indices per face-corner record
    pub fn record_width(&self) -> usize {
        self.max_offset + 1
    }

    pub fn binding(&self, semantic: Semantic) -> Option<&SemanticBinding> {
        self.bindings.iter().find(|b| b.semantic == semantic)
    }
}

/// Resolve the inputs of one face group.
///
/// Every declared input occupies its offset in the index record, including
/// channels that are skipped, so `max_offset` covers all of them.
pub fn resolve_inputs(
    face_group: &str,
    inputs: &[InputDecl],
    vertices: Option<&VertexChannels>,
    diagnostics: &mut Diagnostics,
) -> ImportResult<ResolvedInputs> {
    let mut bindings: Vec<SemanticBinding> = Vec::new();
    let max_offset = inputs.iter().map(|i| i.offset).max().unwrap_or(0);

    for input in inputs {
        if input.semantic == "VERTEX" {
            let vertices = match vertices {
                Some(v) if v.id == input.source_id() => v,
                _ => return Err(ImportError::unresolved(input.source.clone())),
            };
            for vertex_input in &vertices.inputs {
                bind(&mut bindings, vertex_input, input.offset, diagnostics);
            }
        } else {
            bind(&mut bindings, input, input.offset, diagnostics);
        }
    }

    if !bindings.iter().any(|b| b.semantic == Semantic::Position) {
        return Err(ImportError::MissingPositionChannel {
            face_group: face_group.to_string(),
        });
    }

    Ok(ResolvedInputs { bindings, max_offset })
}

fn bind(bindings: &mut Vec<SemanticBinding>, input: &InputDecl, offset: usize, diagnostics: &mut Diagnostics) {
    let semantic = Semantic::from_name(&input.semantic);
    if semantic == Semantic::Other {
        diagnostics.push_once(Diagnostic::UnsupportedSemantic {
            semantic: input.semantic.clone(),
            source_id: input.source_id().to_string(),
        });
        return;
    }

    let binding = SemanticBinding {
        semantic,
        source_id: input.source_id().to_string(),
        offset,
        set: input.set,
    };

    // one channel per semantic; for TEXCOORD the lowest set wins, otherwise the first declared
    let skipped = match bindings.iter().position(|b| b.semantic == semantic) {
        None => {
            bindings.push(binding);
            return;
        }
        Some(i) => {
            let existing = &mut bindings[i];
            let lower_set = semantic == Semantic::Texcoord
                && matches!((binding.set, existing.set), (Some(new), Some(old)) if new < old);
            if lower_set {
                std::mem::replace(existing, binding)
            } else {
                binding
            }
        }
    };

    let name = match skipped.set {
        Some(set) => format!("{} (set {})", semantic.as_str(), set),
        None => semantic.as_str().to_string(),
    };
    diagnostics.push_once(Diagnostic::UnsupportedSemantic {
        semantic: name,
        source_id: skipped.source_id,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertices() -> VertexChannels {
        VertexChannels {
            id: "cube-vertices".to_string(),
            inputs: vec![InputDecl::new("POSITION", "#cube-positions", 0)],
        }
    }

    #[test]
    fn test_semantic_from_name() {
        assert_eq!(Semantic::from_name("POSITION"), Semantic::Position);
        assert_eq!(Semantic::from_name("NORMAL"), Semantic::Normal);
        assert_eq!(Semantic::from_name("TEXCOORD"), Semantic::Texcoord);
        assert_eq!(Semantic::from_name("COLOR"), Semantic::Other);
        assert_eq!(Semantic::from_name("position"), Semantic::Other);
    }

    #[test]
    fn test_vertex_indirection_and_offsets() {
        let inputs = vec![
            InputDecl::new("VERTEX", "#cube-vertices", 0),
            InputDecl::new("NORMAL", "#cube-normals", 1),
            InputDecl::new("TEXCOORD", "#cube-map", 2),
        ];
        let mut diagnostics = Diagnostics::new();
        let resolved = resolve_inputs("polylist", &inputs, Some(&vertices()), &mut diagnostics).unwrap();
        assert_eq!(resolved.max_offset, 2);
        assert_eq!(resolved.record_width(), 3);
        let position = resolved.binding(Semantic::Position).unwrap();
        assert_eq!(position.source_id, "cube-positions");
        assert_eq!(position.offset, 0);
        assert_eq!(resolved.binding(Semantic::Texcoord).unwrap().offset, 2);
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn test_shared_offsets() {
        let inputs = vec![
            InputDecl::new("VERTEX", "#cube-vertices", 0),
            InputDecl::new("NORMAL", "#cube-normals", 0),
        ];
        let resolved = resolve_inputs("triangles", &inputs, Some(&vertices()), &mut Diagnostics::new()).unwrap();
        assert_eq!(resolved.max_offset, 0);
        assert_eq!(resolved.record_width(), 1);
    }

    #[test]
    fn test_skipped_channel_keeps_its_slot() {
        let inputs = vec![
            InputDecl::new("VERTEX", "#cube-vertices", 0),
            InputDecl::new("NORMAL", "#cube-normals", 1),
            InputDecl::new("COLOR", "#cube-colors", 2),
        ];
        let mut diagnostics = Diagnostics::new();
        let resolved = resolve_inputs("polylist", &inputs, Some(&vertices()), &mut diagnostics).unwrap();
        assert_eq!(resolved.record_width(), 3);
        assert_eq!(resolved.bindings.len(), 2);
        assert_eq!(
            diagnostics.entries(),
            &[Diagnostic::UnsupportedSemantic {
                semantic: "COLOR".to_string(),
                source_id: "cube-colors".to_string(),
            }]
        );
    }

    #[test]
    fn test_second_texcoord_set_skipped() {
        let mut second = InputDecl::new("TEXCOORD", "#cube-map-1", 2);
        second.set = Some(1);
        let inputs = vec![
            InputDecl::new("VERTEX", "#cube-vertices", 0),
            InputDecl::new("TEXCOORD", "#cube-map-0", 1),
            second,
        ];
        let mut diagnostics = Diagnostics::new();
        let resolved = resolve_inputs("polylist", &inputs, Some(&vertices()), &mut diagnostics).unwrap();
        assert_eq!(resolved.binding(Semantic::Texcoord).unwrap().source_id, "cube-map-0");
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[test]
    fn test_lowest_texcoord_set_wins_regardless_of_order() {
        let mut second = InputDecl::new("TEXCOORD", "#cube-map-1", 1);
        second.set = Some(1);
        let mut first = InputDecl::new("TEXCOORD", "#cube-map-0", 2);
        first.set = Some(0);
        let inputs = vec![InputDecl::new("VERTEX", "#cube-vertices", 0), second, first];

        let mut diagnostics = Diagnostics::new();
        let resolved = resolve_inputs("polylist", &inputs, Some(&vertices()), &mut diagnostics).unwrap();
        let texcoord = resolved.binding(Semantic::Texcoord).unwrap();
        assert_eq!(texcoord.source_id, "cube-map-0");
        assert_eq!(texcoord.offset, 2);
        assert_eq!(resolved.record_width(), 3);
        assert_eq!(
            diagnostics.entries(),
            &[Diagnostic::UnsupportedSemantic {
                semantic: "TEXCOORD (set 1)".to_string(),
                source_id: "cube-map-1".to_string(),
            }]
        );
    }

    #[test]
    fn test_vertices_channel_reported_once_across_groups() {
        let mut vertices = vertices();
        vertices.inputs.push(InputDecl::new("COLOR", "#cube-colors", 0));
        let inputs = vec![InputDecl::new("VERTEX", "#cube-vertices", 0)];

        let mut diagnostics = Diagnostics::new();
        for group in ["triangles", "polylist"] {
            resolve_inputs(group, &inputs, Some(&vertices), &mut diagnostics).unwrap();
        }
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[test]
    fn test_missing_position_is_fatal() {
        let inputs = vec![InputDecl::new("NORMAL", "#cube-normals", 0)];
        let err = resolve_inputs("polylist", &inputs, Some(&vertices()), &mut Diagnostics::new()).unwrap_err();
        assert_eq!(
            err,
            ImportError::MissingPositionChannel {
                face_group: "polylist".to_string()
            }
        );
    }

    #[test]
    fn test_vertex_input_must_name_vertices() {
        let inputs = vec![InputDecl::new("VERTEX", "#other-vertices", 0)];
        let err = resolve_inputs("polylist", &inputs, Some(&vertices()), &mut Diagnostics::new()).unwrap_err();
        assert_eq!(err, ImportError::unresolved("#other-vertices"));
    }
}
