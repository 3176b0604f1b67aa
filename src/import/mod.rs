//! COLLADA geometry import
//!
//! Converts `library_geometries/geometry/mesh` elements into single-indexed
//! meshes ready for GPU upload.
//!
//! # Submodules
//! - `sources` - Attribute source table (numeric arrays + accessors)
//! - `semantics` - Input channel resolution and interleave offsets
//! - `indices` - Face groups and per-semantic index stream extraction
//! - `reconcile` - Vertex reconciliation (UV seam splitting)
//! - `normals` - Normal synthesis from triangle geometry

pub mod sources;
pub mod semantics;
pub mod indices;
pub mod reconcile;
pub mod normals;

use std::path::Path;
use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::error::{Diagnostic, Diagnostics, ImportError, ImportResult};
use crate::mesh::{ReconciledMesh, SubMesh};
use crate::options::{ImportOptions, NormalMode};
use crate::parse_xml::{parse_xml_file, parse_xml_str, XmlIndex, XmlNode};

pub use indices::{extract_stream, extract_streams, triangulate, CornerStreams, FaceGroup, FACE_GROUP_TAGS};
pub use normals::{compute_normals, invert_normals};
pub use reconcile::{reconcile, Channel, CornerChannels, Reconciler};
pub use semantics::{resolve_inputs, InputDecl, ResolvedInputs, Semantic, SemanticBinding, VertexChannels};
pub use sources::{build_source, parse_float_block, AttributeSource, SourceTable};

/// A geometry element whose import failed; nothing was published for it
#[derive(Debug, Clone, PartialEq)]
pub struct ImportFailure {
    pub name: String,
    pub geometry_id: Option<String>,
    pub error: ImportError,
}

/// Result of importing one document
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Successfully imported models in document order
    pub models: IndexMap<String, ReconciledMesh>,
    /// Recoverable conditions per model name (failed models included)
    pub diagnostics: IndexMap<String, Vec<Diagnostic>>,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn model(&self, name: &str) -> Option<&ReconciledMesh> {
        self.models.get(name)
    }

    pub fn diagnostics_for(&self, name: &str) -> &[Diagnostic] {
        self.diagnostics.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Parse a `.dae` file and import all of its geometries
pub fn import_file<P: AsRef<Path>>(path: P, options: &ImportOptions) -> anyhow::Result<ImportReport> {
    let root = parse_xml_file(path)?;
    Ok(load_models(&root, options))
}

/// Import all geometries of an in-memory COLLADA document
pub fn import_str(xml: &str, options: &ImportOptions) -> anyhow::Result<ImportReport> {
    let root = parse_xml_str(xml)?;
    Ok(load_models(&root, options))
}

/// Import every `geometry` under `library_geometries`. Each geometry is
/// imported on its own; a fatal error only drops that geometry.
pub fn load_models(root: &XmlNode, options: &ImportOptions) -> ImportReport {
    let total_start = Instant::now();
    let profile = std::env::var("PROFILE_TIMING").is_ok();

    let index_start = Instant::now();
    let index = XmlIndex::build(root);
    let index_time = index_start.elapsed();

    let geometries: Vec<&XmlNode> = root
        .descendants_named("library_geometries")
        .into_iter()
        .flat_map(|library| library.children_named("geometry"))
        .collect();

    if geometries.is_empty() {
        log::info!("document has no library_geometries/geometry elements");
    }

    // Geometries share no state, so they import in parallel; collect keeps document order
    let total = geometries.len();
    let results: Vec<(String, Option<String>, ImportResult<Option<ReconciledMesh>>, Vec<Diagnostic>)> = geometries
        .par_iter()
        .enumerate()
        .map(|(i, geometry)| {
            let name = options.model_name_for(i, total);
            let geometry_id = geometry.attr("id").map(str::to_string);
            let mut diagnostics = Diagnostics::new();
            let result = import_geometry(geometry, &index, options, &mut diagnostics);
            (name, geometry_id, result, diagnostics.into_vec())
        })
        .collect();

    let mut report = ImportReport::default();
    for (name, geometry_id, result, diagnostics) in results {
        match result {
            Ok(Some(mesh)) => {
                log::debug!(
                    "imported '{}': {} vertices, {} indices",
                    name,
                    mesh.vertex_count(),
                    mesh.indices.len()
                );
                report.models.insert(name.clone(), mesh);
            }
            Ok(None) => {}
            Err(error) => {
                log::warn!("geometry '{}' failed to import: {}", name, error);
                report.failures.push(ImportFailure {
                    name: name.clone(),
                    geometry_id,
                    error,
                });
            }
        }
        if !diagnostics.is_empty() {
            report.diagnostics.insert(name, diagnostics);
        }
    }

    if profile {
        log::debug!("=== Import Timing Profile ===");
        log::debug!("Id index ({} ids): {:.2}ms", index.len(), index_time.as_secs_f64() * 1000.0);
        log::debug!(
            "{} geometries ({} failed): {:.2}ms",
            total,
            report.failures.len(),
            total_start.elapsed().as_secs_f64() * 1000.0
        );
    }

    report
}

/// Import one `geometry` element. Returns `Ok(None)` for geometry kinds without a mesh.
pub fn import_geometry(
    geometry: &XmlNode,
    index: &XmlIndex<'_>,
    options: &ImportOptions,
    diagnostics: &mut Diagnostics,
) -> ImportResult<Option<ReconciledMesh>> {
    match geometry.child("mesh") {
        Some(mesh) => import_mesh(mesh, index, options, diagnostics).map(Some),
        None => {
            diagnostics.push(Diagnostic::SkippedGeometry {
                geometry_id: geometry.attr("id").unwrap_or("").to_string(),
                reason: "no <mesh> element".to_string(),
            });
            Ok(None)
        }
    }
}

/// Run the full pipeline on one `mesh` element
pub fn import_mesh(
    mesh: &XmlNode,
    index: &XmlIndex<'_>,
    options: &ImportOptions,
    diagnostics: &mut Diagnostics,
) -> ImportResult<ReconciledMesh> {
    let sources = SourceTable::from_mesh(mesh, index, diagnostics)?;
    let vertices = mesh.child("vertices").map(VertexChannels::from_node).transpose()?;

    let mut groups = Vec::new();
    for node in &mesh.children {
        if FACE_GROUP_TAGS.contains(&node.name.as_str()) {
            let group = FaceGroup::from_node(node)?;
            let resolved = resolve_inputs(&group.label(), &group.inputs, vertices.as_ref(), diagnostics)?;
            let streams = extract_streams(&group, &resolved)?;
            groups.push((group, resolved, streams));
        } else if matches!(node.name.as_str(), "lines" | "linestrips" | "trifans" | "tristrips") {
            log::debug!("skipping unsupported primitive <{}>", node.name);
        }
    }

    let position_source_id = match groups.first() {
        Some((_, resolved, _)) => resolved.binding(Semantic::Position).map(|b| b.source_id.clone()),
        None => vertices
            .as_ref()
            .and_then(|v| v.inputs.iter().find(|i| i.semantic == "POSITION"))
            .map(|i| i.source.trim_start_matches('#').to_string()),
    }
    .ok_or_else(|| ImportError::MissingPositionChannel {
        face_group: "mesh".to_string(),
    })?;
    let positions = lookup(&sources, &position_source_id)?;

    let mut reconciler = reconcile::Reconciler::new(positions, options.split_normal_seams);
    let mut indices = Vec::new();
    let mut submeshes = Vec::new();
    let mut has_normals = false;
    let mut lacks_normals = false;
    let mut is_triangle_list = true;

    for (group, resolved, streams) in &groups {
        let channels = corner_channels(&sources, resolved, streams, &position_source_id)?;
        has_normals |= channels.normals.is_some();
        lacks_normals |= channels.normals.is_none();

        let corners = reconciler.add_corners(&channels)?;
        let group_indices = if options.triangulate {
            triangulate(&corners, group.vcount.as_deref(), diagnostics)
        } else {
            if let Some(vcount) = &group.vcount {
                is_triangle_list &= vcount.iter().all(|&n| n == 3);
            }
            corners
        };

        submeshes.push(SubMesh {
            material: group.material.clone(),
            first_index: indices.len(),
            index_count: group_indices.len(),
        });
        indices.extend(group_indices);
    }

    let supplied_normals = reconciler.supplied_normals().to_vec();
    let mut result = reconciler.finish();
    result.indices = indices;
    result.submeshes = submeshes;

    let synthesize = match options.normals {
        NormalMode::Always => true,
        NormalMode::Auto => !has_normals || options.invert_normals,
        NormalMode::Never => false,
    };
    // groups without a NORMAL channel next to groups with one
    let fill_gaps = options.normals == NormalMode::Auto && has_normals && lacks_normals;

    if synthesize || fill_gaps {
        if !is_triangle_list {
            return Err(ImportError::NotTriangleList { len: result.indices.len() });
        }
        let computed = compute_normals(&result.vertices, &result.indices, options.invert_normals)?;
        if synthesize {
            result.normals = computed;
        } else {
            for (vertex, _) in supplied_normals.iter().enumerate().filter(|(_, supplied)| !**supplied) {
                if let Some(normal) = computed.get(vertex) {
                    result.normals.set(vertex, normal);
                }
            }
        }
    } else if options.invert_normals {
        invert_normals(&mut result.normals);
    }

    result
        .validate()
        .map_err(|details| ImportError::IndexStreamLengthMismatch { details })?;
    Ok(result)
}

fn lookup<'a>(sources: &'a SourceTable, id: &str) -> ImportResult<&'a AttributeSource> {
    sources
        .get(id)
        .ok_or_else(|| ImportError::unresolved(format!("#{}", id)))
}

fn corner_channels<'a>(
    sources: &'a SourceTable,
    resolved: &ResolvedInputs,
    streams: &'a CornerStreams,
    position_source_id: &str,
) -> ImportResult<CornerChannels<'a>> {
    // all face groups of a mesh index the same position array
    if let Some(binding) = resolved.binding(Semantic::Position) {
        if binding.source_id != position_source_id {
            return Err(ImportError::unresolved(format!("#{}", binding.source_id)));
        }
    }

    let channel = |semantic: Semantic, stream: &'a Option<Vec<u32>>| -> ImportResult<Option<Channel<'a>>> {
        match (resolved.binding(semantic), stream) {
            (Some(binding), Some(stream)) => Ok(Some(Channel::new(lookup(sources, &binding.source_id)?, stream))),
            _ => Ok(None),
        }
    };

    Ok(CornerChannels {
        positions: Channel::new(lookup(sources, position_source_id)?, &streams.positions),
        normals: channel(Semantic::Normal, &streams.normals)?,
        texcoords: channel(Semantic::Texcoord, &streams.texcoords)?,
    })
}
