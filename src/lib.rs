//! COLLADA geometry import for GPU rendering
//!
//! Reads `.dae` documents, reconciles their independently indexed position,
//! normal and texture-coordinate streams into one index buffer over parallel
//! attribute buffers, and encodes the result for upload.
//!
//! ```ignore
//! use collada_import::{import_file, ImportOptions};
//!
//! let report = import_file("tests/fixtures/cube.dae", &ImportOptions::default())?;
//! for (name, mesh) in &report.models {
//!     println!("{}: {} vertices", name, mesh.vertex_count());
//! }
//! ```

pub mod error;
pub mod import;
pub mod mesh;
pub mod options;
pub mod parse_xml;
pub mod scene;

pub use error::{Diagnostic, ImportError, ImportResult};
pub use import::{import_file, import_str, load_models, ImportFailure, ImportReport};
pub use mesh::{AttributeBuffer, MeshBinary, MeshJSON, ReconciledMesh, SubMesh};
pub use options::{ImportOptions, NormalMode};
pub use parse_xml::{parse_xml_file, parse_xml_str, XmlNode};
