//! Reconciled mesh types handed to the rendering collaborator
//!
//! # Submodules
//! - `types` - Attribute buffers, sub-meshes and the reconciled mesh
//! - `export` - JSON (base64), MessagePack and binary encodings for upload

mod types;
mod export;

pub use types::{
    AttributeBuffer,
    Bounds,
    ReconciledMesh,
    SubMesh,
    POSITION_STRIDE,
    NORMAL_STRIDE,
    TEXCOORD_STRIDE,
};

pub use export::{
    serialize_f32_vec_base64,
    serialize_u32_vec_base64,
    MeshJSON,
    MeshBinary,
    to_msgpack,
    from_msgpack,
};
