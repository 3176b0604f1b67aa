//! Scene-side contracts the renderer owns around imported meshes
//!
//! # Submodules
//! - `transform` - Hierarchical position/orientation/scale and model matrices
//! - `lights` - Point lights and spotlights packed for a bounded uniform block

mod transform;
mod lights;

pub use transform::{
    rotation_quat,
    NodeId,
    SceneError,
    SceneGraph,
    SceneNode,
    Transform,
};

pub use lights::{
    LightLimits,
    LightSet,
    LightUniforms,
    PointLight,
    Spotlight,
    POINT_LIGHT_FLOATS,
    SPOTLIGHT_FLOATS,
};
