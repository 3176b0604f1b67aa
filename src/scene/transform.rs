//! Object transforms and the parent/child hierarchy

use glam::{Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rotation of `angle` radians around `axis`; a zero axis gives no rotation
pub fn rotation_quat(angle: f32, axis: Vec3) -> Quat {
    let axis = axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_axis_angle(axis, angle)
    }
}

fn rotation_quat_xyz(x: f32, y: f32, z: f32) -> Quat {
    rotation_quat(x, Vec3::X) * (rotation_quat(y, Vec3::Y) * rotation_quat(z, Vec3::Z))
}

/// Position, orientation and scale of an object in its parent's space.
///
/// Orientation is kept as two quaternions: local rotations are applied in
/// front of the accumulated local orientation, world rotations behind the
/// accumulated world orientation. The effective rotation is `local * world`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub local_orientation: Quat,
    pub world_orientation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            local_orientation: Quat::IDENTITY,
            world_orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Default::default() }
    }

    pub fn rotate_local(&mut self, angle: f32, axis: Vec3) {
        self.local_orientation = rotation_quat(angle, axis) * self.local_orientation;
    }

    pub fn rotate_local_xyz(&mut self, x: f32, y: f32, z: f32) {
        self.local_orientation = rotation_quat_xyz(x, y, z) * self.local_orientation;
    }

    pub fn rotate_world(&mut self, angle: f32, axis: Vec3) {
        self.world_orientation = self.world_orientation * rotation_quat(angle, axis);
    }

    pub fn rotate_world_xyz(&mut self, x: f32, y: f32, z: f32) {
        self.world_orientation = self.world_orientation * rotation_quat_xyz(x, y, z);
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.translation += delta;
    }

    /// Additive scale change, (1, 1, 1) + (0.5, 0, 0) = (1.5, 1, 1)
    pub fn add_scale(&mut self, delta: Vec3) {
        self.scale += delta;
    }

    pub fn orientation(&self) -> Quat {
        self.local_orientation * self.world_orientation
    }

    /// Model matrix applying scale, then rotation, then translation
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation(), self.translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("unknown scene node {0:?}")]
    UnknownNode(NodeId),
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    /// Key of the imported model drawn at this node, if any
    pub model: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena of scene nodes; each node has at most one parent
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<String>, transform: Transform) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.into(),
            transform,
            model: None,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Make `child` a child of `parent`, detaching it from any previous parent
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> Result<(), SceneError> {
        self.check(child)?;
        self.check(parent)?;

        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(SceneError::Cycle { child, parent });
            }
            cursor = self.nodes[id.0].parent;
        }

        self.detach(child)?;
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub fn detach(&mut self, child: NodeId) -> Result<(), SceneError> {
        self.check(child)?;
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|&c| c != child);
        }
        Ok(())
    }

    /// Model matrix of `id` in world space (parent chain composed root first)
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let node = self.node(id)?;
        let local = node.transform.matrix();
        match node.parent {
            Some(parent) => Some(self.world_matrix(parent)? * local),
            None => Some(local),
        }
    }

    /// Inverse-transpose of the world matrix's upper 3x3, for transforming normals.
    /// Singular matrices (a zero scale axis) give the identity.
    pub fn normal_matrix(&self, id: NodeId) -> Option<Mat3> {
        let linear = Mat3::from_mat4(self.world_matrix(id)?);
        if linear.determinant() == 0.0 {
            return Some(Mat3::IDENTITY);
        }
        let inverse = linear.inverse();
        if !inverse.is_finite() {
            return Some(Mat3::IDENTITY);
        }
        Some(inverse.transpose())
    }

    fn check(&self, id: NodeId) -> Result<(), SceneError> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(SceneError::UnknownNode(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_scale_then_rotate_then_translate() {
        let mut transform = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0));
        transform.add_scale(Vec3::new(1.0, 0.0, 0.0));
        transform.rotate_local(FRAC_PI_2, Vec3::Z);
        let p = transform.matrix().transform_point3(Vec3::X);
        // (1,0,0) scaled to (2,0,0), rotated to (0,2,0), moved to (10,2,0)
        assert!(approx(p, Vec3::new(10.0, 2.0, 0.0)));
    }

    #[test]
    fn test_zero_axis_is_no_rotation() {
        assert_eq!(rotation_quat(1.0, Vec3::ZERO), Quat::IDENTITY);
        let mut transform = Transform::default();
        transform.rotate_world(1.0, Vec3::ZERO);
        assert_eq!(transform.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_local_and_world_order() {
        let mut transform = Transform::default();
        transform.rotate_world(FRAC_PI_2, Vec3::X);
        transform.rotate_local(FRAC_PI_2, Vec3::Z);
        let expected = rotation_quat(FRAC_PI_2, Vec3::Z) * rotation_quat(FRAC_PI_2, Vec3::X);
        assert!(transform.orientation().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_hierarchy_composes_parent_first() {
        let mut scene = SceneGraph::new();
        let parent = scene.add_node("parent", Transform::from_translation(Vec3::new(0.0, 5.0, 0.0)));
        let child = scene.add_node("child", Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        scene.attach(child, parent).unwrap();

        let world = scene.world_matrix(child).unwrap();
        assert!(approx(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 5.0, 0.0)));
        assert_eq!(scene.node(parent).unwrap().children(), &[child]);
    }

    #[test]
    fn test_cycles_rejected() {
        let mut scene = SceneGraph::new();
        let a = scene.add_node("a", Transform::default());
        let b = scene.add_node("b", Transform::default());
        scene.attach(b, a).unwrap();
        assert_eq!(scene.attach(a, b), Err(SceneError::Cycle { child: a, parent: b }));
        assert_eq!(scene.attach(a, a), Err(SceneError::Cycle { child: a, parent: a }));
        assert!(scene.attach(a, NodeId(9)).is_err());
    }

    #[test]
    fn test_reattach_moves_child() {
        let mut scene = SceneGraph::new();
        let a = scene.add_node("a", Transform::default());
        let b = scene.add_node("b", Transform::default());
        let c = scene.add_node("c", Transform::default());
        scene.attach(c, a).unwrap();
        scene.attach(c, b).unwrap();
        assert!(scene.node(a).unwrap().children().is_empty());
        assert_eq!(scene.node(c).unwrap().parent(), Some(b));
    }

    #[test]
    fn test_normal_matrix_undoes_nonuniform_scale() {
        let mut scene = SceneGraph::new();
        let mut transform = Transform::default();
        transform.add_scale(Vec3::new(1.0, 0.0, 0.0));
        let id = scene.add_node("stretched", transform);
        let normal = scene.normal_matrix(id).unwrap() * Vec3::new(1.0, 1.0, 0.0);
        assert!(approx(normal, Vec3::new(0.5, 1.0, 0.0)));

        transform.scale = Vec3::ZERO;
        let flat = scene.add_node("flat", transform);
        assert_eq!(scene.normal_matrix(flat), Some(Mat3::IDENTITY));
    }

    #[test]
    fn test_normal_matrix_with_tiny_scale() {
        let mut scene = SceneGraph::new();
        let transform = Transform { scale: Vec3::new(0.004, 0.002, 0.004), ..Default::default() };
        let id = scene.add_node("tiny", transform);
        let normal = scene.normal_matrix(id).unwrap() * Vec3::new(1.0, 1.0, 0.0);
        // diag(250, 500, 250)
        assert!((normal - Vec3::new(250.0, 500.0, 0.0)).length() < 0.05, "{:?}", normal);
    }
}
