//! Normal synthesis from triangle geometry
//!
//! Each triangle's unit face normal is folded into its three vertices as a
//! running average: the first face assigns, later faces add and renormalize.
//! The result depends on triangle order but is deterministic for a fixed order.

use glam::Vec3;

use crate::error::{ImportError, ImportResult};
use crate::mesh::{AttributeBuffer, NORMAL_STRIDE, POSITION_STRIDE};

/// Compute one normal per vertex of `positions` (stride 3) from a triangle list.
/// Vertices no triangle references get a zero normal.
pub fn compute_normals(positions: &AttributeBuffer, indices: &[u32], invert: bool) -> ImportResult<AttributeBuffer> {
    if indices.len() % 3 != 0 {
        return Err(ImportError::NotTriangleList { len: indices.len() });
    }

    let vertex_count = positions.count();
    let position = |index: u32| -> ImportResult<Vec3> {
        positions
            .get(index as usize)
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .ok_or_else(|| ImportError::IndexOutOfRange {
                semantic: "POSITION",
                source_id: "vertices".to_string(),
                index,
                count: vertex_count,
            })
    };

    let mut accumulated: Vec<Option<Vec3>> = vec![None; vertex_count];
    for triangle in indices.chunks_exact(3) {
        let (a, b, c) = (triangle[0], triangle[1], triangle[2]);
        let pa = position(a)?;
        let face_normal = (position(b)? - pa).cross(position(c)? - pa).normalize_or_zero();

        for vertex in [a, b, c] {
            let slot = &mut accumulated[vertex as usize];
            *slot = Some(match *slot {
                None => face_normal,
                Some(current) => (current + face_normal).normalize_or_zero(),
            });
        }
    }

    let sign = if invert { -1.0 } else { 1.0 };
    let mut normals = AttributeBuffer::new(NORMAL_STRIDE);
    for normal in accumulated {
        let n = normal.unwrap_or(Vec3::ZERO) * sign;
        normals.push(&n.to_array());
    }
    Ok(normals)
}

/// Negate every normal in place
pub fn invert_normals(normals: &mut AttributeBuffer) {
    for value in &mut normals.data {
        *value = -*value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(data: &[f32]) -> AttributeBuffer {
        AttributeBuffer { stride: POSITION_STRIDE, data: data.to_vec() }
    }

    #[test]
    fn test_flat_triangle() {
        let positions = buffer(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let normals = compute_normals(&positions, &[0, 1, 2], false).unwrap();
        assert_eq!(normals.data, vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);

        let inverted = compute_normals(&positions, &[0, 1, 2], true).unwrap();
        assert_eq!(inverted.get(1), Some(&[-0.0, -0.0, -1.0][..]));
    }

    #[test]
    fn test_shared_edge_is_running_average() {
        // two faces folded along the x axis: one in the xy plane, one in the xz plane
        let positions = buffer(&[
            0.0, 0.0, 0.0,
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, -1.0,
        ]);
        let normals = compute_normals(&positions, &[0, 1, 2, 0, 1, 3], false).unwrap();
        let shared = Vec3::from_slice(normals.get(0).unwrap());
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert!((shared - expected).length() < 1e-6);
        assert_eq!(normals.get(2), Some(&[0.0, 0.0, 1.0][..]));
        assert_eq!(normals.get(3), Some(&[0.0, 1.0, 0.0][..]));
    }

    #[test]
    fn test_unreferenced_vertex_gets_zero() {
        let positions = buffer(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 5.0, 5.0, 5.0]);
        let normals = compute_normals(&positions, &[0, 1, 2], false).unwrap();
        assert_eq!(normals.count(), 4);
        assert_eq!(normals.get(3), Some(&[0.0, 0.0, 0.0][..]));
    }

    #[test]
    fn test_repeated_runs_are_bit_identical() {
        let positions = buffer(&[
            0.0, 0.0, 0.0, 1.3, 0.2, 0.0, 0.1, 1.7, 0.3, 0.4, 0.4, -2.1, 1.1, 1.9, 0.7,
        ]);
        let indices = [0, 1, 2, 0, 3, 1, 2, 1, 4, 4, 3, 2];
        let first = compute_normals(&positions, &indices, false).unwrap();
        let second = compute_normals(&positions, &indices, false).unwrap();
        let bits = |b: &AttributeBuffer| b.data.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
    }

    #[test]
    fn test_non_triangle_stream_rejected() {
        let positions = buffer(&[0.0; 12]);
        assert_eq!(
            compute_normals(&positions, &[0, 1, 2, 3], false).unwrap_err(),
            ImportError::NotTriangleList { len: 4 }
        );
    }

    #[test]
    fn test_degenerate_triangle_gives_zero_normal() {
        let positions = buffer(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        let normals = compute_normals(&positions, &[0, 1, 2], false).unwrap();
        assert!(normals.data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_invert_in_place() {
        let mut normals = buffer(&[0.0, 1.0, 0.0]);
        invert_normals(&mut normals);
        assert_eq!(normals.data, vec![-0.0, -1.0, -0.0]);
    }
}
