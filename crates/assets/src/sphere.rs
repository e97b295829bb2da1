use std::f32::consts::PI;

/// Errors from sphere generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SphereError {
    #[error("sphere needs at least one segment in each direction, got {longitude}x{latitude}")]
    ZeroSegments { longitude: u32, latitude: u32 },
    #[error("a {longitude}x{latitude} sphere needs more vertices than 32-bit indices can address")]
    TooManyVertices { longitude: u32, latitude: u32 },
}

/// Unit UV sphere sampled on a regular longitude/latitude grid.
///
/// Row `y` runs from the north pole (`v = 0`) to the south pole (`v = 1`),
/// column `x` once around the equator. The seam column and the pole rows are
/// duplicated rather than merged, so texture coordinates stay continuous.
#[derive(Debug, Clone, PartialEq)]
pub struct UvSphere {
    longitude_segments: u32,
    latitude_segments: u32,
    pub positions: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl UvSphere {
    /// Floats per vertex in [`UvSphere::interleaved`]: `x y z u v`.
    pub const FLOATS_PER_VERTEX: usize = 5;

    /// Vertex count of a sphere with these segment counts, or `None` when
    /// `(X + 1) * (Y + 1)` does not fit a `u32` index.
    pub fn vertex_count_for(longitude_segments: u32, latitude_segments: u32) -> Option<u32> {
        let columns = longitude_segments.checked_add(1)?;
        let rows = latitude_segments.checked_add(1)?;
        columns.checked_mul(rows)
    }

    pub fn generate(longitude_segments: u32, latitude_segments: u32) -> Result<Self, SphereError> {
        if longitude_segments == 0 || latitude_segments == 0 {
            return Err(SphereError::ZeroSegments {
                longitude: longitude_segments,
                latitude: latitude_segments,
            });
        }
        let vertex_count = Self::vertex_count_for(longitude_segments, latitude_segments).ok_or(
            SphereError::TooManyVertices {
                longitude: longitude_segments,
                latitude: latitude_segments,
            },
        )? as usize;

        // Both fit: their product does.
        let columns = longitude_segments + 1;
        let rows = latitude_segments + 1;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut tex_coords = Vec::with_capacity(vertex_count);

        for y in 0..rows {
            let v = y as f32 / latitude_segments as f32;
            let (sin_theta, cos_theta) = (v * PI).sin_cos();
            for x in 0..columns {
                let u = x as f32 / longitude_segments as f32;
                let (sin_phi, cos_phi) = (u * 2.0 * PI).sin_cos();
                positions.push([cos_phi * sin_theta, cos_theta, sin_phi * sin_theta]);
                tex_coords.push([u, v]);
            }
        }

        let mut indices =
            Vec::with_capacity(6 * longitude_segments as usize * latitude_segments as usize);
        for y in 0..latitude_segments {
            for x in 0..longitude_segments {
                let top_left = y * columns + x;
                let top_right = top_left + 1;
                let bottom_left = top_left + columns;
                let bottom_right = bottom_left + 1;
                // Counter-clockwise seen from outside.
                indices.extend_from_slice(&[top_left, bottom_right, bottom_left]);
                indices.extend_from_slice(&[top_left, top_right, bottom_right]);
            }
        }

        tracing::debug!(
            longitude_segments,
            latitude_segments,
            vertices = positions.len(),
            indices = indices.len(),
            "generated uv sphere"
        );

        Ok(Self {
            longitude_segments,
            latitude_segments,
            positions,
            tex_coords,
            indices,
        })
    }

    pub fn longitude_segments(&self) -> u32 {
        self.longitude_segments
    }

    pub fn latitude_segments(&self) -> u32 {
        self.latitude_segments
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Flat `x y z u v` stream for a position + texcoord vertex layout.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.vertex_count() * Self::FLOATS_PER_VERTEX);
        for (p, t) in self.positions.iter().zip(&self.tex_coords) {
            out.extend_from_slice(p);
            out.extend_from_slice(t);
        }
        out
    }

    /// Flat `x y z` stream for a position-only vertex layout.
    pub fn flat_positions(&self) -> Vec<f32> {
        self.positions.iter().flatten().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    #[test]
    fn counts_match_segment_grid() {
        for (x, y) in [(1, 1), (1, 5), (3, 2), (8, 8), (64, 64), (17, 9)] {
            let sphere = UvSphere::generate(x, y).unwrap();
            assert_eq!(sphere.vertex_count(), ((x + 1) * (y + 1)) as usize);
            assert_eq!(sphere.tex_coords.len(), sphere.vertex_count());
            assert_eq!(sphere.index_count(), (6 * x * y) as usize);
            let n = sphere.vertex_count() as u32;
            assert!(sphere.indices.iter().all(|&i| i < n), "{x}x{y}");
        }
    }

    #[test]
    fn positions_lie_on_unit_sphere() {
        let sphere = UvSphere::generate(32, 16).unwrap();
        for p in &sphere.positions {
            let len = dot(*p, *p).sqrt();
            assert!((len - 1.0).abs() < 1e-5, "length {len}");
        }
    }

    #[test]
    fn tex_coords_span_unit_square() {
        let sphere = UvSphere::generate(4, 2).unwrap();
        assert_eq!(sphere.tex_coords.first(), Some(&[0.0, 0.0]));
        assert_eq!(sphere.tex_coords.last(), Some(&[1.0, 1.0]));
    }

    #[test]
    fn poles_are_duplicated_per_column() {
        let sphere = UvSphere::generate(6, 3).unwrap();
        let columns = 7;
        for p in &sphere.positions[..columns] {
            assert!((p[1] - 1.0).abs() < 1e-6);
        }
        for p in &sphere.positions[sphere.vertex_count() - columns..] {
            assert!((p[1] + 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn triangles_face_outward() {
        let sphere = UvSphere::generate(24, 12).unwrap();
        for tri in sphere.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|i| sphere.positions[tri[i] as usize]);
            let normal = cross(sub(b, a), sub(c, a));
            // Pole rows collapse one edge to a point.
            if dot(normal, normal) < 1e-12 {
                continue;
            }
            let centroid = [
                (a[0] + b[0] + c[0]) / 3.0,
                (a[1] + b[1] + c[1]) / 3.0,
                (a[2] + b[2] + c[2]) / 3.0,
            ];
            assert!(dot(normal, centroid) > 0.0, "inward triangle {tri:?}");
        }
    }

    #[test]
    fn interleaved_layout() {
        let sphere = UvSphere::generate(2, 2).unwrap();
        let flat = sphere.interleaved();
        assert_eq!(flat.len(), sphere.vertex_count() * UvSphere::FLOATS_PER_VERTEX);
        assert_eq!(&flat[5..8], &sphere.positions[1]);
        assert_eq!(&flat[8..10], &sphere.tex_coords[1]);
        assert_eq!(sphere.flat_positions().len(), sphere.vertex_count() * 3);
    }

    #[test]
    fn zero_segments_rejected() {
        assert_eq!(
            UvSphere::generate(0, 4),
            Err(SphereError::ZeroSegments {
                longitude: 0,
                latitude: 4
            })
        );
        assert!(UvSphere::generate(4, 0).is_err());
    }

    #[test]
    fn oversized_grid_rejected_without_overflow() {
        assert_eq!(
            UvSphere::generate(70_000, 70_000),
            Err(SphereError::TooManyVertices {
                longitude: 70_000,
                latitude: 70_000
            })
        );
        assert!(matches!(
            UvSphere::generate(u32::MAX, 1),
            Err(SphereError::TooManyVertices { .. })
        ));
        assert_eq!(UvSphere::vertex_count_for(65_534, 65_534), Some(65_535 * 65_535));
        assert_eq!(UvSphere::vertex_count_for(65_535, 65_536), None);
        assert_eq!(UvSphere::vertex_count_for(64, 64), Some(65 * 65));
    }
}
