// Procedural mesh types and triangulation.
// The shooter loads no model files: every visible object is one of the
// primitives below, scaled per instance by its collision volume.
//
//   PolyMesh::{cuboid, uv_sphere, card} → triangulate_{flat,smooth}() → RenderMesh → GPU

use glam::Vec3;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// GPU-ready vertex with position and normal.
/// Shader layout:
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Intermediate polygon mesh for building primitives.
/// Supports n-gon faces (arbitrary vertex count per face).
/// Faces use CCW winding when viewed from outside (consistent with back-face culling).
/// NOT GPU-ready, use `RenderMesh` for rendering.
/// Only built at startup; heap allocation per face is acceptable.
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces:     Vec<Vec<usize>>,  // each face = CCW-ordered vertex index list
}

impl PolyMesh {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            faces:     Vec::new(),
        }
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    /// Add a face by vertex indices (CCW order).
    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "Face must have at least 3 vertices");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }

    /// Axis-aligned box with half extent 1 on every axis, centred on the origin.
    /// Stands in for the player and enemy models; instances scale it to their hitbox.
    pub fn cuboid() -> Self {
        let mut mesh = Self::new();
        for z in [-1.0, 1.0] {
            mesh.add_vertex(Vec3::new(-1.0, -1.0, z)); // 0 / 4
            mesh.add_vertex(Vec3::new( 1.0, -1.0, z)); // 1 / 5
            mesh.add_vertex(Vec3::new( 1.0,  1.0, z)); // 2 / 6
            mesh.add_vertex(Vec3::new(-1.0,  1.0, z)); // 3 / 7
        }
        mesh.add_face(vec![4, 5, 6, 7]); // top    (+Z)
        mesh.add_face(vec![0, 3, 2, 1]); // bottom (-Z)
        mesh.add_face(vec![0, 1, 5, 4]); // front  (-Y)
        mesh.add_face(vec![2, 3, 7, 6]); // back   (+Y)
        mesh.add_face(vec![1, 2, 6, 5]); // right  (+X)
        mesh.add_face(vec![3, 0, 4, 7]); // left   (-X)
        mesh
    }

    /// Unit sphere with poles on ±Z. Used for bullets.
    pub fn uv_sphere(rings: usize, segments: usize) -> Self {
        debug_assert!(rings >= 2 && segments >= 3);
        let mut mesh = Self::new();

        let top = mesh.add_vertex(Vec3::Z);
        // ring_start[i] = index of (ring i, segment 0) for the inner rings 1..rings
        let mut ring_start = Vec::with_capacity(rings - 1);
        for i in 1..rings {
            let theta = std::f32::consts::PI * i as f32 / rings as f32;
            ring_start.push(mesh.vertex_count());
            for j in 0..segments {
                let phi = std::f32::consts::TAU * j as f32 / segments as f32;
                mesh.add_vertex(Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos()));
            }
        }
        let bottom = mesh.add_vertex(-Vec3::Z);

        let at = |ring: usize, seg: usize| ring_start[ring] + seg % segments;
        for j in 0..segments {
            mesh.add_face(vec![top, at(0, j), at(0, j + 1)]);
        }
        for r in 0..rings - 2 {
            for j in 0..segments {
                mesh.add_face(vec![at(r, j), at(r + 1, j), at(r + 1, j + 1), at(r, j + 1)]);
            }
        }
        let last = rings - 2;
        for j in 0..segments {
            mesh.add_face(vec![at(last, j), bottom, at(last, j + 1)]);
        }
        mesh
    }

    /// Flat rectangle in the XY plane at height `z`, facing +Z. Used for the floor.
    pub fn card(min: glam::Vec2, max: glam::Vec2, z: f32) -> Self {
        let mut mesh = Self::new();
        let a = mesh.add_vertex(Vec3::new(min.x, min.y, z));
        let b = mesh.add_vertex(Vec3::new(max.x, min.y, z));
        let c = mesh.add_vertex(Vec3::new(max.x, max.y, z));
        let d = mesh.add_vertex(Vec3::new(min.x, max.y, z));
        mesh.add_face(vec![a, b, c, d]);
        mesh
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// GPU-ready triangulated mesh with per-vertex normals.
/// Vertices are shared across triangles via the index buffer (smooth normals).
/// Upload vertex_bytes() to a VERTEX buffer, index_bytes() to an INDEX buffer.
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices:  Vec<u32>,
}

impl RenderMesh {
    /// Cast vertex slice to raw bytes for wgpu buffer upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Cast index slice to raw bytes for wgpu buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> usize  { self.indices.len() }
}

// ============================================================================
// TRIANGULATION + SMOOTH NORMALS
// ============================================================================

/// Convert a PolyMesh to a GPU-ready RenderMesh using smooth (area-weighted) normals.
///
/// Smooth normals: vertices are shared across triangles via the index buffer.
/// A 12×16 UV sphere keeps its 178 positions as 178 GpuVertex.
///
/// Algorithm:
///   1. Accumulate area-weighted face normals into each vertex's normal accumulator.
///      The cross product magnitude = 2×triangle_area, giving automatic area-weighting.
///   2. Normalize each accumulated normal.
///   3. Fan-triangulate each face (from vertex 0).
///   4. Build the index buffer referencing shared GpuVertex entries.
pub fn triangulate_smooth(poly: &PolyMesh) -> RenderMesh {
    let n_verts = poly.vertex_count();

    // Step 1: Accumulate area-weighted normals per vertex
    let mut normal_accum: Vec<Vec3> = vec![Vec3::ZERO; n_verts];

    for face in &poly.faces {
        let n = face.len();
        // Fan triangulate from vertex 0
        for i in 1..(n - 1) {
            let a = poly.positions[face[0]];
            let b = poly.positions[face[i]];
            let c = poly.positions[face[i + 1]];
            // Cross product is not normalized — magnitude encodes 2×area (area-weighting)
            let weighted_normal = (b - a).cross(c - a);
            normal_accum[face[0]]     += weighted_normal;
            normal_accum[face[i]]     += weighted_normal;
            normal_accum[face[i + 1]] += weighted_normal;
        }
    }

    // Step 2: Build GpuVertex per PolyMesh position
    let vertices: Vec<GpuVertex> = poly.positions.iter()
        .zip(normal_accum.iter())
        .map(|(pos, n)| GpuVertex {
            position: pos.to_array(),
            normal:   n.normalize_or_zero().to_array(),
        })
        .collect();

    // Step 3 & 4: Fan-triangulate faces to build index buffer
    let mut indices: Vec<u32> = Vec::new();
    for face in &poly.faces {
        let n = face.len();
        for i in 1..(n - 1) {
            indices.push(face[0]     as u32);
            indices.push(face[i]     as u32);
            indices.push(face[i + 1] as u32);
        }
    }

    RenderMesh { vertices, indices }
}

/// Convert a PolyMesh to a RenderMesh with one normal per face.
/// Each face gets its own copy of its vertices so box edges stay sharp.
pub fn triangulate_flat(poly: &PolyMesh) -> RenderMesh {
    let mut vertices: Vec<GpuVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for face in &poly.faces {
        let a = poly.positions[face[0]];
        let b = poly.positions[face[1]];
        let c = poly.positions[face[2]];
        let normal = (b - a).cross(c - a).normalize_or_zero().to_array();

        let base = vertices.len() as u32;
        vertices.extend(face.iter().map(|&i| GpuVertex {
            position: poly.positions[i].to_array(),
            normal,
        }));
        for i in 1..(face.len() as u32 - 1) {
            indices.extend([base, base + i, base + i + 1]);
        }
    }

    RenderMesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn cuboid_faces_point_outward() {
        let mesh = triangulate_flat(&PolyMesh::cuboid());
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.index_count(), 36);
        for v in &mesh.vertices {
            let p = Vec3::from_array(v.position);
            let n = Vec3::from_array(v.normal);
            assert!(p.dot(n) > 0.0, "normal {n} points into the box at {p}");
        }
    }

    #[test]
    fn sphere_is_closed_and_outward() {
        let poly = PolyMesh::uv_sphere(12, 16);
        assert_eq!(poly.vertex_count(), 2 + 11 * 16);
        assert_eq!(poly.faces.len(), 16 * 12);

        let mesh = triangulate_smooth(&poly);
        for v in &mesh.vertices {
            let p = Vec3::from_array(v.position);
            assert!((p.length() - 1.0).abs() < 1e-5);
            assert!(p.dot(Vec3::from_array(v.normal)) > 0.9);
        }
    }

    #[test]
    fn card_faces_up() {
        let mesh = triangulate_flat(&PolyMesh::card(Vec2::new(-10.0, 0.0), Vec2::new(10.0, 20.0), -0.5));
        assert_eq!(mesh.index_count(), 6);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0] && v.position[2] == -0.5));
    }

    #[test]
    fn byte_views_match_lengths() {
        let mesh = triangulate_flat(&PolyMesh::cuboid());
        assert_eq!(mesh.vertex_bytes().len(), 24 * std::mem::size_of::<GpuVertex>());
        assert_eq!(mesh.index_bytes().len(), 36 * 4);
    }
}
