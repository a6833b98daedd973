//! Mesh representation for 3D models
//!
//! A [`Mesh`] owns its vertex and index data on the CPU and a shared
//! reference to its material. Mapping it uploads that data into a vertex
//! buffer, an index buffer and a vertex layout descriptor; the three are
//! released together on unmap or when the mesh is dropped.

use std::mem::{offset_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Vec2, Vec3};
use crate::render::api::{BufferKind, GpuDevice, VertexAttribute, VertexLayout};
use crate::render::resources::gpu::{GpuBuffer, GpuVertexArray, ShaderProgram};
use crate::render::resources::{Mappable, MaterialRef};
use crate::render::{RenderError, RenderResult};

/// Interleaved vertex record
///
/// The field order and `#[repr(C)]` layout are also the on-disk record layout
/// of the binary model format (11 little-endian `f32`, 44 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Position in object space
    pub position: [f32; 3],
    /// Unit surface normal
    pub normal: [f32; 3],
    /// Unit tangent along the U texture direction
    pub tangent: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
}

impl Vertex {
    /// Size of one record in bytes
    pub const SIZE: usize = size_of::<Self>();

    /// Create a vertex without tangent information
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tangent: [0.0; 3],
            uv,
        }
    }

    /// Layout the shaders expect: locations 0-3 are position, normal, tangent, uv
    pub fn layout() -> VertexLayout {
        let attribute = |location, components, offset: usize| VertexAttribute {
            location,
            components,
            offset: offset as i32,
        };
        VertexLayout {
            stride: Self::SIZE as i32,
            attributes: vec![
                attribute(0, 3, offset_of!(Vertex, position)),
                attribute(1, 3, offset_of!(Vertex, normal)),
                attribute(2, 3, offset_of!(Vertex, tangent)),
                attribute(3, 2, offset_of!(Vertex, uv)),
            ],
        }
    }
}

/// GPU objects backing a mapped mesh
#[derive(Debug)]
struct MeshBuffers {
    // Field order is drop order: the layout goes before the buffers it references.
    layout: GpuVertexArray,
    vertices: GpuBuffer,
    indices: GpuBuffer,
}

/// Triangle-list mesh with a material
#[derive(Debug)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    material: MaterialRef,
    buffers: Option<MeshBuffers>,
}

impl Mesh {
    /// Create an unmapped mesh
    ///
    /// Fails with [`RenderError::InvalidGeometry`] unless the index count is a
    /// multiple of three and every index refers to an existing vertex.
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, material: MaterialRef) -> RenderResult<Self> {
        if indices.len() % 3 != 0 {
            return Err(RenderError::InvalidGeometry(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertices.len()) {
            return Err(RenderError::InvalidGeometry(format!(
                "index {} out of range for {} vertices",
                index,
                vertices.len()
            )));
        }
        Ok(Self {
            vertices,
            indices,
            material,
            buffers: None,
        })
    }

    /// Vertex data
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Triangle-list indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Shared material
    pub fn material(&self) -> &MaterialRef {
        &self.material
    }

    /// Replace the material
    pub fn set_material(&mut self, material: MaterialRef) {
        self.material = material;
    }

    /// Read the mapped vertex buffer back from the GPU
    pub fn read_back_vertices(&self) -> RenderResult<Vec<Vertex>> {
        let buffers = self.buffers.as_ref().ok_or(RenderError::BuffersNotYetMapped)?;
        let bytes = buffers.vertices.read_back()?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Read the mapped index buffer back from the GPU
    pub fn read_back_indices(&self) -> RenderResult<Vec<u32>> {
        let buffers = self.buffers.as_ref().ok_or(RenderError::BuffersNotYetMapped)?;
        let bytes = buffers.indices.read_back()?;
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Bind the vertex layout and material, then issue the indexed draw
    pub fn draw(&self, program: &ShaderProgram) -> RenderResult<()> {
        let buffers = self.buffers.as_ref().ok_or(RenderError::BuffersNotYetMapped)?;
        buffers.layout.bind();
        self.material.borrow().use_material(program);
        program.device().draw_indexed(self.indices.len() as u32);
        Ok(())
    }
}

impl Mappable for Mesh {
    fn map(&mut self, device: &GpuDevice) -> RenderResult<()> {
        if self.buffers.is_some() {
            return Err(RenderError::BuffersAlreadyMapped);
        }
        let vertices = GpuBuffer::new(device, BufferKind::Vertex, bytemuck::cast_slice(&self.vertices))?;
        let indices = GpuBuffer::new(device, BufferKind::Index, bytemuck::cast_slice(&self.indices))?;
        let layout = GpuVertexArray::new(device, &vertices, &indices, &Vertex::layout())?;
        log::trace!(
            "Mapped mesh ({} vertices, {} indices) onto {}",
            self.vertices.len(),
            self.indices.len(),
            layout.handle()
        );
        self.buffers = Some(MeshBuffers { layout, vertices, indices });
        Ok(())
    }

    fn unmap(&mut self) -> RenderResult<()> {
        match self.buffers.take() {
            Some(_) => Ok(()),
            None => Err(RenderError::BuffersNotYetMapped),
        }
    }

    fn is_mapped(&self) -> bool {
        self.buffers.is_some()
    }
}

/// Replace every vertex normal with the area-weighted average of its faces' normals
pub fn generate_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accumulated = vec![Vec3::zeros(); vertices.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let pa = Vec3::from(vertices[a].position);
        let pb = Vec3::from(vertices[b].position);
        let pc = Vec3::from(vertices[c].position);
        // Unnormalized cross product weights by triangle area
        let face_normal = (pb - pa).cross(&(pc - pa));
        for index in [a, b, c] {
            accumulated[index] += face_normal;
        }
    }
    for (vertex, normal) in vertices.iter_mut().zip(accumulated) {
        vertex.normal = normal.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y).into();
    }
}

/// Compute per-vertex tangents from positions and texture coordinates
///
/// Tangents are Gram-Schmidt orthogonalized against the normal. Vertices on
/// triangles with degenerate UVs get an arbitrary tangent perpendicular to
/// their normal.
pub fn compute_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accumulated = vec![Vec3::zeros(); vertices.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        let edge1 = Vec3::from(vertices[b].position) - Vec3::from(vertices[a].position);
        let edge2 = Vec3::from(vertices[c].position) - Vec3::from(vertices[a].position);
        let duv1 = Vec2::from(vertices[b].uv) - Vec2::from(vertices[a].uv);
        let duv2 = Vec2::from(vertices[c].uv) - Vec2::from(vertices[a].uv);

        let determinant = duv1.x * duv2.y - duv2.x * duv1.y;
        if determinant.abs() <= f32::EPSILON {
            continue;
        }
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) / determinant;
        for index in [a, b, c] {
            accumulated[index] += tangent;
        }
    }

    for (vertex, tangent) in vertices.iter_mut().zip(accumulated) {
        let normal = Vec3::from(vertex.normal);
        let orthogonal = tangent - normal * normal.dot(&tangent);
        let tangent = orthogonal.try_normalize(f32::EPSILON).unwrap_or_else(|| {
            let helper = if normal.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
            normal.cross(&helper).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x)
        });
        vertex.tangent = tangent.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::headless::HeadlessBackend;
    use crate::render::resources::materials::{Material, ShadingModel};
    use approx::assert_relative_eq;
    use std::rc::Rc;

    fn triangle() -> (Vec<Vertex>, Vec<u32>) {
        let vertices = vec![
            Vertex::new([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::new([1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::new([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        (vertices, vec![0, 1, 2])
    }

    fn mesh() -> Mesh {
        let (vertices, indices) = triangle();
        Mesh::new(vertices, indices, Material::shared(ShadingModel::BlinnPhong)).unwrap()
    }

    #[test]
    fn test_vertex_record_is_44_bytes() {
        assert_eq!(Vertex::SIZE, 44);
        assert_eq!(Vertex::layout().attributes[3].offset, 36);
    }

    #[test]
    fn test_rejects_partial_triangles_and_bad_indices() {
        let (vertices, _) = triangle();
        let material = Material::shared(ShadingModel::BlinnPhong);
        assert!(matches!(
            Mesh::new(vertices.clone(), vec![0, 1], material.clone()),
            Err(RenderError::InvalidGeometry(_))
        ));
        assert!(matches!(
            Mesh::new(vertices, vec![0, 1, 3], material),
            Err(RenderError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_map_twice_fails() {
        let device: GpuDevice = Rc::new(HeadlessBackend::new());
        let mut mesh = mesh();
        mesh.map(&device).unwrap();
        assert!(matches!(mesh.map(&device), Err(RenderError::BuffersAlreadyMapped)));
        assert!(mesh.is_mapped());
    }

    #[test]
    fn test_unmap_twice_fails() {
        let device: GpuDevice = Rc::new(HeadlessBackend::new());
        let mut mesh = mesh();
        mesh.map(&device).unwrap();
        mesh.unmap().unwrap();
        assert!(matches!(mesh.unmap(), Err(RenderError::BuffersNotYetMapped)));
    }

    #[test]
    fn test_map_unmap_map_cycle() {
        let backend = Rc::new(HeadlessBackend::new());
        let device: GpuDevice = backend.clone();
        let mut mesh = mesh();

        mesh.map(&device).unwrap();
        mesh.unmap().unwrap();
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.live_vertex_arrays(), 0);

        mesh.map(&device).unwrap();
        assert_eq!(backend.live_buffers(), 2);
        assert_eq!(backend.live_vertex_arrays(), 1);
    }

    #[test]
    fn test_remap_requires_mapped_mesh() {
        let device: GpuDevice = Rc::new(HeadlessBackend::new());
        let mut mesh = mesh();
        assert!(matches!(mesh.remap(&device), Err(RenderError::BuffersNotYetMapped)));
        assert!(!mesh.is_mapped());

        mesh.map(&device).unwrap();
        mesh.remap(&device).unwrap();
        assert!(mesh.is_mapped());
    }

    #[test]
    fn test_drop_releases_gpu_buffers() {
        let backend = Rc::new(HeadlessBackend::new());
        let device: GpuDevice = backend.clone();
        let mut mesh = mesh();
        mesh.map(&device).unwrap();
        drop(mesh);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.live_vertex_arrays(), 0);
    }

    #[test]
    fn test_read_back_matches_cpu_data() {
        let device: GpuDevice = Rc::new(HeadlessBackend::new());
        let mut mesh = mesh();
        assert!(mesh.read_back_vertices().is_err());

        mesh.map(&device).unwrap();
        assert_eq!(mesh.read_back_vertices().unwrap(), mesh.vertices());
        assert_eq!(mesh.read_back_indices().unwrap(), mesh.indices());
    }

    #[test]
    fn test_generated_normals_face_outward() {
        let (mut vertices, indices) = triangle();
        for vertex in &mut vertices {
            vertex.normal = [0.0; 3];
        }
        generate_normals(&mut vertices, &indices);
        for vertex in &vertices {
            assert_relative_eq!(Vec3::from(vertex.normal), Vec3::z(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_tangents_follow_u_direction() {
        let (mut vertices, indices) = triangle();
        compute_tangents(&mut vertices, &indices);
        for vertex in &vertices {
            assert_relative_eq!(Vec3::from(vertex.tangent), Vec3::x(), epsilon = 1e-6);
        }
    }
}
