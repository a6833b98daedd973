//! Wavefront OBJ import through `tobj`
//!
//! Produces CPU-side meshes and material descriptions. Nothing here touches
//! the GPU; [`crate::render::Model::import_obj`] turns the result into a model.

use std::path::{Path, PathBuf};

use crate::render::primitives::mesh::{compute_tangents, generate_normals, Vertex};
use crate::render::resources::materials::MapSlot;
use crate::render::{RenderError, RenderResult};

/// Material properties read from an MTL file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjMaterial {
    /// Material name
    pub name: String,
    /// Diffuse color (`Kd`)
    pub diffuse: Option<[f32; 3]>,
    /// Specular color (`Ks`)
    pub specular: Option<[f32; 3]>,
    /// Specular exponent (`Ns`)
    pub shininess: Option<f32>,
    /// Index of refraction (`Ni`)
    pub optical_density: Option<f32>,
    /// Texture paths per slot, relative to the OBJ file's directory
    pub textures: Vec<(MapSlot, PathBuf)>,
}

impl ObjMaterial {
    fn from_tobj(material: tobj::Material) -> Self {
        let slots = [
            (MapSlot::Albedo, material.diffuse_texture),
            (MapSlot::Specular, material.specular_texture),
            (MapSlot::Normal, material.normal_texture),
            (MapSlot::Roughness, material.shininess_texture),
            (MapSlot::AmbientOcclusion, material.ambient_texture),
        ];
        Self {
            name: material.name,
            diffuse: material.diffuse,
            specular: material.specular,
            shininess: material.shininess,
            optical_density: material.optical_density,
            textures: slots
                .into_iter()
                .filter_map(|(slot, path)| path.filter(|p| !p.is_empty()).map(|p| (slot, PathBuf::from(p))))
                .collect(),
        }
    }

    /// Roughness equivalent of the Blinn-Phong specular exponent
    pub fn roughness(&self) -> Option<f32> {
        self.shininess.map(|exponent| (2.0 / (exponent.max(0.0) + 2.0)).sqrt())
    }
}

/// One triangulated OBJ mesh
#[derive(Debug, Clone, PartialEq)]
pub struct ObjMesh {
    /// Object or group name
    pub name: String,
    /// Vertices with normals and tangents filled in
    pub vertices: Vec<Vertex>,
    /// Triangle-list indices
    pub indices: Vec<u32>,
    /// Index into [`ObjScene::materials`]
    pub material: Option<usize>,
}

/// Everything imported from one OBJ file
#[derive(Debug, Clone, PartialEq)]
pub struct ObjScene {
    /// Meshes in file order
    pub meshes: Vec<ObjMesh>,
    /// Materials from the referenced MTL libraries
    pub materials: Vec<ObjMaterial>,
    /// Directory texture paths are relative to
    pub base_dir: PathBuf,
}

/// Loads OBJ files with `tobj`
pub struct ObjLoader;

impl ObjLoader {
    /// Load and triangulate an OBJ file
    ///
    /// A missing or broken MTL library is logged and the meshes are kept
    /// without materials. Any other failure is [`RenderError::ImportFailed`].
    pub fn load<P: AsRef<Path>>(path: P) -> RenderResult<ObjScene> {
        let path = path.as_ref();
        log::info!("Importing OBJ {:?}", path);

        let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
            .map_err(|e| RenderError::ImportFailed(format!("{}: {e}", path.display())))?;

        let materials = match materials {
            Ok(materials) => materials.into_iter().map(ObjMaterial::from_tobj).collect(),
            Err(e) => {
                log::warn!("Ignoring materials of {:?}: {}", path, e);
                Vec::new()
            }
        };

        let meshes = models
            .into_iter()
            .filter(|model| !model.mesh.indices.is_empty())
            .map(|model| convert_mesh(model.name, model.mesh))
            .collect::<RenderResult<Vec<_>>>()?;

        if meshes.is_empty() {
            return Err(RenderError::ImportFailed(format!("{} contains no triangles", path.display())));
        }
        log::debug!("Imported {} mesh(es), {} material(s) from {:?}", meshes.len(), materials.len(), path);

        Ok(ObjScene {
            meshes,
            materials,
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        })
    }
}

fn convert_mesh(name: String, mesh: tobj::Mesh) -> RenderResult<ObjMesh> {
    let vertex_count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() == mesh.positions.len();
    let has_uvs = mesh.texcoords.len() / 2 == vertex_count;

    let mut vertices: Vec<Vertex> = (0..vertex_count)
        .map(|i| {
            let position = [mesh.positions[3 * i], mesh.positions[3 * i + 1], mesh.positions[3 * i + 2]];
            let normal = if has_normals {
                [mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2]]
            } else {
                [0.0; 3]
            };
            let uv = if has_uvs {
                [mesh.texcoords[2 * i], mesh.texcoords[2 * i + 1]]
            } else {
                [0.0; 2]
            };
            Vertex::new(position, normal, uv)
        })
        .collect();

    if let Some(&index) = mesh.indices.iter().find(|&&index| index as usize >= vertex_count) {
        return Err(RenderError::ImportFailed(format!(
            "mesh '{name}' references vertex {index} of {vertex_count}"
        )));
    }

    if !has_normals {
        log::debug!("Generating normals for mesh '{}'", name);
        generate_normals(&mut vertices, &mesh.indices);
    }
    compute_tangents(&mut vertices, &mesh.indices);

    Ok(ObjMesh {
        name,
        vertices,
        indices: mesh.indices,
        material: mesh.material_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("prism_obj_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const QUAD: &str = "\
mtllib quad.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
usemtl painted
f 1/1 2/2 3/3 4/4
";

    const MTL: &str = "\
newmtl painted
Kd 0.8 0.1 0.1
Ns 198
map_Kd albedo.png
map_Bump normal.png
";

    #[test]
    fn test_quad_is_triangulated_with_generated_normals() {
        let dir = scratch_dir("quad");
        fs::write(dir.join("quad.obj"), QUAD).unwrap();
        fs::write(dir.join("quad.mtl"), MTL).unwrap();

        let scene = ObjLoader::load(dir.join("quad.obj")).unwrap();
        assert_eq!(scene.meshes.len(), 1);
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.vertices.len(), 4);
        for vertex in &mesh.vertices {
            assert_relative_eq!(vertex.normal[2], 1.0, epsilon = 1e-5);
            assert_relative_eq!(vertex.tangent[0], 1.0, epsilon = 1e-5);
        }
        assert_eq!(scene.base_dir, dir);
    }

    #[test]
    fn test_material_textures_map_to_slots() {
        let dir = scratch_dir("material");
        fs::write(dir.join("quad.obj"), QUAD).unwrap();
        fs::write(dir.join("quad.mtl"), MTL).unwrap();

        let scene = ObjLoader::load(dir.join("quad.obj")).unwrap();
        let material = &scene.materials[scene.meshes[0].material.unwrap()];
        assert_eq!(material.diffuse, Some([0.8, 0.1, 0.1]));
        assert!(material.textures.contains(&(MapSlot::Albedo, PathBuf::from("albedo.png"))));
        assert!(material.textures.contains(&(MapSlot::Normal, PathBuf::from("normal.png"))));
        assert_relative_eq!(material.roughness().unwrap(), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_missing_file_fails_import() {
        let result = ObjLoader::load("no/such/model.obj");
        assert!(matches!(result, Err(RenderError::ImportFailed(_))));
    }
}
