//! Models: ordered collections of meshes sharing one lifecycle

use std::collections::HashMap;
use std::path::Path;

use crate::assets::model_format::ModelFile;
use crate::assets::obj_loader::ObjLoader;
use crate::foundation::math::Vec3;
use crate::render::api::GpuDevice;
use crate::render::primitives::mesh::Mesh;
use crate::render::resources::gpu::ShaderProgram;
use crate::render::resources::materials::{
    MapSlot, Material, MaterialRef, ShadingModel, TextureCache, TextureImportOptions,
};
use crate::render::resources::Mappable;
use crate::render::{RenderError, RenderResult};

/// A set of meshes mapped, unmapped and drawn together
#[derive(Debug, Default)]
pub struct Model {
    meshes: Vec<Mesh>,
}

impl Model {
    /// Create an unmapped model from meshes
    pub fn new(meshes: Vec<Mesh>) -> Self {
        Self { meshes }
    }

    /// Meshes in draw order
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    /// Mutable access to the meshes, e.g. to swap materials
    pub fn meshes_mut(&mut self) -> &mut [Mesh] {
        &mut self.meshes
    }

    /// Total vertex count across meshes
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    /// Total index count across meshes
    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(Mesh::index_count).sum()
    }

    /// Load a binary model file
    ///
    /// Texture paths in the file are relative to the file's directory and are
    /// resolved through `cache`.
    pub fn load_from_file(
        path: impl AsRef<Path>,
        cache: &mut TextureCache,
        options: &TextureImportOptions,
    ) -> RenderResult<Self> {
        let path = path.as_ref();
        let file = ModelFile::read_from_file(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let model = Self::from_model_file(file, base_dir, cache, options)?;
        log::info!(
            "Loaded model {:?} ({} vertices, {} indices)",
            path,
            model.vertex_count(),
            model.index_count()
        );
        Ok(model)
    }

    /// Build a single-mesh model from parsed file contents
    pub fn from_model_file(
        file: ModelFile,
        base_dir: &Path,
        cache: &mut TextureCache,
        options: &TextureImportOptions,
    ) -> RenderResult<Self> {
        let ModelFile {
            shading_model,
            maps,
            vertices,
            indices,
        } = file;
        let material = Material::shared(shading_model);
        // Geometry is validated before any texture is uploaded
        let mesh = Mesh::new(vertices, indices, material.clone())?;
        for (relative, slot) in maps.iter().zip(MapSlot::FILE_ORDER) {
            if let Some(relative) = relative {
                cache.assign(&material, slot, base_dir.join(relative), options.linearize(slot))?;
            }
        }
        Ok(Self::new(vec![mesh]))
    }

    /// Import a Wavefront OBJ file
    ///
    /// Each OBJ material becomes one shared Blinn-Phong material whose
    /// textures are resolved through `cache`; meshes without a material get
    /// the defaults.
    pub fn import_obj(
        path: impl AsRef<Path>,
        cache: &mut TextureCache,
        options: &TextureImportOptions,
    ) -> RenderResult<Self> {
        let scene = ObjLoader::load(path.as_ref())?;

        let mut materials: HashMap<usize, MaterialRef> = HashMap::new();
        let mut meshes = Vec::with_capacity(scene.meshes.len());
        for obj_mesh in scene.meshes {
            let mut pending = None;
            let material = match obj_mesh.material.and_then(|id| scene.materials.get(id).map(|m| (id, m))) {
                Some((id, _)) if materials.contains_key(&id) => materials[&id].clone(),
                Some((id, source)) => {
                    let material = Material::shared(ShadingModel::BlinnPhong);
                    {
                        let mut material = material.borrow_mut();
                        if let Some(diffuse) = source.diffuse {
                            material.set_value(MapSlot::Albedo, Vec3::from(diffuse));
                        }
                        if let Some(specular) = source.specular {
                            material.set_value(MapSlot::Specular, Vec3::from(specular));
                        }
                        if let Some(roughness) = source.roughness() {
                            material.set_scalar(MapSlot::Roughness, roughness);
                        }
                        if let Some(ior) = source.optical_density {
                            material.set_scalar(MapSlot::Ior, ior);
                        }
                    }
                    pending = Some(&source.textures);
                    materials.insert(id, material.clone());
                    material
                }
                None => Material::shared(ShadingModel::BlinnPhong),
            };
            let mesh = Mesh::new(obj_mesh.vertices, obj_mesh.indices, material.clone())
                .map_err(|e| RenderError::ImportFailed(format!("mesh '{}': {e}", obj_mesh.name)))?;
            for (slot, relative) in pending.into_iter().flatten() {
                cache.assign(&material, *slot, scene.base_dir.join(relative), options.linearize(*slot))?;
            }
            meshes.push(mesh);
        }

        log::info!(
            "Imported {:?}: {} mesh(es), {} material(s)",
            path.as_ref(),
            meshes.len(),
            materials.len()
        );
        Ok(Self::new(meshes))
    }

    /// Draw every mesh with its own material
    ///
    /// Fails with [`RenderError::BuffersNotYetMapped`] before any draw if the
    /// model is not mapped.
    pub fn draw(&self, program: &ShaderProgram) -> RenderResult<()> {
        if !self.is_mapped() {
            return Err(RenderError::BuffersNotYetMapped);
        }
        for mesh in &self.meshes {
            mesh.draw(program)?;
        }
        Ok(())
    }
}

impl Mappable for Model {
    /// Map every mesh
    ///
    /// Fails with [`RenderError::BuffersAlreadyMapped`] if any mesh is already
    /// mapped. If a mesh fails to map, the meshes mapped before it are
    /// unmapped again.
    fn map(&mut self, device: &GpuDevice) -> RenderResult<()> {
        if self.meshes.iter().any(Mesh::is_mapped) {
            return Err(RenderError::BuffersAlreadyMapped);
        }
        for index in 0..self.meshes.len() {
            if let Err(e) = self.meshes[index].map(device) {
                for mesh in &mut self.meshes[..index] {
                    mesh.unmap()?;
                }
                return Err(e);
            }
        }
        log::debug!("Mapped model with {} mesh(es)", self.meshes.len());
        Ok(())
    }

    /// Unmap every mesh
    ///
    /// Fails with [`RenderError::BuffersNotYetMapped`] unless every mesh is mapped.
    fn unmap(&mut self) -> RenderResult<()> {
        if !self.is_mapped() {
            return Err(RenderError::BuffersNotYetMapped);
        }
        for mesh in &mut self.meshes {
            mesh.unmap()?;
        }
        Ok(())
    }

    /// True when every mesh is mapped; an empty model counts as mapped
    fn is_mapped(&self) -> bool {
        self.meshes.iter().all(Mesh::is_mapped)
    }
}
