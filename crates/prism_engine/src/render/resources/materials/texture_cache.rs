//! Texture cache
//!
//! Owns every texture uploaded for materials. Uploads are deduplicated by
//! source path, and each texture remembers which materials refer to it so that
//! freeing it can clear those references.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Weak;
use std::cell::RefCell;

use crate::assets::image_loader::{ImageFileLoader, TextureLoader};
use crate::render::api::{GpuDevice, TextureDescriptor, TextureHandle};
use crate::render::resources::gpu::GpuTexture;
use crate::render::RenderResult;

use super::material::{MapSlot, Material, MaterialId, MaterialRef};

#[derive(Debug)]
struct CachedTexture {
    texture: GpuTexture,
    path: PathBuf,
    consumers: HashMap<MaterialId, Weak<RefCell<Material>>>,
}

/// Path-deduplicated texture store with consumer tracking
pub struct TextureCache {
    device: GpuDevice,
    loader: Box<dyn TextureLoader>,
    paths: HashMap<PathBuf, TextureHandle>,
    textures: HashMap<TextureHandle, CachedTexture>,
}

impl std::fmt::Debug for TextureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureCache")
            .field("device", &self.device)
            .field("textures", &self.textures.len())
            .finish()
    }
}

impl TextureCache {
    /// Create an empty cache that decodes files with the `image` crate
    pub fn new(device: &GpuDevice) -> Self {
        Self::with_loader(device, Box::new(ImageFileLoader))
    }

    /// Create an empty cache with a custom decoder
    pub fn with_loader(device: &GpuDevice, loader: Box<dyn TextureLoader>) -> Self {
        Self {
            device: device.clone(),
            loader,
            paths: HashMap::new(),
            textures: HashMap::new(),
        }
    }

    /// Handle for the texture at `path`, decoding and uploading it on first use
    ///
    /// `linearize` requests gamma-to-linear conversion on upload. It only
    /// applies to the first request for a path; later requests return the
    /// cached texture as it was uploaded.
    pub fn get_handle(&mut self, path: impl AsRef<Path>, linearize: bool) -> RenderResult<TextureHandle> {
        let path = path.as_ref();
        if let Some(&handle) = self.paths.get(path) {
            log::debug!("Texture cache hit: {:?} -> {}", path, handle);
            return Ok(handle);
        }

        let image = self.loader.load(path)?;
        let descriptor = TextureDescriptor::material(image.width, image.height, image.format, linearize);
        let texture = GpuTexture::new(&self.device, descriptor, &image.data)?;
        let handle = texture.handle();
        log::debug!(
            "Uploaded texture {:?} ({}x{} {:?}) as {}",
            path,
            image.width,
            image.height,
            image.format,
            handle
        );

        self.paths.insert(path.to_path_buf(), handle);
        self.textures.insert(
            handle,
            CachedTexture {
                texture,
                path: path.to_path_buf(),
                consumers: HashMap::new(),
            },
        );
        Ok(handle)
    }

    /// Like [`TextureCache::get_handle`], also registering `consumer` for invalidation
    pub fn get_handle_for(
        &mut self,
        path: impl AsRef<Path>,
        linearize: bool,
        consumer: &MaterialRef,
    ) -> RenderResult<TextureHandle> {
        let handle = self.get_handle(path, linearize)?;
        self.register_consumer(handle, consumer);
        Ok(handle)
    }

    /// Load the texture at `path` into `slot` of `material`
    pub fn assign(
        &mut self,
        material: &MaterialRef,
        slot: MapSlot,
        path: impl AsRef<Path>,
        linearize: bool,
    ) -> RenderResult<TextureHandle> {
        let handle = self.get_handle_for(path, linearize, material)?;
        material.borrow_mut().set_texture(slot, Some(handle));
        Ok(handle)
    }

    /// Record that `consumer` refers to `handle`
    ///
    /// Returns `false` if the cache does not own `handle`.
    pub fn register_consumer(&mut self, handle: TextureHandle, consumer: &MaterialRef) -> bool {
        match self.textures.get_mut(&handle) {
            Some(entry) => {
                let id = consumer.borrow().id();
                entry.consumers.insert(id, std::rc::Rc::downgrade(consumer));
                true
            }
            None => false,
        }
    }

    /// Release a texture and clear it from every material that uses it
    ///
    /// Returns `false` if the cache does not own `handle`.
    pub fn free_texture(&mut self, handle: TextureHandle) -> bool {
        let Some(entry) = self.textures.remove(&handle) else {
            log::warn!("Attempted to free unknown texture {}", handle);
            return false;
        };
        self.paths.remove(&entry.path);

        let mut cleared = 0;
        for material in entry.consumers.values().filter_map(Weak::upgrade) {
            cleared += material.borrow_mut().remove_texture(handle);
        }
        log::debug!("Freed texture {} ({:?}), cleared {} slot(s)", handle, entry.path, cleared);
        // Dropping the entry releases the GPU texture
        drop(entry.texture);
        true
    }

    /// Whether `path` has been uploaded
    pub fn contains_path(&self, path: impl AsRef<Path>) -> bool {
        self.paths.contains_key(path.as_ref())
    }

    /// Source path of a cached texture
    pub fn path_of(&self, handle: TextureHandle) -> Option<&Path> {
        self.textures.get(&handle).map(|entry| entry.path.as_path())
    }

    /// Upload parameters of a cached texture
    pub fn descriptor(&self, handle: TextureHandle) -> Option<&TextureDescriptor> {
        self.textures.get(&handle).map(|entry| entry.texture.descriptor())
    }

    /// Number of live materials registered against `handle`
    pub fn consumer_count(&self, handle: TextureHandle) -> usize {
        self.textures
            .get(&handle)
            .map_or(0, |entry| entry.consumers.values().filter(|c| c.strong_count() > 0).count())
    }

    /// Number of cached textures
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether the cache holds no textures
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Device the textures live on
    pub fn device(&self) -> &GpuDevice {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::image_loader::ImageData;
    use crate::render::backends::headless::HeadlessBackend;
    use crate::render::resources::materials::ShadingModel;
    use crate::render::RenderError;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Produces a 2x2 image for any path except ones containing "missing"
    struct CountingLoader {
        decodes: Rc<Cell<usize>>,
    }

    impl TextureLoader for CountingLoader {
        fn load(&self, path: &Path) -> RenderResult<ImageData> {
            self.decodes.set(self.decodes.get() + 1);
            if path.to_string_lossy().contains("missing") {
                return Err(RenderError::CannotLoadTexture {
                    path: path.display().to_string(),
                    reason: "not found".into(),
                });
            }
            Ok(ImageData::solid_color(2, 2, [255, 255, 255, 255]))
        }
    }

    fn cache() -> (Rc<HeadlessBackend>, TextureCache, Rc<Cell<usize>>) {
        let backend = Rc::new(HeadlessBackend::new());
        let device: GpuDevice = backend.clone();
        let decodes = Rc::new(Cell::new(0));
        let loader = CountingLoader { decodes: decodes.clone() };
        (backend, TextureCache::with_loader(&device, Box::new(loader)), decodes)
    }

    #[test]
    fn test_same_path_decodes_once() {
        let (backend, mut cache, decodes) = cache();
        let first = cache.get_handle("textures/brick.png", true).unwrap();
        let second = cache.get_handle("textures/brick.png", true).unwrap();

        assert_eq!(first, second);
        assert_eq!(decodes.get(), 1);
        assert_eq!(backend.live_textures(), 1);
    }

    #[test]
    fn test_distinct_paths_get_distinct_handles() {
        let (_backend, mut cache, decodes) = cache();
        let a = cache.get_handle("a.png", false).unwrap();
        let b = cache.get_handle("b.png", false).unwrap();
        assert_ne!(a, b);
        assert_eq!(decodes.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failed_decode_is_not_cached() {
        let (backend, mut cache, decodes) = cache();
        assert!(matches!(
            cache.get_handle("missing.png", false),
            Err(RenderError::CannotLoadTexture { .. })
        ));
        assert!(cache.get_handle("missing.png", false).is_err());
        assert_eq!(decodes.get(), 2);
        assert!(cache.is_empty());
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_linearize_selects_srgb_upload() {
        let (backend, mut cache, _) = cache();
        let color = cache.get_handle("albedo.png", true).unwrap();
        let data = cache.get_handle("normal.png", false).unwrap();
        assert!(backend.texture_descriptor(color).unwrap().srgb);
        assert!(!backend.texture_descriptor(data).unwrap().srgb);
        assert!(backend.texture_descriptor(color).unwrap().generate_mipmaps);
    }

    #[test]
    fn test_free_clears_every_consumer_slot() {
        let (backend, mut cache, decodes) = cache();
        let first = Material::shared(ShadingModel::CookTorrance);
        let second = Material::shared(ShadingModel::BlinnPhong);

        let handle = cache.assign(&first, MapSlot::Albedo, "shared.png", true).unwrap();
        cache.assign(&first, MapSlot::Specular, "shared.png", true).unwrap();
        cache.assign(&second, MapSlot::Roughness, "shared.png", false).unwrap();
        assert_eq!(cache.consumer_count(handle), 2);

        assert!(cache.free_texture(handle));
        assert_eq!(first.borrow().texture(MapSlot::Albedo), None);
        assert_eq!(first.borrow().texture(MapSlot::Specular), None);
        assert_eq!(second.borrow().texture(MapSlot::Roughness), None);
        assert!(!backend.is_texture_alive(handle));
        assert!(!cache.contains_path("shared.png"));

        // The path is uploaded again on the next request
        cache.get_handle("shared.png", true).unwrap();
        assert_eq!(decodes.get(), 2);
    }

    #[test]
    fn test_cloned_material_is_tracked_separately() {
        let (_backend, mut cache, _) = cache();
        let base = Material::new(ShadingModel::BlinnPhong);
        let copy = base.clone().into_shared();
        let original = base.into_shared();

        let handle = cache.assign(&copy, MapSlot::Albedo, "a.png", true).unwrap();
        assert_eq!(cache.assign(&original, MapSlot::Albedo, "a.png", true).unwrap(), handle);
        assert_eq!(cache.consumer_count(handle), 2);

        assert!(cache.free_texture(handle));
        assert_eq!(copy.borrow().texture(MapSlot::Albedo), None);
        assert_eq!(original.borrow().texture(MapSlot::Albedo), None);
    }

    #[test]
    fn test_free_unknown_handle() {
        let (_backend, mut cache, _) = cache();
        assert!(!cache.free_texture(TextureHandle(99)));
    }

    #[test]
    fn test_dropped_consumers_are_skipped() {
        let (_backend, mut cache, _) = cache();
        let material = Material::shared(ShadingModel::BlinnPhong);
        let handle = cache.assign(&material, MapSlot::Normal, "normal.png", false).unwrap();
        drop(material);

        assert_eq!(cache.consumer_count(handle), 0);
        assert!(cache.free_texture(handle));
    }

    #[test]
    fn test_dropping_cache_releases_textures() {
        let (backend, mut cache, _) = cache();
        cache.get_handle("a.png", false).unwrap();
        cache.get_handle("b.png", false).unwrap();
        drop(cache);
        assert_eq!(backend.live_textures(), 0);
    }
}
