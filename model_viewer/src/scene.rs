//! Scene assembled from a [`ViewerConfig`]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use prism_engine::prelude::*;
use prism_engine::render::resources::ModelRef;

use crate::config::{InstanceEntry, ModelEntry, ViewerConfig};
use crate::ViewerResult;

/// An instance plus its animation
struct Placed {
    instance: ModelInstance,
    base_rotation: Quat,
    spin: f32,
}

/// Loaded models, their instances and the lights
pub struct Scene {
    // Keeps textures alive for the models' materials
    _textures: TextureCache,
    models: HashMap<String, ModelRef>,
    placed: Vec<Placed>,
    point_lights: Vec<PointLight>,
    environment: Option<Environment>,
}

impl Scene {
    /// Load every model, light and environment the configuration names
    ///
    /// Models that fail to load are replaced by a cube so the rest of the
    /// scene still shows up.
    pub fn load(config: &ViewerConfig, device: &GpuDevice, renderer: &mut Renderer) -> ViewerResult<Self> {
        let mut textures = TextureCache::new(device);
        let options = TextureImportOptions::default();

        let mut models = HashMap::new();
        for entry in &config.models {
            let mut model = load_model(entry, &mut textures, &options).unwrap_or_else(|e| {
                log::warn!("Failed to load model '{}' from {}: {}", entry.name, entry.path.display(), e);
                fallback_cube()
            });
            model.map(device)?;
            log::info!("Model '{}' ready ({} meshes)", entry.name, model.meshes().len());
            models.insert(entry.name.clone(), Rc::new(RefCell::new(model)));
        }

        for name in config.dangling_instances() {
            log::warn!("Instance refers to unknown model '{name}'; skipping");
        }

        let mut placed: Vec<Placed> = config
            .instances
            .iter()
            .filter_map(|entry| models.get(&entry.model).map(|model| place(entry, model.clone())))
            .collect();

        if placed.is_empty() {
            log::info!("No instances configured, showing a cube");
            let mut cube = fallback_cube();
            cube.map(device)?;
            let cube = Rc::new(RefCell::new(cube));
            placed.push(place(&InstanceEntry::default(), cube.clone()));
            models.insert("cube".to_string(), cube);
        }

        let mut point_lights = Vec::new();
        for entry in &config.point_lights {
            let [constant, linear, quadratic] = entry.attenuation;
            let light = PointLight::new(
                Vec3::from(entry.position),
                Vec3::from(entry.irradiance),
                constant,
                linear,
                quadratic,
            );
            match renderer.add_point_light(&light) {
                Ok(slot) => {
                    log::debug!("Point light at {:?} in slot {}", entry.position, slot);
                    point_lights.push(light);
                }
                Err(RenderError::TooManyLights) => {
                    log::warn!("Ignoring point light at {:?}: all slots are taken", entry.position);
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(sun) = &config.directional_light {
            renderer.set_directional_light(&DirectionalLight::new(
                Vec3::from(sun.direction),
                Vec3::from(sun.irradiance),
            ));
        }

        let environment = match &config.environment {
            Some(entry) => Some(Environment::load(device, &entry.path, entry.skybox_blur)?),
            None => None,
        };

        Ok(Self {
            _textures: textures,
            models,
            placed,
            point_lights,
            environment,
        })
    }

    /// Advance instance animation to `elapsed` seconds
    pub fn update(&mut self, elapsed: f32) {
        for placed in &mut self.placed {
            if placed.spin != 0.0 {
                let angle = (placed.spin * elapsed).to_radians();
                placed.instance.rotation = Quat::from_axis_angle(&Vec3::y_axis(), angle) * placed.base_rotation;
                placed.instance.update();
            }
        }
    }

    /// Record and present one frame
    pub fn render(&self, renderer: &mut Renderer, camera: &Camera, surface: &mut dyn Surface) -> ViewerResult<()> {
        let environment = self.environment.as_ref();
        renderer.prepare_render(camera, environment)?;
        for placed in &self.placed {
            renderer.render_model(&placed.instance, environment)?;
        }
        renderer.finish_render(surface)?;
        Ok(())
    }

    /// Number of drawn instances
    pub fn instance_count(&self) -> usize {
        self.placed.len()
    }

    /// Number of loaded models, including the fallback cube
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Number of point lights that got a slot
    pub fn point_light_count(&self) -> usize {
        self.point_lights.len()
    }
}

fn load_model(entry: &ModelEntry, textures: &mut TextureCache, options: &TextureImportOptions) -> RenderResult<Model> {
    if entry.is_obj() {
        Model::import_obj(&entry.path, textures, options)
    } else {
        Model::load_from_file(&entry.path, textures, options)
    }
}

fn place(entry: &InstanceEntry, model: ModelRef) -> Placed {
    let [roll, pitch, yaw] = entry.rotation.map(f32::to_radians);
    let base_rotation = Quat::from_euler_angles(roll, pitch, yaw);

    let mut instance = ModelInstance::new(model);
    instance.position = Vec3::from(entry.position);
    instance.scale = Vec3::from(entry.scale);
    instance.rotation = base_rotation;
    instance.override_color = entry.color.map(|[r, g, b, a]| Color::rgba(r, g, b, a));
    instance.update();

    Placed {
        instance,
        base_rotation,
        spin: entry.spin,
    }
}

/// Unit cube with per-face normals and a default material
fn fallback_cube() -> Model {
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, up, right) in FACES {
        let [n, u, r] = [normal, up, right].map(Vec3::from);
        let base = vertices.len() as u32;
        for (s, t) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (n + r * s + u * t) * 0.5;
            vertices.push(Vertex::new([p.x, p.y, p.z], normal, [(s + 1.0) * 0.5, (t + 1.0) * 0.5]));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    prism_engine::render::primitives::compute_tangents(&mut vertices, &indices);

    match Mesh::new(vertices, indices, Material::shared(ShadingModel::BlinnPhong)) {
        Ok(mesh) => Model::new(vec![mesh]),
        Err(e) => {
            log::error!("Cube geometry rejected: {e}");
            Model::new(Vec::new())
        }
    }
}
