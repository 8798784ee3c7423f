//! The static scene: geometry and textures uploaded once, the program that draws
//! them, and the five presets the pipeline can be configured as.

use std::{fmt, sync::Arc};

use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::{
    abs::{
        Device, Mesh, MeshData, ShaderProgram, Texture, TextureImage, UniformSlot, Vertex,
        VertexFormat,
    },
    error::SetupError,
    transform::{Camera, Transform},
};

/// Name of the single fragment output every preset's fragment stage declares.
pub const FRAGMENT_OUTPUT: &str = "outColor";

/// Sampler uniform names, indexed by texture unit.
pub const SAMPLERS: [&str; 2] = ["texKitten", "texPuppy"];

pub const KITTEN_PNG: &[u8] = include_bytes!("assets/kitten.png");
pub const PUPPY_PNG: &[u8] = include_bytes!("assets/puppy.png");

macro_rules! shader_sources {
    ($name:literal) => {
        (
            include_str!(concat!("shaders/", $name, "/vert.glsl")),
            include_str!(concat!("shaders/", $name, "/frag.glsl")),
        )
    };
}

/// Owns the uploaded mesh and textures.
pub struct SceneStore<D: Device> {
    textures: Vec<Texture<D>>,
    mesh: Mesh<D>,
}

impl<D: Device> SceneStore<D> {
    /// Uploads `mesh`, then each texture in order. Texture `i` is sampled from unit `i`.
    pub fn build(
        device: &Arc<D>,
        mesh: MeshData,
        textures: Vec<TextureImage>,
    ) -> Result<Self, SetupError> {
        let mesh = Mesh::new(device, &mesh)?;
        let textures = textures
            .into_iter()
            .map(|image| Texture::new(device, image))
            .collect::<Result<Vec<_>, _>>()?;
        log::info!(
            "uploaded {} vertices, {} indices, {} textures",
            mesh.vertex_count(),
            mesh.index_count(),
            textures.len()
        );
        Ok(Self { textures, mesh })
    }

    /// Points the program's vertex inputs at the vertex buffer.
    pub fn bind_layout(&self, program: &ShaderProgram<D>) {
        self.mesh.bind_layout(program);
    }

    /// Binds every texture to its unit and draws the mesh.
    pub fn draw(&self) {
        for (unit, texture) in self.textures.iter().enumerate() {
            texture.bind_to_unit(unit as u32);
        }
        self.mesh.draw();
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

impl<D: Device> Drop for SceneStore<D> {
    fn drop(&mut self) {
        // Newest first; the mesh goes last when the fields are dropped.
        while let Some(texture) = self.textures.pop() {
            drop(texture);
        }
    }
}

/// One of the exercise programs, from a plain triangle up to the spinning quad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    Triangle,
    ColoredTriangle,
    TexturedQuad,
    IndexedQuad,
    #[default]
    SpinningQuad,
}

/// What a preset switches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Features {
    pub format: VertexFormat,
    pub indexed: bool,
    pub textures: usize,
    pub transform: bool,
}

impl Preset {
    #[cfg(test)]
    pub const ALL: [Preset; 5] = [
        Preset::Triangle,
        Preset::ColoredTriangle,
        Preset::TexturedQuad,
        Preset::IndexedQuad,
        Preset::SpinningQuad,
    ];

    pub fn features(self) -> Features {
        let (color, texcoord, indexed, textures, transform) = match self {
            Preset::Triangle => (false, false, false, 0, false),
            Preset::ColoredTriangle => (true, false, false, 0, false),
            Preset::TexturedQuad => (true, true, false, 1, false),
            Preset::IndexedQuad => (true, true, true, 2, false),
            Preset::SpinningQuad => (true, true, true, 2, true),
        };
        Features {
            format: VertexFormat { color, texcoord },
            indexed,
            textures,
            transform,
        }
    }

    /// Vertex and fragment sources, GLSL 150 core.
    pub fn shader_sources(self) -> (&'static str, &'static str) {
        match self {
            Preset::Triangle => shader_sources!("triangle"),
            Preset::ColoredTriangle => shader_sources!("colored_triangle"),
            Preset::TexturedQuad => shader_sources!("textured_quad"),
            Preset::IndexedQuad => shader_sources!("indexed_quad"),
            Preset::SpinningQuad => shader_sources!("spinning_quad"),
        }
    }

    /// The geometry this preset draws.
    pub fn mesh(self) -> MeshData {
        let features = self.features();
        let vertices = match self {
            Preset::Triangle => vec![
                Vertex::new(Vec2::new(0.0, 0.5)),
                Vertex::new(Vec2::new(0.5, -0.5)),
                Vertex::new(Vec2::new(-0.5, -0.5)),
            ],
            Preset::ColoredTriangle => vec![
                Vertex::new(Vec2::new(0.0, 0.5)).with_color(Vec3::X),
                Vertex::new(Vec2::new(0.5, -0.5)).with_color(Vec3::Y),
                Vertex::new(Vec2::new(-0.5, -0.5)).with_color(Vec3::Z),
            ],
            Preset::TexturedQuad => {
                let corners = quad_corners();
                [0, 1, 2, 2, 3, 0].iter().map(|&i| corners[i]).collect()
            }
            Preset::IndexedQuad | Preset::SpinningQuad => quad_corners().to_vec(),
        };
        MeshData {
            format: features.format,
            vertices,
            indices: features.indexed.then(|| vec![0, 1, 2, 2, 3, 0]),
        }
    }

    /// Everything needed to build this preset's pipeline. `textures` must hold as many
    /// images as the preset samples.
    pub fn desc(
        self,
        textures: Vec<TextureImage>,
        camera: &Camera,
        aspect: f32,
    ) -> Result<PipelineDesc, SetupError> {
        let features = self.features();
        if textures.len() != features.textures {
            return Err(SetupError::Config(format!(
                "preset {self} samples {} textures, {} given",
                features.textures,
                textures.len()
            )));
        }
        let (vertex_source, fragment_source) = self.shader_sources();
        Ok(PipelineDesc {
            mesh: self.mesh(),
            vertex_source,
            fragment_source,
            textures,
            transform: features.transform.then(|| Transform::new(camera, aspect)),
        })
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Preset::Triangle => "triangle",
            Preset::ColoredTriangle => "colored-triangle",
            Preset::TexturedQuad => "textured-quad",
            Preset::IndexedQuad => "indexed-quad",
            Preset::SpinningQuad => "spinning-quad",
        };
        f.write_str(name)
    }
}

/// Top-left, top-right, bottom-right, bottom-left.
fn quad_corners() -> [Vertex; 4] {
    [
        Vertex::new(Vec2::new(-0.5, 0.5))
            .with_color(Vec3::X)
            .with_texcoord(Vec2::new(0.0, 0.0)),
        Vertex::new(Vec2::new(0.5, 0.5))
            .with_color(Vec3::Y)
            .with_texcoord(Vec2::new(1.0, 0.0)),
        Vertex::new(Vec2::new(0.5, -0.5))
            .with_color(Vec3::Z)
            .with_texcoord(Vec2::new(1.0, 1.0)),
        Vertex::new(Vec2::new(-0.5, -0.5))
            .with_color(Vec3::ONE)
            .with_texcoord(Vec2::new(0.0, 1.0)),
    ]
}

/// Inputs of [`Pipeline::build`].
pub struct PipelineDesc {
    pub mesh: MeshData,
    pub vertex_source: &'static str,
    pub fragment_source: &'static str,
    pub textures: Vec<TextureImage>,
    /// Present when the vertex stage consumes `model`, `view` and `proj`.
    pub transform: Option<Transform>,
}

/// A ready-to-draw scene: store plus linked program with its samplers and matrices set.
pub struct Pipeline<D: Device> {
    device: Arc<D>,
    model: Option<UniformSlot<D::UniformLocation>>,
    // Created after the store, so released before it.
    program: ShaderProgram<D>,
    store: SceneStore<D>,
}

impl<D: Device> Pipeline<D> {
    /// Uploads the scene, links the program and sets every uniform it needs. Fails
    /// before touching the device if more textures are given than there are samplers.
    pub fn build(device: &Arc<D>, desc: PipelineDesc) -> Result<Self, SetupError> {
        if desc.textures.len() > SAMPLERS.len() {
            return Err(SetupError::Config(format!(
                "{} textures given, the fragment stage samples at most {}",
                desc.textures.len(),
                SAMPLERS.len()
            )));
        }

        let store = SceneStore::build(device, desc.mesh, desc.textures)?;
        let program = ShaderProgram::build(
            device,
            desc.vertex_source,
            desc.fragment_source,
            FRAGMENT_OUTPUT,
        )?;
        store.bind_layout(&program);

        for (unit, name) in SAMPLERS.iter().take(store.texture_count()).enumerate() {
            let slot = require_uniform(&program, name)?;
            program.set_uniform_sampler(&slot, unit as u32);
        }

        let model = match desc.transform {
            Some(transform) => {
                let model = require_uniform(&program, "model")?;
                program.set_uniform_matrix(&require_uniform(&program, "view")?, transform.view);
                program.set_uniform_matrix(&require_uniform(&program, "proj")?, transform.proj);
                program.set_uniform_matrix(&model, transform.model);
                Some(model)
            }
            None => None,
        };

        Ok(Self {
            device: Arc::clone(device),
            model,
            program,
            store,
        })
    }

    /// Clears the color buffer of the bound framebuffer.
    pub fn clear(&self, rgba: [f32; 4]) {
        self.device.clear_color(rgba);
    }

    /// Activates the program and draws the scene once.
    pub fn draw(&self) {
        self.program.use_program();
        self.store.draw();
    }

    /// Whether the program consumes a model matrix.
    pub fn has_transform(&self) -> bool {
        self.model.is_some()
    }

    /// Replaces the model matrix. Does nothing for presets without a transform.
    pub fn set_model(&self, model: Mat4) {
        if let Some(slot) = &self.model {
            self.program.set_uniform_matrix(slot, model);
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &SceneStore<D> {
        &self.store
    }
}

fn require_uniform<D: Device>(
    program: &ShaderProgram<D>,
    name: &str,
) -> Result<UniformSlot<D::UniformLocation>, SetupError> {
    program
        .uniform(name)
        .ok_or_else(|| SetupError::MissingUniform(name.to_string()))
}
