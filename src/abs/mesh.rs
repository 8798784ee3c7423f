//! Mesh management module.
//!
//! This module defines the CPU-side [`MeshData`] (vertices in a runtime
//! [`VertexFormat`] plus optional indices) and the [`Mesh`] struct holding the
//! uploaded vertex array, vertex buffer and index buffer on the GPU side.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use thiserror::Error;

use crate::{
    abs::{BufferTarget, Device, ShaderProgram},
    error::SetupError,
};

/// A per-vertex attribute, in interleaving order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attribute {
    Position,
    Color,
    TexCoord,
}

impl Attribute {
    /// The shader input this attribute is fed into.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Position => "position",
            Attribute::Color => "color",
            Attribute::TexCoord => "texcoord",
        }
    }

    /// Number of `f32` components.
    pub fn components(self) -> usize {
        match self {
            Attribute::Position => 2,
            Attribute::Color => 3,
            Attribute::TexCoord => 2,
        }
    }
}

/// Which optional attributes a vertex record carries. Position is always present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexFormat {
    pub color: bool,
    pub texcoord: bool,
}

impl VertexFormat {
    /// Position, color and texture coordinate.
    #[cfg(test)]
    pub const FULL: Self = Self {
        color: true,
        texcoord: true,
    };

    /// The attributes present in this format, in interleaving order.
    pub fn attributes(self) -> impl Iterator<Item = Attribute> {
        [
            Some(Attribute::Position),
            self.color.then_some(Attribute::Color),
            self.texcoord.then_some(Attribute::TexCoord),
        ]
        .into_iter()
        .flatten()
    }

    /// Size of one vertex record in bytes.
    pub fn stride(self) -> usize {
        self.floats_per_vertex() * size_of::<f32>()
    }

    pub fn floats_per_vertex(self) -> usize {
        self.attributes().map(Attribute::components).sum()
    }

    /// Byte offset of `attribute` inside a vertex record, if the format has it.
    pub fn offset_of(self, attribute: Attribute) -> Option<usize> {
        let mut offset = 0;
        for present in self.attributes() {
            if present == attribute {
                return Some(offset);
            }
            offset += present.components() * size_of::<f32>();
        }
        None
    }
}

/// A single vertex. Optional attributes are only read if the mesh format has them.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec2,
    pub color: Option<Vec3>,
    pub texcoord: Option<Vec2>,
}

impl Vertex {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_texcoord(mut self, texcoord: Vec2) -> Self {
        self.texcoord = Some(texcoord);
        self
    }
}

/// Problems found while validating mesh data before upload.
#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    Empty,
    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("vertex {vertex} has no {attribute:?} attribute but the format requires one")]
    MissingAttribute { vertex: usize, attribute: Attribute },
}

/// Vertices in a fixed format plus an optional index list. Triangles are implied.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub format: VertexFormat,
    pub vertices: Vec<Vertex>,
    pub indices: Option<Vec<u32>>,
}

impl MeshData {
    /// Checks that every index refers to an existing vertex and that every vertex
    /// carries the attributes its format requires.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.vertices.is_empty() {
            return Err(MeshError::Empty);
        }
        let vertex_count = self.vertices.len();
        for (position, &index) in self.indices.iter().flatten().enumerate() {
            if index as usize >= vertex_count {
                return Err(MeshError::IndexOutOfRange {
                    position,
                    index,
                    vertex_count,
                });
            }
        }
        for (vertex, v) in self.vertices.iter().enumerate() {
            if self.format.color && v.color.is_none() {
                return Err(MeshError::MissingAttribute {
                    vertex,
                    attribute: Attribute::Color,
                });
            }
            if self.format.texcoord && v.texcoord.is_none() {
                return Err(MeshError::MissingAttribute {
                    vertex,
                    attribute: Attribute::TexCoord,
                });
            }
        }
        Ok(())
    }

    /// Packs the vertices into one interleaved `f32` stream following the format.
    pub fn interleave(&self) -> Result<Vec<f32>, MeshError> {
        self.validate()?;
        let mut data = Vec::with_capacity(self.vertices.len() * self.format.floats_per_vertex());
        for v in &self.vertices {
            data.extend_from_slice(&v.position.to_array());
            if self.format.color {
                data.extend_from_slice(&v.color.unwrap_or_default().to_array());
            }
            if self.format.texcoord {
                data.extend_from_slice(&v.texcoord.unwrap_or_default().to_array());
            }
        }
        Ok(data)
    }
}

/// Represents a mesh stored on the GPU side.
pub struct Mesh<D: Device> {
    device: Arc<D>,
    format: VertexFormat,
    vao: D::VertexArray,
    vbo: D::Buffer,
    ebo: Option<D::Buffer>,
    vertex_count: usize,
    index_count: usize,
}

impl<D: Device> Mesh<D> {
    /// Validates `data` and uploads it into freshly created static buffers.
    pub fn new(device: &Arc<D>, data: &MeshData) -> Result<Self, SetupError> {
        let vertices = data.interleave()?;
        let vao = device
            .create_vertex_array()
            .map_err(|message| SetupError::resource("vertex array", message))?;
        let vbo = match device.create_buffer() {
            Ok(vbo) => vbo,
            Err(message) => {
                device.delete_vertex_array(vao);
                return Err(SetupError::resource("vertex buffer", message));
            }
        };
        // From here on `mesh` owns what has been created, so an early return releases it.
        let mut mesh = Self {
            device: Arc::clone(device),
            format: data.format,
            vao,
            vbo,
            ebo: None,
            vertex_count: data.vertices.len(),
            index_count: 0,
        };

        device.bind_vertex_array(Some(vao));
        device.bind_buffer(BufferTarget::Vertex, Some(mesh.vbo));
        device.buffer_data(BufferTarget::Vertex, bytemuck::cast_slice(&vertices));

        if let Some(indices) = &data.indices {
            let ebo = device
                .create_buffer()
                .map_err(|message| SetupError::resource("index buffer", message))?;
            mesh.ebo = Some(ebo);
            mesh.index_count = indices.len();
            device.bind_buffer(BufferTarget::Index, Some(ebo));
            device.buffer_data(BufferTarget::Index, bytemuck::cast_slice(indices));
        }

        device.bind_vertex_array(None);
        device.bind_buffer(BufferTarget::Vertex, None);

        if let Some(code) = device.take_error() {
            return Err(SetupError::resource(
                "mesh buffers",
                format!("device error 0x{code:04X} after upload"),
            ));
        }

        Ok(mesh)
    }

    /// Points every attribute of the vertex format at its place in the vertex buffer.
    ///
    /// Attributes the program does not expose are skipped: the shader compiler drops
    /// inputs that the shader never reads.
    pub fn bind_layout(&self, program: &ShaderProgram<D>) {
        let stride = self.format.stride() as i32;
        self.device.bind_vertex_array(Some(self.vao));
        self.device.bind_buffer(BufferTarget::Vertex, Some(self.vbo));
        for attribute in self.format.attributes() {
            let Some(offset) = self.format.offset_of(attribute) else {
                continue;
            };
            match program.attribute(attribute.name()) {
                Some(slot) => program.set_attribute_layout(
                    slot,
                    attribute.components() as i32,
                    stride,
                    offset as i32,
                ),
                None => log::debug!(
                    "program has no `{}` input, attribute left unbound",
                    attribute.name()
                ),
            }
        }
        self.device.bind_vertex_array(None);
        self.device.bind_buffer(BufferTarget::Vertex, None);
    }

    /// Draws the mesh as triangles, indexed if an index buffer was uploaded.
    pub fn draw(&self) {
        self.device.bind_vertex_array(Some(self.vao));
        if self.ebo.is_some() {
            self.device.draw_elements_u32(self.index_count as i32);
        } else {
            self.device.draw_arrays(self.vertex_count as i32);
        }
        self.device.bind_vertex_array(None);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Returns the amount of indices used in the mesh, 0 for non-indexed meshes.
    pub fn index_count(&self) -> usize {
        self.index_count
    }
}

impl<D: Device> Drop for Mesh<D> {
    fn drop(&mut self) {
        if let Some(ebo) = self.ebo {
            self.device.delete_buffer(ebo);
        }
        self.device.delete_buffer(self.vbo);
        self.device.delete_vertex_array(self.vao);
    }
}
