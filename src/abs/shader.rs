//! OpenGL Shaders
//!
//! This module defines the [`Shader`] and [`ShaderProgram`] structs for managing shader
//! stages and linked programs, along with the [`AttributeSlot`] and [`UniformSlot`]
//! handles a linked program hands out for its named inputs.

use std::{cell::RefCell, sync::Arc};

use fxhash::FxHashMap;
use glam::Mat4;

use crate::{
    abs::{Device, ShaderStage},
    error::SetupError,
};

/// Represents an individual compiled shader stage.
pub struct Shader<D: Device> {
    device: Arc<D>,
    id: D::Shader,
}

impl<D: Device> Shader<D> {
    /// Compiles a new shader stage from the given source code.
    pub fn new(device: &Arc<D>, stage: ShaderStage, source: &str) -> Result<Self, SetupError> {
        let shader = device
            .create_shader(stage)
            .map_err(|message| SetupError::resource("shader", message))?;
        device.shader_source(shader, source);
        device.compile_shader(shader);

        if !device.shader_compile_status(shader) {
            let log = device.shader_info_log(shader);
            device.delete_shader(shader);
            return Err(SetupError::Compile { stage, log });
        }

        Ok(Self {
            device: Arc::clone(device),
            id: shader,
        })
    }
}

impl<D: Device> Drop for Shader<D> {
    fn drop(&mut self) {
        self.device.delete_shader(self.id);
    }
}

/// A per-vertex input location of a linked program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttributeSlot(pub u32);

/// A uniform location of a linked program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniformSlot<L>(pub L);

/// A linked program made of a vertex and a fragment stage.
///
/// A value of this type only exists once linking succeeded, so slots can only be
/// resolved against a linked program. Lookups are cached: asking for the same name
/// twice returns the identical slot.
pub struct ShaderProgram<D: Device> {
    device: Arc<D>,
    id: D::Program,
    attributes: RefCell<FxHashMap<String, Option<AttributeSlot>>>,
    uniforms: RefCell<FxHashMap<String, Option<D::UniformLocation>>>,
    // Dropped after the program itself is deleted, newest stage first.
    _frag: Shader<D>,
    _vert: Shader<D>,
}

impl<D: Device> ShaderProgram<D> {
    /// Compiles both stages, binds `output` to fragment output 0 and links them.
    pub fn build(
        device: &Arc<D>,
        vertex_source: &str,
        fragment_source: &str,
        output: &str,
    ) -> Result<Self, SetupError> {
        let vert = Shader::new(device, ShaderStage::Vertex, vertex_source)?;
        let frag = Shader::new(device, ShaderStage::Fragment, fragment_source)?;
        Self::link(device, vert, frag, output)
    }

    /// Links already compiled stages into a new program.
    pub fn link(
        device: &Arc<D>,
        vert: Shader<D>,
        frag: Shader<D>,
        output: &str,
    ) -> Result<Self, SetupError> {
        let program = device
            .create_program()
            .map_err(|message| SetupError::resource("program", message))?;

        device.attach_shader(program, vert.id);
        device.attach_shader(program, frag.id);
        device.bind_frag_data_location(program, 0, output);
        device.link_program(program);

        if !device.program_link_status(program) {
            let log = device.program_info_log(program);
            device.delete_program(program);
            drop(frag);
            drop(vert);
            return Err(SetupError::Link { log });
        }

        log::debug!("linked shader program {program:?} (output `{output}`)");

        Ok(Self {
            device: Arc::clone(device),
            id: program,
            attributes: RefCell::default(),
            uniforms: RefCell::default(),
            _frag: frag,
            _vert: vert,
        })
    }

    /// Makes this the active program for subsequent draws.
    pub fn use_program(&self) {
        self.device.use_program(Some(self.id));
    }

    /// Resolves a vertex attribute by name. Returns `None` if the linked program has
    /// no active attribute with that name.
    pub fn attribute(&self, name: &str) -> Option<AttributeSlot> {
        if let Some(slot) = self.attributes.borrow().get(name) {
            return *slot;
        }
        let slot = self.device.attrib_location(self.id, name).map(AttributeSlot);
        log::debug!("attribute `{name}` resolved to {slot:?}");
        self.attributes.borrow_mut().insert(name.to_string(), slot);
        slot
    }

    /// Resolves a uniform by name. Returns `None` if the linked program has no
    /// active uniform with that name.
    pub fn uniform(&self, name: &str) -> Option<UniformSlot<D::UniformLocation>> {
        if let Some(location) = self.uniforms.borrow().get(name) {
            return location.clone().map(UniformSlot);
        }
        let location = self.device.uniform_location(self.id, name);
        log::debug!("uniform `{name}` resolved to {location:?}");
        self.uniforms
            .borrow_mut()
            .insert(name.to_string(), location.clone());
        location.map(UniformSlot)
    }

    /// Describes how attribute `slot` is read from the bound vertex buffer.
    ///
    /// `stride` is the size of one vertex record in bytes and `offset` the byte
    /// position of the attribute inside it. Has no effect unless the vertex buffer
    /// holding the data is the one currently bound.
    pub fn set_attribute_layout(
        &self,
        slot: AttributeSlot,
        components: i32,
        stride: i32,
        offset: i32,
    ) {
        self.device
            .vertex_attrib_f32(slot.0, components, stride, offset);
    }

    /// Uploads a 4x4 matrix, replacing the previous value. Only draws issued after
    /// this call observe the new value.
    pub fn set_uniform_matrix(&self, slot: &UniformSlot<D::UniformLocation>, value: Mat4) {
        self.use_program();
        self.device.uniform_matrix4(&slot.0, &value.to_cols_array());
    }

    /// Points a sampler uniform at a texture unit.
    pub fn set_uniform_sampler(&self, slot: &UniformSlot<D::UniformLocation>, unit: u32) {
        self.use_program();
        self.device.uniform_i32(&slot.0, unit as i32);
    }
}

impl<D: Device> Drop for ShaderProgram<D> {
    fn drop(&mut self) {
        self.device.delete_program(self.id);
    }
}
