//! A [`Device`] that records every call instead of talking to a driver.
//!
//! Shader "compilation" understands just enough GLSL to answer attribute and
//! uniform lookups: top-level `in` declarations of the vertex stage become
//! attributes numbered in declaration order, and `uniform` declarations across
//! the attached stages become uniforms numbered in order of first appearance.
//! A stage containing `#error` fails to compile.

use std::cell::RefCell;

use fxhash::{FxHashMap, FxHashSet};

use super::{BufferTarget, Device, PixelFormat, Sampling, ShaderStage};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateVertexArray(u32),
    BindVertexArray(Option<u32>),
    DeleteVertexArray(u32),
    CreateBuffer(u32),
    BindBuffer(BufferTarget, Option<u32>),
    BufferData(BufferTarget, usize),
    DeleteBuffer(u32),
    CreateTexture(u32),
    BindTexture { unit: u32, texture: Option<u32> },
    TexImage { width: u32, height: u32, format: PixelFormat, uploaded: bool },
    SetSampling(Sampling),
    DeleteTexture(u32),
    CreateFramebuffer(u32),
    BindFramebuffer(Option<u32>),
    AttachColorTexture(u32),
    DeleteFramebuffer(u32),
    ReadPixels { width: u32, height: u32 },
    CreateShader(ShaderStage, u32),
    CompileShader(u32),
    DeleteShader(u32),
    CreateProgram(u32),
    AttachShader { program: u32, shader: u32 },
    BindFragDataLocation { program: u32, color_number: u32, name: String },
    LinkProgram(u32),
    UseProgram(Option<u32>),
    DeleteProgram(u32),
    VertexAttrib { index: u32, components: i32, stride: i32, offset: i32 },
    UniformMatrix4 { location: u32, value: [f32; 16] },
    UniformI32 { location: u32, value: i32 },
    Viewport(i32, i32, i32, i32),
    Clear([f32; 4]),
    DrawArrays(i32),
    DrawElements(i32),
}

#[derive(Default)]
struct State {
    next_id: u32,
    calls: Vec<Call>,
    live: FxHashSet<u32>,
    shaders: FxHashMap<u32, (ShaderStage, String, bool)>,
    programs: FxHashMap<u32, (Vec<u32>, bool)>,
    bound: FxHashMap<&'static str, u32>,
    buffers: FxHashMap<u32, Vec<u8>>,
    failing: FxHashSet<&'static str>,
    pending_error: Option<u32>,
}

impl State {
    fn create(&mut self, kind: &'static str) -> Result<u32, String> {
        if self.failing.contains(kind) {
            return Err(format!("out of memory creating {kind}"));
        }
        self.next_id += 1;
        self.live.insert(self.next_id);
        Ok(self.next_id)
    }

    fn delete(&mut self, id: u32) {
        self.live.remove(&id);
    }
}

#[derive(Default)]
pub struct RecordingDevice {
    state: RefCell<State>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later creation of `kind` ("buffer", "texture", ...) fail.
    pub fn fail_creation(&self, kind: &'static str) {
        self.state.borrow_mut().failing.insert(kind);
    }

    /// Sets the sticky error flag, as a driver would after a failed allocation.
    pub fn raise_error(&self, code: u32) {
        self.state.borrow_mut().pending_error = Some(code);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| matches(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Number of created objects that were never deleted.
    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    pub fn buffer_contents(&self, buffer: u32) -> Vec<u8> {
        self.state
            .borrow()
            .buffers
            .get(&buffer)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

fn target_key(target: BufferTarget) -> &'static str {
    match target {
        BufferTarget::Vertex => "array_buffer",
        BufferTarget::Index => "element_buffer",
    }
}

/// Names declared by statements starting with `keyword` (`in`, `uniform`).
fn declared_names<'a>(source: &'a str, keyword: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    source
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .flat_map(|line| line.split(';'))
        .filter_map(move |statement| {
            let statement = statement.rsplit(['{', '}']).next().unwrap_or_default();
            let mut tokens = statement.split_whitespace();
            match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(kw), Some(_ty), Some(name)) if kw == keyword => Some(name),
                _ => None,
            }
        })
}

impl Device for RecordingDevice {
    type Buffer = u32;
    type VertexArray = u32;
    type Texture = u32;
    type Framebuffer = u32;
    type Shader = u32;
    type Program = u32;
    type UniformLocation = u32;

    fn create_vertex_array(&self) -> Result<u32, String> {
        let id = self.state.borrow_mut().create("vertex_array")?;
        self.record(Call::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&self, vertex_array: Option<u32>) {
        self.record(Call::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&self, vertex_array: u32) {
        self.state.borrow_mut().delete(vertex_array);
        self.record(Call::DeleteVertexArray(vertex_array));
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let id = self.state.borrow_mut().create("buffer")?;
        self.record(Call::CreateBuffer(id));
        Ok(id)
    }

    fn bind_buffer(&self, target: BufferTarget, buffer: Option<u32>) {
        {
            let mut state = self.state.borrow_mut();
            match buffer {
                Some(id) => state.bound.insert(target_key(target), id),
                None => state.bound.remove(target_key(target)),
            };
        }
        self.record(Call::BindBuffer(target, buffer));
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8]) {
        {
            let mut state = self.state.borrow_mut();
            if let Some(&id) = state.bound.get(target_key(target)) {
                state.buffers.insert(id, data.to_vec());
            }
        }
        self.record(Call::BufferData(target, data.len()));
    }

    fn delete_buffer(&self, buffer: u32) {
        self.state.borrow_mut().delete(buffer);
        self.record(Call::DeleteBuffer(buffer));
    }

    fn create_texture(&self) -> Result<u32, String> {
        let id = self.state.borrow_mut().create("texture")?;
        self.record(Call::CreateTexture(id));
        Ok(id)
    }

    fn bind_texture(&self, unit: u32, texture: Option<u32>) {
        self.record(Call::BindTexture { unit, texture });
    }

    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: Option<&[u8]>) {
        self.record(Call::TexImage {
            width,
            height,
            format,
            uploaded: pixels.is_some(),
        });
    }

    fn set_sampling(&self, sampling: Sampling) {
        self.record(Call::SetSampling(sampling));
    }

    fn delete_texture(&self, texture: u32) {
        self.state.borrow_mut().delete(texture);
        self.record(Call::DeleteTexture(texture));
    }

    fn create_framebuffer(&self) -> Result<u32, String> {
        let id = self.state.borrow_mut().create("framebuffer")?;
        self.record(Call::CreateFramebuffer(id));
        Ok(id)
    }

    fn bind_framebuffer(&self, framebuffer: Option<u32>) {
        self.record(Call::BindFramebuffer(framebuffer));
    }

    fn attach_color_texture(&self, texture: u32) {
        self.record(Call::AttachColorTexture(texture));
    }

    fn framebuffer_complete(&self) -> bool {
        true
    }

    fn delete_framebuffer(&self, framebuffer: u32) {
        self.state.borrow_mut().delete(framebuffer);
        self.record(Call::DeleteFramebuffer(framebuffer));
    }

    fn read_pixels_rgba(&self, _x: i32, _y: i32, width: u32, height: u32) -> Vec<u8> {
        self.record(Call::ReadPixels { width, height });
        // Every byte holds its row number, bottom row first, so flips are observable.
        (0..height)
            .flat_map(|row| std::iter::repeat_n(row as u8, width as usize * 4))
            .collect()
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.create("shader")?;
            state.shaders.insert(id, (stage, String::new(), false));
            id
        };
        self.record(Call::CreateShader(stage, id));
        Ok(id)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        if let Some(entry) = self.state.borrow_mut().shaders.get_mut(&shader) {
            entry.1 = source.to_string();
        }
    }

    fn compile_shader(&self, shader: u32) {
        if let Some(entry) = self.state.borrow_mut().shaders.get_mut(&shader) {
            entry.2 = !entry.1.contains("#error") && entry.1.contains("void main");
        }
        self.record(Call::CompileShader(shader));
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|entry| entry.2)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        if self.shader_compile_status(shader) {
            String::new()
        } else {
            format!("0:1(1): error: shader {shader} rejected")
        }
    }

    fn delete_shader(&self, shader: u32) {
        {
            let mut state = self.state.borrow_mut();
            state.delete(shader);
            state.shaders.remove(&shader);
        }
        self.record(Call::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<u32, String> {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.create("program")?;
            state.programs.insert(id, (Vec::new(), false));
            id
        };
        self.record(Call::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        if let Some(entry) = self.state.borrow_mut().programs.get_mut(&program) {
            entry.0.push(shader);
        }
        self.record(Call::AttachShader { program, shader });
    }

    fn bind_frag_data_location(&self, program: u32, color_number: u32, name: &str) {
        self.record(Call::BindFragDataLocation {
            program,
            color_number,
            name: name.to_string(),
        });
    }

    fn link_program(&self, program: u32) {
        {
            let mut state = self.state.borrow_mut();
            let stages: Vec<_> = state
                .programs
                .get(&program)
                .map(|entry| entry.0.clone())
                .unwrap_or_default();
            let compiled = |stage| {
                stages.iter().any(|id| {
                    state
                        .shaders
                        .get(id)
                        .is_some_and(|(s, _, ok)| *s == stage && *ok)
                })
            };
            let linked = compiled(ShaderStage::Vertex) && compiled(ShaderStage::Fragment);
            if let Some(entry) = state.programs.get_mut(&program) {
                entry.1 = linked;
            }
        }
        self.record(Call::LinkProgram(program));
    }

    fn program_link_status(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|entry| entry.1)
    }

    fn program_info_log(&self, program: u32) -> String {
        if self.program_link_status(program) {
            String::new()
        } else {
            "error: program is missing a compiled stage".to_string()
        }
    }

    fn use_program(&self, program: Option<u32>) {
        self.record(Call::UseProgram(program));
    }

    fn delete_program(&self, program: u32) {
        {
            let mut state = self.state.borrow_mut();
            state.delete(program);
            state.programs.remove(&program);
        }
        self.record(Call::DeleteProgram(program));
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let (stages, linked) = state.programs.get(&program)?;
        if !linked {
            return None;
        }
        stages
            .iter()
            .filter_map(|id| state.shaders.get(id))
            .find(|(stage, _, _)| *stage == ShaderStage::Vertex)
            .and_then(|(_, source, _)| declared_names(source, "in").position(|n| n == name))
            .map(|index| index as u32)
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let (stages, linked) = state.programs.get(&program)?;
        if !linked {
            return None;
        }
        let mut seen: Vec<&str> = Vec::new();
        for (_, source, _) in stages.iter().filter_map(|id| state.shaders.get(id)) {
            for declared in declared_names(source, "uniform") {
                if !seen.contains(&declared) {
                    seen.push(declared);
                }
            }
        }
        seen.iter().position(|n| *n == name).map(|index| index as u32)
    }

    fn vertex_attrib_f32(&self, index: u32, components: i32, stride: i32, offset: i32) {
        self.record(Call::VertexAttrib {
            index,
            components,
            stride,
            offset,
        });
    }

    fn uniform_matrix4(&self, location: &u32, value: &[f32; 16]) {
        self.record(Call::UniformMatrix4 {
            location: *location,
            value: *value,
        });
    }

    fn uniform_i32(&self, location: &u32, value: i32) {
        self.record(Call::UniformI32 {
            location: *location,
            value,
        });
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(Call::Viewport(x, y, width, height));
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        self.record(Call::Clear(rgba));
    }

    fn draw_arrays(&self, vertex_count: i32) {
        self.record(Call::DrawArrays(vertex_count));
    }

    fn draw_elements_u32(&self, index_count: i32) {
        self.record(Call::DrawElements(index_count));
    }

    fn take_error(&self) -> Option<u32> {
        self.state.borrow_mut().pending_error.take()
    }
}
