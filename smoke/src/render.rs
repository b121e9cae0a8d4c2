use crate::context::TextureFormat;
use crate::field::{Filter, Size};
use glow::HasContext;
use rustc_hash::FxHashMap;
use std::rc::Rc;
use thiserror::Error;

pub type Context = Rc<glow::Context>;
type Result<T> = std::result::Result<T, Problem>;

/// Every program binds its vertex position here, so the quad's attribute
/// state is shared across all of them.
pub const POSITION_LOCATION: u32 = 0;

#[derive(Error, Debug)]
pub enum Problem {
    #[error("Cannot create buffer")]
    CannotCreateBuffer,

    #[error("Cannot create texture")]
    CannotCreateTexture,

    #[error("Cannot create framebuffer")]
    CannotCreateFramebuffer,

    #[error("Framebuffer for {label} is incomplete: status {status:#06x}")]
    IncompleteFramebuffer { label: &'static str, status: u32 },

    #[error("Cannot create vertex array")]
    CannotCreateVertexArray,

    #[error("Cannot create {stage} shader for {program}")]
    CannotCreateShader {
        program: &'static str,
        stage: &'static str,
    },

    #[error("Cannot compile the {stage} shader for {program}: {log}")]
    ShaderCompile {
        program: &'static str,
        stage: &'static str,
        log: String,
    },

    #[error("Cannot create program")]
    CannotCreateProgram,

    #[error("Cannot link {program}: {log}")]
    ProgramLink { program: &'static str, log: String },
}

pub struct Buffer {
    context: Context,
    pub id: glow::Buffer,
    pub size: usize,
    pub type_: u32,
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_buffer(self.id);
        }
    }
}

impl Buffer {
    pub fn from_bytes(
        context: &Context,
        data: &[u8],
        buffer_type: u32,
        usage: u32,
    ) -> Result<Self> {
        let buffer = unsafe {
            let buffer = context
                .create_buffer()
                .map_err(|_| Problem::CannotCreateBuffer)?;

            context.bind_buffer(buffer_type, Some(buffer));
            context.buffer_data_u8_slice(buffer_type, data, usage);
            context.bind_buffer(buffer_type, None);

            buffer
        };

        Ok(Self {
            context: Rc::clone(context),
            id: buffer,
            size: data.len(),
            type_: buffer_type,
        })
    }

    pub fn from_f32(context: &Context, data: &[f32], buffer_type: u32, usage: u32) -> Result<Self> {
        Self::from_bytes(context, bytemuck::cast_slice(data), buffer_type, usage)
    }

    pub fn from_u16(context: &Context, data: &[u16], buffer_type: u32, usage: u32) -> Result<Self> {
        Self::from_bytes(context, bytemuck::cast_slice(data), buffer_type, usage)
    }
}

/// A texture with a framebuffer attached to it. Both are released on drop.
pub struct Framebuffer {
    context: Context,
    pub id: glow::Framebuffer,
    pub texture: glow::Texture,
    pub label: &'static str,
    size: Size,
    format: TextureFormat,
    filter: Filter,
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.context
                .bind_framebuffer(glow::FRAMEBUFFER, Some(self.id));
            self.context.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                None,
                0,
            );
            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.context.delete_framebuffer(self.id);
            self.context.delete_texture(self.texture);
        }
    }
}

impl Framebuffer {
    pub fn new(
        context: &Context,
        label: &'static str,
        size: Size,
        format: TextureFormat,
        filter: Filter,
    ) -> Result<Self> {
        let (framebuffer, texture) = unsafe {
            let texture = context
                .create_texture()
                .map_err(|_| Problem::CannotCreateTexture)?;

            context.bind_texture(glow::TEXTURE_2D, Some(texture));
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                filter.to_gl() as i32,
            );
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                filter.to_gl() as i32,
            );
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            context.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            context.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                format.internal_format as i32,
                size.width as i32,
                size.height as i32,
                0,
                format.format,
                format.type_,
                None,
            );
            context.bind_texture(glow::TEXTURE_2D, None);

            let framebuffer = match context.create_framebuffer() {
                Ok(framebuffer) => framebuffer,
                Err(_) => {
                    context.delete_texture(texture);
                    return Err(Problem::CannotCreateFramebuffer);
                }
            };

            context.bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            context.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(texture),
                0,
            );
            context.bind_framebuffer(glow::FRAMEBUFFER, None);

            (framebuffer, texture)
        };

        let framebuffer = Self {
            context: Rc::clone(context),
            id: framebuffer,
            texture,
            label,
            size,
            format,
            filter,
        };

        framebuffer.check_status()?;
        framebuffer.zero_out();

        Ok(framebuffer)
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    fn check_status(&self) -> Result<()> {
        let status = unsafe {
            self.context
                .bind_framebuffer(glow::FRAMEBUFFER, Some(self.id));
            let status = self.context.check_framebuffer_status(glow::FRAMEBUFFER);
            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
            status
        };

        if status == glow::FRAMEBUFFER_COMPLETE {
            Ok(())
        } else {
            Err(Problem::IncompleteFramebuffer {
                label: self.label,
                status,
            })
        }
    }

    pub fn zero_out(&self) {
        self.clear_color_with(&[0.0, 0.0, 0.0, 0.0]);
    }

    pub fn clear_color_with(&self, color: &[f32; 4]) {
        unsafe {
            self.context
                .bind_framebuffer(glow::FRAMEBUFFER, Some(self.id));

            self.context
                .viewport(0, 0, self.size.width as i32, self.size.height as i32);
            self.context
                .clear_color(color[0], color[1], color[2], color[3]);
            self.context.clear(glow::COLOR_BUFFER_BIT);

            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }

    pub fn draw_to<T>(&self, context: &Context, draw_call: T)
    where
        T: Fn(),
    {
        unsafe {
            context.bind_framebuffer(glow::FRAMEBUFFER, Some(self.id));
            context.viewport(0, 0, self.size.width as i32, self.size.height as i32);
            draw_call();
            context.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
    }
}

pub struct Program {
    context: Context,
    pub name: &'static str,
    pub program: glow::Program,
    uniforms: FxHashMap<String, glow::UniformLocation>,
}

impl Drop for Program {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_program(self.program);
        }
    }
}

impl Program {
    /// Compile and link a program from already preprocessed sources.
    pub fn new(context: &Context, name: &'static str, shaders: (&str, &str)) -> Result<Self> {
        let vertex_shader = compile_shader(context, name, glow::VERTEX_SHADER, shaders.0)?;
        let fragment_shader =
            match compile_shader(context, name, glow::FRAGMENT_SHADER, shaders.1) {
                Ok(shader) => shader,
                Err(problem) => {
                    unsafe { context.delete_shader(vertex_shader) };
                    return Err(problem);
                }
            };

        let program = unsafe {
            let program = context
                .create_program()
                .map_err(|_| Problem::CannotCreateProgram)?;
            context.attach_shader(program, vertex_shader);
            context.attach_shader(program, fragment_shader);
            context.bind_attrib_location(program, POSITION_LOCATION, "aPosition");

            context.link_program(program);
            let linked = context.get_program_link_status(program);

            // Delete the shaders to free up memory
            context.detach_shader(program, vertex_shader);
            context.detach_shader(program, fragment_shader);
            context.delete_shader(vertex_shader);
            context.delete_shader(fragment_shader);

            if !linked {
                let log = context.get_program_info_log(program);
                context.delete_program(program);
                return Err(Problem::ProgramLink { program: name, log });
            }

            program
        };

        // Get uniform locations
        let mut uniforms = FxHashMap::default();
        unsafe {
            let uniform_count = context.get_active_uniforms(program);
            for num in 0..uniform_count {
                if let Some(info) = context.get_active_uniform(program, num) {
                    if let Some(location) = context.get_uniform_location(program, &info.name) {
                        uniforms.insert(info.name, location);
                    }
                }
            }
        }

        Ok(Program {
            context: Rc::clone(context),
            name,
            program,
            uniforms,
        })
    }

    pub fn use_program(&self) {
        unsafe {
            self.context.use_program(Some(self.program));
        }
    }

    pub fn set_uniforms(&self, uniforms: &[&Uniform]) {
        for uniform in uniforms.iter() {
            self.set_uniform(uniform);
        }
    }

    /// Uniforms the driver optimised away are silently skipped.
    pub fn set_uniform(&self, uniform: &Uniform) {
        let context = &self.context;
        let location = self.get_uniform_location(uniform.name);
        self.use_program();

        unsafe {
            match uniform.value {
                UniformValue::Float(value) => context.uniform_1_f32(location.as_ref(), value),

                UniformValue::Vec2(value) => {
                    context.uniform_2_f32(location.as_ref(), value[0], value[1])
                }

                UniformValue::Vec3(value) => {
                    context.uniform_3_f32(location.as_ref(), value[0], value[1], value[2])
                }

                UniformValue::Texture2D(unit) => {
                    context.uniform_1_i32(location.as_ref(), unit as i32)
                }
            }
        }
    }

    pub fn get_uniform_location(&self, name: &str) -> Option<glow::UniformLocation> {
        self.uniforms.get(name).cloned()
    }
}

pub struct Uniform<'a> {
    pub name: &'static str,
    pub value: UniformValue<'a>,
}

#[derive(Clone)]
pub enum UniformValue<'a> {
    Float(f32),
    Vec2(&'a [f32; 2]),
    Vec3(&'a [f32; 3]),
    /// A texture unit index.
    Texture2D(u32),
}

fn stage_name(shader_type: u32) -> &'static str {
    match shader_type {
        glow::VERTEX_SHADER => "vertex",
        _ => "fragment",
    }
}

pub fn compile_shader(
    context: &Context,
    program: &'static str,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader> {
    let stage = stage_name(shader_type);

    unsafe {
        let shader = context
            .create_shader(shader_type)
            .map_err(|_| Problem::CannotCreateShader { program, stage })?;
        context.shader_source(shader, source);
        context.compile_shader(shader);

        if context.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = context.get_shader_info_log(shader);
            context.delete_shader(shader);
            Err(Problem::ShaderCompile {
                program,
                stage,
                log,
            })
        }
    }
}

pub struct VertexArrayObject {
    context: Context,
    pub id: glow::VertexArray,
}

impl Drop for VertexArrayObject {
    fn drop(&mut self) {
        unsafe {
            self.context.delete_vertex_array(self.id);
        }
    }
}

impl VertexArrayObject {
    pub fn empty(context: &Context) -> Result<Self> {
        let id = unsafe {
            context
                .create_vertex_array()
                .map_err(|_| Problem::CannotCreateVertexArray)?
        };

        Ok(Self {
            id,
            context: Rc::clone(context),
        })
    }
}

/// Point the position attribute at a tightly packed `vec2` buffer and bind
/// the index buffer. Records into the bound vertex array, if any.
pub fn bind_position_attribute(context: &Context, vertices: &Buffer, indices: &Buffer) {
    unsafe {
        context.bind_buffer(glow::ARRAY_BUFFER, Some(vertices.id));
        context.enable_vertex_attrib_array(POSITION_LOCATION);
        context.vertex_attrib_pointer_f32(POSITION_LOCATION, 2, glow::FLOAT, false, 0, 0);
        context.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(indices.id));
    }
}
