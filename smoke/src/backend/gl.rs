use super::{Advection, Backend, Confinement, Splat};
use crate::context::Capabilities;
use crate::data;
use crate::field::{FieldDescriptor, Size};
use crate::program::Programs;
use crate::render::{
    self, bind_position_attribute, Buffer, Context, Framebuffer, Program, Uniform, UniformValue,
    VertexArrayObject,
};
use crate::smoke::Problem;
use glow::HasContext;
use std::rc::Rc;

/// The full-screen quad every pass draws.
struct Quad {
    context: Context,
    // Kept alive for the attribute bindings that point into them.
    _vertices: Buffer,
    _indices: Buffer,
    vertex_array: Option<VertexArrayObject>,
}

impl Quad {
    fn new(context: &Context, capabilities: &Capabilities) -> Result<Self, render::Problem> {
        let vertices = Buffer::from_f32(
            context,
            &data::PLANE_VERTICES,
            glow::ARRAY_BUFFER,
            glow::STATIC_DRAW,
        )?;
        let indices = Buffer::from_u16(
            context,
            &data::PLANE_INDICES,
            glow::ELEMENT_ARRAY_BUFFER,
            glow::STATIC_DRAW,
        )?;

        let vertex_array = if capabilities.tier.uses_vertex_array() {
            let vertex_array = VertexArrayObject::empty(context)?;
            unsafe {
                context.bind_vertex_array(Some(vertex_array.id));
                bind_position_attribute(context, &vertices, &indices);
                context.bind_vertex_array(None);
                context.bind_buffer(glow::ARRAY_BUFFER, None);
            }
            Some(vertex_array)
        } else {
            // Without vertex arrays the bindings are global and stay put for
            // the lifetime of the context.
            bind_position_attribute(context, &vertices, &indices);
            None
        };

        Ok(Self {
            context: Rc::clone(context),
            _vertices: vertices,
            _indices: indices,
            vertex_array,
        })
    }

    fn draw(&self) {
        unsafe {
            if let Some(vertex_array) = &self.vertex_array {
                self.context.bind_vertex_array(Some(vertex_array.id));
            }

            self.context
                .draw_elements(glow::TRIANGLES, 6, glow::UNSIGNED_SHORT, 0);

            if self.vertex_array.is_some() {
                self.context.bind_vertex_array(None);
            }
        }
    }
}

pub struct GlBackend {
    context: Context,
    capabilities: Capabilities,
    programs: Programs,
    quad: Quad,
}

impl GlBackend {
    pub fn new(context: &Context) -> Result<Self, Problem> {
        let capabilities = Capabilities::detect(context)?;
        log::info!(
            "Using {:?} (linear filtering: {})",
            capabilities.tier,
            capabilities.linear_filtering
        );

        Ok(Self::with_capabilities(context, capabilities)?)
    }

    pub fn with_capabilities(
        context: &Context,
        capabilities: Capabilities,
    ) -> Result<Self, render::Problem> {
        unsafe {
            context.disable(glow::BLEND);
            context.disable(glow::DEPTH_TEST);
        }

        let programs = Programs::new(context, &capabilities)?;
        let quad = Quad::new(context, &capabilities)?;

        Ok(Self {
            context: Rc::clone(context),
            capabilities,
            programs,
            quad,
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn programs(&self) -> &Programs {
        &self.programs
    }

    fn bind_textures(&self, program: &Program, textures: &[(&'static str, &Framebuffer)]) {
        for (unit, &(name, framebuffer)) in textures.iter().enumerate() {
            unsafe {
                self.context.active_texture(glow::TEXTURE0 + unit as u32);
                self.context
                    .bind_texture(glow::TEXTURE_2D, Some(framebuffer.texture));
            }

            program.set_uniform(&Uniform {
                name,
                value: UniformValue::Texture2D(unit as u32),
            });
        }
    }

    fn draw(
        &self,
        program: &Program,
        textures: &[(&'static str, &Framebuffer)],
        uniforms: &[&Uniform],
        target: &Framebuffer,
    ) {
        let texel_size = target.size().texel_size();

        target.draw_to(&self.context, || {
            program.use_program();
            program.set_uniform(&Uniform {
                name: "texelSize",
                value: UniformValue::Vec2(&texel_size),
            });
            program.set_uniforms(uniforms);
            self.bind_textures(program, textures);
            self.quad.draw();
        });
    }
}

impl Backend for GlBackend {
    type Field = Framebuffer;

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn create_field(
        &mut self,
        descriptor: &FieldDescriptor,
    ) -> Result<Self::Field, render::Problem> {
        Framebuffer::new(
            &self.context,
            descriptor.label,
            descriptor.size,
            descriptor.format,
            descriptor.filter,
        )
    }

    fn clear(&mut self, source: &Framebuffer, value: f32, target: &mut Framebuffer) {
        self.draw(
            &self.programs.clear,
            &[("uTexture", source)],
            &[&Uniform {
                name: "value",
                value: UniformValue::Float(value),
            }],
            target,
        );
    }

    fn splat(&mut self, source: &Framebuffer, splat: &Splat, target: &mut Framebuffer) {
        self.draw(
            &self.programs.splat,
            &[("uTarget", source)],
            &[
                &Uniform {
                    name: "aspectRatio",
                    value: UniformValue::Float(splat.aspect_ratio),
                },
                &Uniform {
                    name: "point",
                    value: UniformValue::Vec2(&splat.point),
                },
                &Uniform {
                    name: "color",
                    value: UniformValue::Vec3(&splat.color),
                },
                &Uniform {
                    name: "radius",
                    value: UniformValue::Float(splat.radius),
                },
            ],
            target,
        );
    }

    fn advect(
        &mut self,
        velocity: &Framebuffer,
        source: &Framebuffer,
        advection: &Advection,
        target: &mut Framebuffer,
    ) {
        self.draw(
            &self.programs.advection,
            &[("uVelocity", velocity), ("uSource", source)],
            &[
                &Uniform {
                    name: "dt",
                    value: UniformValue::Float(advection.timestep),
                },
                &Uniform {
                    name: "dissipation",
                    value: UniformValue::Float(advection.dissipation),
                },
            ],
            target,
        );
    }

    fn curl(&mut self, velocity: &Framebuffer, target: &mut Framebuffer) {
        self.draw(
            &self.programs.curl,
            &[("uVelocity", velocity)],
            &[],
            target,
        );
    }

    fn vorticity(
        &mut self,
        velocity: &Framebuffer,
        curl: &Framebuffer,
        confinement: &Confinement,
        target: &mut Framebuffer,
    ) {
        self.draw(
            &self.programs.vorticity,
            &[("uVelocity", velocity), ("uCurl", curl)],
            &[
                &Uniform {
                    name: "curl",
                    value: UniformValue::Float(confinement.strength),
                },
                &Uniform {
                    name: "dt",
                    value: UniformValue::Float(confinement.timestep),
                },
            ],
            target,
        );
    }

    fn divergence(&mut self, velocity: &Framebuffer, target: &mut Framebuffer) {
        self.draw(
            &self.programs.divergence,
            &[("uVelocity", velocity)],
            &[],
            target,
        );
    }

    fn pressure(
        &mut self,
        pressure: &Framebuffer,
        divergence: &Framebuffer,
        target: &mut Framebuffer,
    ) {
        self.draw(
            &self.programs.pressure,
            &[("uPressure", pressure), ("uDivergence", divergence)],
            &[],
            target,
        );
    }

    fn subtract_gradient(
        &mut self,
        pressure: &Framebuffer,
        velocity: &Framebuffer,
        target: &mut Framebuffer,
    ) {
        self.draw(
            &self.programs.gradient_subtract,
            &[("uPressure", pressure), ("uVelocity", velocity)],
            &[],
            target,
        );
    }

    fn display(&mut self, source: &Framebuffer, surface: Size) {
        let program = &self.programs.display;

        unsafe {
            self.context.bind_framebuffer(glow::FRAMEBUFFER, None);
            self.context
                .viewport(0, 0, surface.width as i32, surface.height as i32);
        }

        program.use_program();
        program.set_uniform(&Uniform {
            name: "texelSize",
            value: UniformValue::Vec2(&surface.texel_size()),
        });
        self.bind_textures(program, &[("uTexture", source)]);
        self.quad.draw();
    }
}
