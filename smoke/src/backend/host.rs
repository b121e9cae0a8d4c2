// A CPU rendition of the GPU passes.
//
// Every pass evaluates the same per-cell math as its fragment shader, with
// the sampling rules of a GL texture: clamp-to-edge wrapping, nearest or
// bilinear filtering, and two-channel formats reading back as `(r, g, 0, 1)`.
// Values are kept as `f32` rather than rounded to half floats.

use super::{Advection, Backend, Confinement, Splat};
use crate::context::{Capabilities, TextureFormat};
use crate::field::{FieldDescriptor, Filter, Size};
use crate::program::AdvectionVariant;
use crate::render;

pub type Texel = [f32; 4];

#[derive(Clone, Debug)]
pub struct HostField {
    id: u64,
    label: &'static str,
    size: Size,
    format: TextureFormat,
    filter: Filter,
    texels: Vec<Texel>,
}

impl HostField {
    fn new(id: u64, descriptor: &FieldDescriptor) -> Self {
        Self {
            id,
            label: descriptor.label,
            size: descriptor.size,
            format: descriptor.format,
            filter: descriptor.filter,
            texels: vec![[0.0; 4]; descriptor.size.area()],
        }
    }

    /// Unique across every field a backend has created.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    pub fn texel(&self, x: u32, y: u32) -> Texel {
        self.read(x as i64, y as i64)
    }

    pub fn set_texel(&mut self, x: u32, y: u32, value: Texel) {
        let index = self.index(x as i64, y as i64);
        self.texels[index] = self.store(value);
    }

    fn index(&self, x: i64, y: i64) -> usize {
        let x = x.clamp(0, self.size.width as i64 - 1) as usize;
        let y = y.clamp(0, self.size.height as i64 - 1) as usize;
        y * self.size.width as usize + x
    }

    fn store(&self, value: Texel) -> Texel {
        match self.format.channels() {
            1 => [value[0], 0.0, 0.0, 1.0],
            2 => [value[0], value[1], 0.0, 1.0],
            3 => [value[0], value[1], value[2], 1.0],
            _ => value,
        }
    }

    fn read(&self, x: i64, y: i64) -> Texel {
        self.texels[self.index(x, y)]
    }

    /// Sample at a uv coordinate, the way `texture2D` would.
    pub fn sample(&self, uv: [f32; 2]) -> Texel {
        let width = self.size.width as f32;
        let height = self.size.height as f32;

        match self.filter {
            Filter::Nearest => {
                let x = (uv[0] * width).floor() as i64;
                let y = (uv[1] * height).floor() as i64;
                self.read(x, y)
            }

            Filter::Linear => {
                let x = uv[0] * width - 0.5;
                let y = uv[1] * height - 0.5;
                let (x0, y0) = (x.floor(), y.floor());
                let (fx, fy) = (x - x0, y - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);

                let a = self.read(x0, y0);
                let b = self.read(x0 + 1, y0);
                let c = self.read(x0, y0 + 1);
                let d = self.read(x0 + 1, y0 + 1);

                mix4(mix4(a, b, fx), mix4(c, d, fx), fy)
            }
        }
    }
}

/// The image last drawn to the surface.
#[derive(Clone, Debug)]
pub struct Frame {
    pub size: Size,
    pub pixels: Vec<Texel>,
}

impl Frame {
    pub fn pixel(&self, x: u32, y: u32) -> Texel {
        self.pixels[y as usize * self.size.width as usize + x as usize]
    }
}

pub struct HostBackend {
    capabilities: Capabilities,
    advection_variant: AdvectionVariant,
    next_id: u64,
    frame: Option<Frame>,
}

impl HostBackend {
    pub fn new(capabilities: Capabilities) -> Self {
        let advection_variant = AdvectionVariant::for_capabilities(&capabilities);

        Self {
            capabilities,
            advection_variant,
            next_id: 0,
            frame: None,
        }
    }

    pub fn advection_variant(&self) -> AdvectionVariant {
        self.advection_variant
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }
}

/// What a fragment shader invocation sees.
#[derive(Copy, Clone, Debug)]
struct Cell {
    uv: [f32; 2],
    frag_coord: [f32; 2],
    texel_size: [f32; 2],
}

impl Cell {
    fn left(&self) -> [f32; 2] {
        [self.uv[0] - self.texel_size[0], self.uv[1]]
    }

    fn right(&self) -> [f32; 2] {
        [self.uv[0] + self.texel_size[0], self.uv[1]]
    }

    fn top(&self) -> [f32; 2] {
        [self.uv[0], self.uv[1] + self.texel_size[1]]
    }

    fn bottom(&self) -> [f32; 2] {
        [self.uv[0], self.uv[1] - self.texel_size[1]]
    }
}

fn shade<F>(size: Size, mut shader: F) -> Vec<Texel>
where
    F: FnMut(&Cell) -> Texel,
{
    let texel_size = size.texel_size();
    let mut texels = Vec::with_capacity(size.area());

    for y in 0..size.height {
        for x in 0..size.width {
            let frag_coord = [x as f32 + 0.5, y as f32 + 0.5];
            let cell = Cell {
                uv: [frag_coord[0] * texel_size[0], frag_coord[1] * texel_size[1]],
                frag_coord,
                texel_size,
            };
            texels.push(shader(&cell));
        }
    }

    texels
}

fn draw<F>(target: &mut HostField, shader: F)
where
    F: FnMut(&Cell) -> Texel,
{
    let texels = shade(target.size, shader);
    target.texels = texels.into_iter().map(|texel| target.store(texel)).collect();
}

fn mix4(a: Texel, b: Texel, t: f32) -> Texel {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

fn scale4(value: Texel, by: f32) -> Texel {
    [value[0] * by, value[1] * by, value[2] * by, value[3] * by]
}

fn clamp_uv(uv: [f32; 2]) -> [f32; 2] {
    [uv[0].clamp(0.0, 1.0), uv[1].clamp(0.0, 1.0)]
}

fn bilerp(source: &HostField, p: [f32; 2], texel_size: [f32; 2]) -> Texel {
    let st = [(p[0] - 0.5).floor() + 0.5, (p[1] - 0.5).floor() + 0.5];
    let zw = [st[0] + 1.0, st[1] + 1.0];

    let a = source.sample([st[0] * texel_size[0], st[1] * texel_size[1]]);
    let b = source.sample([zw[0] * texel_size[0], st[1] * texel_size[1]]);
    let c = source.sample([st[0] * texel_size[0], zw[1] * texel_size[1]]);
    let d = source.sample([zw[0] * texel_size[0], zw[1] * texel_size[1]]);

    let f = [p[0] - st[0], p[1] - st[1]];
    mix4(mix4(a, b, f[0]), mix4(c, d, f[0]), f[1])
}

impl Backend for HostBackend {
    type Field = HostField;

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn create_field(
        &mut self,
        descriptor: &FieldDescriptor,
    ) -> Result<Self::Field, render::Problem> {
        let field = HostField::new(self.next_id, descriptor);
        self.next_id += 1;
        Ok(field)
    }

    fn clear(&mut self, source: &HostField, value: f32, target: &mut HostField) {
        draw(target, |cell| scale4(source.sample(cell.uv), value));
    }

    fn splat(&mut self, source: &HostField, splat: &Splat, target: &mut HostField) {
        draw(target, |cell| {
            let px = (cell.uv[0] - splat.point[0]) * splat.aspect_ratio;
            let py = cell.uv[1] - splat.point[1];
            let falloff = (-(px * px + py * py) / splat.radius).exp();
            let base = source.sample(cell.uv);

            [
                base[0] + falloff * splat.color[0],
                base[1] + falloff * splat.color[1],
                base[2] + falloff * splat.color[2],
                1.0,
            ]
        });
    }

    fn advect(
        &mut self,
        velocity: &HostField,
        source: &HostField,
        advection: &Advection,
        target: &mut HostField,
    ) {
        let Advection {
            timestep,
            dissipation,
        } = *advection;

        match self.advection_variant {
            AdvectionVariant::Filtered => draw(target, |cell| {
                let vel = velocity.sample(cell.uv);
                let coord = [
                    cell.uv[0] - timestep * vel[0] * cell.texel_size[0],
                    cell.uv[1] - timestep * vel[1] * cell.texel_size[1],
                ];
                scale4(source.sample(coord), dissipation)
            }),

            AdvectionVariant::ManualBilinear => draw(target, |cell| {
                let vel = velocity.sample(cell.uv);
                let coord = [
                    cell.frag_coord[0] - timestep * vel[0],
                    cell.frag_coord[1] - timestep * vel[1],
                ];
                let mut value = scale4(bilerp(source, coord, cell.texel_size), dissipation);
                value[3] = 1.0;
                value
            }),
        }
    }

    fn curl(&mut self, velocity: &HostField, target: &mut HostField) {
        draw(target, |cell| {
            let l = velocity.sample(cell.left())[1];
            let r = velocity.sample(cell.right())[1];
            let t = velocity.sample(cell.top())[0];
            let b = velocity.sample(cell.bottom())[0];
            [r - l - t + b, 0.0, 0.0, 1.0]
        });
    }

    fn vorticity(
        &mut self,
        velocity: &HostField,
        curl: &HostField,
        confinement: &Confinement,
        target: &mut HostField,
    ) {
        draw(target, |cell| {
            let l = curl.sample(cell.left())[0];
            let r = curl.sample(cell.right())[0];
            let t = curl.sample(cell.top())[0];
            let b = curl.sample(cell.bottom())[0];
            let c = curl.sample(cell.uv)[0];

            let mut force = [t.abs() - b.abs(), r.abs() - l.abs()];
            let length = ((force[0] + 1e-5).powi(2) + (force[1] + 1e-5).powi(2)).sqrt();
            let scale = 1.0 / length * confinement.strength * c;
            force[0] *= scale;
            force[1] *= scale;

            let vel = velocity.sample(cell.uv);
            [
                vel[0] + force[0] * confinement.timestep,
                vel[1] + force[1] * confinement.timestep,
                0.0,
                1.0,
            ]
        });
    }

    fn divergence(&mut self, velocity: &HostField, target: &mut HostField) {
        // Reflect the velocity across the domain walls.
        let sample_velocity = |uv: [f32; 2]| {
            let mut multiplier = [1.0, 1.0];
            for axis in 0..2 {
                if !(0.0..=1.0).contains(&uv[axis]) {
                    multiplier[axis] = -1.0;
                }
            }
            let vel = velocity.sample(clamp_uv(uv));
            [multiplier[0] * vel[0], multiplier[1] * vel[1]]
        };

        draw(target, |cell| {
            let l = sample_velocity(cell.left())[0];
            let r = sample_velocity(cell.right())[0];
            let t = sample_velocity(cell.top())[1];
            let b = sample_velocity(cell.bottom())[1];
            [0.5 * (r - l + t - b), 0.0, 0.0, 1.0]
        });
    }

    fn pressure(&mut self, pressure: &HostField, divergence: &HostField, target: &mut HostField) {
        draw(target, |cell| {
            let l = pressure.sample(clamp_uv(cell.left()))[0];
            let r = pressure.sample(clamp_uv(cell.right()))[0];
            let t = pressure.sample(clamp_uv(cell.top()))[0];
            let b = pressure.sample(clamp_uv(cell.bottom()))[0];
            let divergence = divergence.sample(cell.uv)[0];
            [(l + r + b + t - divergence) * 0.25, 0.0, 0.0, 1.0]
        });
    }

    fn subtract_gradient(
        &mut self,
        pressure: &HostField,
        velocity: &HostField,
        target: &mut HostField,
    ) {
        draw(target, |cell| {
            let l = pressure.sample(clamp_uv(cell.left()))[0];
            let r = pressure.sample(clamp_uv(cell.right()))[0];
            let t = pressure.sample(clamp_uv(cell.top()))[0];
            let b = pressure.sample(clamp_uv(cell.bottom()))[0];
            let vel = velocity.sample(cell.uv);
            [vel[0] - (r - l), vel[1] - (t - b), 0.0, 1.0]
        });
    }

    fn display(&mut self, source: &HostField, surface: Size) {
        self.frame = Some(Frame {
            size: surface,
            pixels: shade(surface, |cell| source.sample(cell.uv)),
        });
    }
}
