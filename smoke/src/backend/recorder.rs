// Wraps the host backend and logs every pass it runs.

use super::host::{HostBackend, HostField};
use super::{Advection, Backend, Confinement, Splat};
use crate::context::Capabilities;
use crate::field::{FieldDescriptor, Size};
use crate::render;

#[derive(Clone, Debug, PartialEq)]
pub enum Pass {
    Clear {
        source: u64,
        target: u64,
        value: f32,
    },
    Splat {
        source: u64,
        target: u64,
        splat: Splat,
    },
    Advect {
        velocity: u64,
        source: u64,
        target: u64,
        advection: Advection,
    },
    Curl {
        velocity: u64,
        target: u64,
    },
    Vorticity {
        velocity: u64,
        curl: u64,
        target: u64,
        confinement: Confinement,
    },
    Divergence {
        velocity: u64,
        target: u64,
    },
    Pressure {
        pressure: u64,
        divergence: u64,
        target: u64,
    },
    SubtractGradient {
        pressure: u64,
        velocity: u64,
        target: u64,
    },
    Display {
        source: u64,
        surface: Size,
    },
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::Clear { .. } => "clear",
            Pass::Splat { .. } => "splat",
            Pass::Advect { .. } => "advect",
            Pass::Curl { .. } => "curl",
            Pass::Vorticity { .. } => "vorticity",
            Pass::Divergence { .. } => "divergence",
            Pass::Pressure { .. } => "pressure",
            Pass::SubtractGradient { .. } => "subtract_gradient",
            Pass::Display { .. } => "display",
        }
    }

    /// Every field the pass touched.
    pub fn fields(&self) -> Vec<u64> {
        match *self {
            Pass::Clear { source, target, .. } | Pass::Splat { source, target, .. } => {
                vec![source, target]
            }
            Pass::Advect {
                velocity,
                source,
                target,
                ..
            } => vec![velocity, source, target],
            Pass::Curl { velocity, target } | Pass::Divergence { velocity, target } => {
                vec![velocity, target]
            }
            Pass::Vorticity {
                velocity,
                curl,
                target,
                ..
            } => vec![velocity, curl, target],
            Pass::Pressure {
                pressure,
                divergence,
                target,
            } => vec![pressure, divergence, target],
            Pass::SubtractGradient {
                pressure,
                velocity,
                target,
            } => vec![pressure, velocity, target],
            Pass::Display { source, .. } => vec![source],
        }
    }
}

pub struct Recorder {
    pub host: HostBackend,
    pub passes: Vec<Pass>,
    pub created: Vec<u64>,
}

impl Recorder {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            host: HostBackend::new(capabilities),
            passes: Vec::new(),
            created: Vec::new(),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(Pass::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.passes.iter().filter(|pass| pass.name() == name).count()
    }

    pub fn clear_log(&mut self) {
        self.passes.clear();
    }
}

impl Backend for Recorder {
    type Field = HostField;

    fn capabilities(&self) -> &Capabilities {
        self.host.capabilities()
    }

    fn create_field(
        &mut self,
        descriptor: &FieldDescriptor,
    ) -> Result<Self::Field, render::Problem> {
        let field = self.host.create_field(descriptor)?;
        self.created.push(field.id());
        Ok(field)
    }

    fn clear(&mut self, source: &HostField, value: f32, target: &mut HostField) {
        self.passes.push(Pass::Clear {
            source: source.id(),
            target: target.id(),
            value,
        });
        self.host.clear(source, value, target);
    }

    fn splat(&mut self, source: &HostField, splat: &Splat, target: &mut HostField) {
        self.passes.push(Pass::Splat {
            source: source.id(),
            target: target.id(),
            splat: *splat,
        });
        self.host.splat(source, splat, target);
    }

    fn advect(
        &mut self,
        velocity: &HostField,
        source: &HostField,
        advection: &Advection,
        target: &mut HostField,
    ) {
        self.passes.push(Pass::Advect {
            velocity: velocity.id(),
            source: source.id(),
            target: target.id(),
            advection: *advection,
        });
        self.host.advect(velocity, source, advection, target);
    }

    fn curl(&mut self, velocity: &HostField, target: &mut HostField) {
        self.passes.push(Pass::Curl {
            velocity: velocity.id(),
            target: target.id(),
        });
        self.host.curl(velocity, target);
    }

    fn vorticity(
        &mut self,
        velocity: &HostField,
        curl: &HostField,
        confinement: &Confinement,
        target: &mut HostField,
    ) {
        self.passes.push(Pass::Vorticity {
            velocity: velocity.id(),
            curl: curl.id(),
            target: target.id(),
            confinement: *confinement,
        });
        self.host.vorticity(velocity, curl, confinement, target);
    }

    fn divergence(&mut self, velocity: &HostField, target: &mut HostField) {
        self.passes.push(Pass::Divergence {
            velocity: velocity.id(),
            target: target.id(),
        });
        self.host.divergence(velocity, target);
    }

    fn pressure(&mut self, pressure: &HostField, divergence: &HostField, target: &mut HostField) {
        self.passes.push(Pass::Pressure {
            pressure: pressure.id(),
            divergence: divergence.id(),
            target: target.id(),
        });
        self.host.pressure(pressure, divergence, target);
    }

    fn subtract_gradient(
        &mut self,
        pressure: &HostField,
        velocity: &HostField,
        target: &mut HostField,
    ) {
        self.passes.push(Pass::SubtractGradient {
            pressure: pressure.id(),
            velocity: velocity.id(),
            target: target.id(),
        });
        self.host.subtract_gradient(pressure, velocity, target);
    }

    fn display(&mut self, source: &HostField, surface: Size) {
        self.passes.push(Pass::Display {
            source: source.id(),
            surface,
        });
        self.host.display(source, surface);
    }
}
