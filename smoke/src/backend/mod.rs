pub mod gl;
#[cfg(any(test, feature = "host"))]
pub mod host;
#[cfg(test)]
pub mod recorder;

use crate::context::Capabilities;
use crate::field::{FieldDescriptor, Size};
use crate::render;

/// A Gaussian impulse added to a field.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Splat {
    /// Centre in uv space, with the origin at the bottom left.
    pub point: [f32; 2],
    pub color: [f32; 3],
    pub radius: f32,
    pub aspect_ratio: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Advection {
    pub timestep: f32,
    pub dissipation: f32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Confinement {
    pub strength: f32,
    pub timestep: f32,
}

/// The passes a simulation step is built from.
///
/// Each pass reads from its source fields and overwrites every cell of
/// `target`. Sources and target are always distinct fields of the same size.
pub trait Backend {
    type Field;

    fn capabilities(&self) -> &Capabilities;

    /// Allocate a zeroed field.
    fn create_field(&mut self, descriptor: &FieldDescriptor)
        -> Result<Self::Field, render::Problem>;

    /// `target = value * source`
    fn clear(&mut self, source: &Self::Field, value: f32, target: &mut Self::Field);

    fn splat(&mut self, source: &Self::Field, splat: &Splat, target: &mut Self::Field);

    fn advect(
        &mut self,
        velocity: &Self::Field,
        source: &Self::Field,
        advection: &Advection,
        target: &mut Self::Field,
    );

    fn curl(&mut self, velocity: &Self::Field, target: &mut Self::Field);

    fn vorticity(
        &mut self,
        velocity: &Self::Field,
        curl: &Self::Field,
        confinement: &Confinement,
        target: &mut Self::Field,
    );

    fn divergence(&mut self, velocity: &Self::Field, target: &mut Self::Field);

    /// One Jacobi iteration of the pressure solve.
    fn pressure(
        &mut self,
        pressure: &Self::Field,
        divergence: &Self::Field,
        target: &mut Self::Field,
    );

    fn subtract_gradient(
        &mut self,
        pressure: &Self::Field,
        velocity: &Self::Field,
        target: &mut Self::Field,
    );

    /// Draw `source` stretched over the whole surface.
    fn display(&mut self, source: &Self::Field, surface: Size);
}
