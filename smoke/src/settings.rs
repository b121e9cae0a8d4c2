use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// The simulation grid is the surface size right-shifted by this amount.
    pub texture_downsample: u32,
    pub density_dissipation: f32,
    pub velocity_dissipation: f32,
    pub pressure_dissipation: f32,
    pub pressure_iterations: u32,
    /// Strength of the vorticity confinement force.
    pub curl: f32,
    pub splat_radius: f32,

    /// The largest timestep, in seconds, a single frame is allowed to advance.
    pub max_timestep: f32,
    pub pointer_gain: f32,
    /// Attenuation applied to a pointer's colour before it's splatted into the
    /// density field.
    pub color_intensity: f32,
    pub color_cycle_interval: u32,

    pub seed: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            texture_downsample: 1,
            density_dissipation: 0.98,
            velocity_dissipation: 0.99,
            pressure_dissipation: 0.8,
            pressure_iterations: 25,
            curl: 30.0,
            splat_radius: 0.005,

            max_timestep: 0.016,
            pointer_gain: 10.0,
            color_intensity: 0.3,
            color_cycle_interval: 25,

            seed: None,
        }
    }
}
