pub mod backend;
pub mod context;
mod data;
pub mod field;
pub mod fluid;
pub mod input;
pub mod program;
pub mod render;
mod rng;
pub mod settings;
mod smoke;

pub use backend::gl::GlBackend;
#[cfg(any(test, feature = "host"))]
pub use backend::host::HostBackend;
pub use backend::Backend;
pub use context::{Capabilities, ContextAttributes, Tier};
pub use field::Size;
pub use input::PointerId;
pub use settings::Settings;
pub use smoke::{Problem, Smoke, State};
