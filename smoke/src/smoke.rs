use crate::backend::Backend;
use crate::field::{Allocation, Fields, Size};
use crate::fluid::Fluid;
use crate::input::{Impulse, PointerId, Pointers};
use crate::render;
use crate::settings::Settings;

use rand::Rng;
use std::rc::Rc;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Ready,
    Running,
    Disposed,
}

#[derive(Error, Debug)]
pub enum Problem {
    #[error("No suitable rendering context: {0}")]
    ContextUnavailable(String),

    #[error(transparent)]
    Render(#[from] render::Problem),

    #[error("Cannot go from {from:?} to {to:?}")]
    InvalidTransition { from: State, to: State },
}

/// A simulation session.
///
/// Owns the backend, and through it every GPU resource, from
/// `initialize` until `dispose`. The host drives it by calling `animate`
/// once per frame for as long as `is_running` holds.
pub struct Smoke<B: Backend> {
    backend: Option<B>,
    settings: Rc<Settings>,
    state: State,
    fluid: Option<Fluid<B::Field>>,
    pointers: Pointers,

    // The surface size in physical pixels, as last reported by the host.
    surface: Size,
    // The surface size the fields were last allocated for.
    allocated_for: Option<Size>,

    // A timestamp in milliseconds.
    last_timestamp: Option<f64>,
}

impl<B: Backend> Smoke<B> {
    pub fn new(backend: B, settings: &Rc<Settings>) -> Self {
        Self {
            backend: Some(backend),
            settings: Rc::clone(settings),
            state: State::Uninitialized,
            fluid: None,
            pointers: Pointers::new(settings),
            surface: Size::default(),
            allocated_for: None,
            last_timestamp: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn surface(&self) -> Size {
        self.surface
    }

    /// The grid size, or `None` while allocation is deferred.
    pub fn resolution(&self) -> Option<Size> {
        self.fluid.as_ref().map(Fluid::resolution)
    }

    pub fn fluid(&self) -> Option<&Fluid<B::Field>> {
        self.fluid.as_ref()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn pointers(&self) -> &Pointers {
        &self.pointers
    }

    fn transition(&mut self, from: State, to: State) -> Result<(), Problem> {
        if self.state != from {
            return Err(Problem::InvalidTransition {
                from: self.state,
                to,
            });
        }

        log::debug!("{:?} -> {:?}", from, to);
        self.state = to;
        Ok(())
    }

    pub fn initialize(&mut self, surface: Size) -> Result<(), Problem> {
        if self.state != State::Uninitialized {
            return Err(Problem::InvalidTransition {
                from: self.state,
                to: State::Ready,
            });
        }

        log::info!("✨ Initialising Smoke at {}", surface);

        self.surface = surface;
        self.reallocate()?;
        self.transition(State::Uninitialized, State::Ready)
    }

    pub fn start(&mut self) -> Result<(), Problem> {
        self.transition(State::Ready, State::Running)
    }

    /// Record a new surface size. The fields are reallocated on the next
    /// frame.
    pub fn resize(&mut self, surface: Size) {
        if self.surface != surface {
            log::debug!("Surface resized from {} to {}", self.surface, surface);
            self.surface = surface;
        }
    }

    /// Run one frame. `timestamp` is in milliseconds.
    pub fn animate(&mut self, timestamp: f64) {
        if self.state != State::Running {
            return;
        }

        if self.allocated_for != Some(self.surface) {
            if let Err(problem) = self.reallocate() {
                log::error!("Cannot reallocate the simulation fields: {}", problem);
                self.dispose();
                return;
            }
        }

        let timestep = self.timestep(timestamp);

        if let (Some(backend), Some(fluid)) = (self.backend.as_mut(), self.fluid.as_mut()) {
            fluid.step(backend, self.surface, timestep, &mut self.pointers);
        }
    }

    fn timestep(&mut self, timestamp: f64) -> f32 {
        let max_timestep = f64::from(self.settings.max_timestep);
        let timestep = match self.last_timestamp {
            Some(last_timestamp) => {
                ((timestamp - last_timestamp) / 1000.0).clamp(0.0, max_timestep)
            }
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp);

        timestep as f32
    }

    fn reallocate(&mut self) -> Result<(), Problem> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };

        // Release the old fields before asking for new ones.
        self.fluid = None;
        self.allocated_for = Some(self.surface);

        match Fields::allocate(backend, self.surface, &self.settings)? {
            Allocation::Allocated(fields) => {
                log::debug!(
                    "Allocated a {} grid for a {} surface",
                    fields.resolution,
                    self.surface
                );
                self.fluid = Some(Fluid::new(fields, &self.settings));
            }
            Allocation::Deferred => {
                log::debug!("Deferring allocation for a {} surface", self.surface);
            }
        }

        Ok(())
    }

    /// Stop the simulation and release every resource. Allowed from any state.
    pub fn dispose(&mut self) {
        if self.state != State::Disposed {
            log::debug!("{:?} -> {:?}", self.state, State::Disposed);
        }

        self.state = State::Disposed;
        self.fluid = None;
        self.backend = None;
    }

    /// The platform took the rendering context away.
    pub fn lose_context(&mut self) {
        log::warn!("Lost the rendering context");
        self.dispose();
    }

    pub fn press(&mut self, id: PointerId, x: f32, y: f32) {
        self.pointers.press(id, x, y);
    }

    pub fn move_to(&mut self, id: PointerId, x: f32, y: f32) {
        self.pointers.move_to(id, x, y);
    }

    pub fn release(&mut self, id: PointerId) {
        self.pointers.release(id);
    }

    /// Queue `count` splats at random points of the surface. They're applied
    /// on the next frame.
    pub fn random_splats(&mut self, count: u32) {
        let Size { width, height } = self.surface;
        if !self.surface.is_renderable() {
            return;
        }

        for _ in 0..count {
            let rng = self.pointers.rng();
            let impulse = Impulse {
                x: width as f32 * rng.random::<f32>(),
                y: height as f32 * rng.random::<f32>(),
                dx: rng.random_range(-500.0..500.0),
                dy: rng.random_range(-500.0..500.0),
                color: [
                    rng.random_range(0.0..10.0),
                    rng.random_range(0.0..10.0),
                    rng.random_range(0.0..10.0),
                ],
            };
            self.pointers.queue(impulse);
        }
    }
}
