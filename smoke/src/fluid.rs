use crate::backend::{Advection, Backend, Confinement, Splat};
use crate::field::{Fields, Size};
use crate::input::{Impulse, Pointers};
use crate::settings::Settings;
use std::rc::Rc;

pub struct Fluid<F> {
    settings: Rc<Settings>,
    fields: Fields<F>,
}

impl<F> Fluid<F> {
    pub fn new(fields: Fields<F>, settings: &Rc<Settings>) -> Self {
        Self {
            settings: Rc::clone(settings),
            fields,
        }
    }

    pub fn resolution(&self) -> Size {
        self.fields.resolution
    }

    pub fn fields(&self) -> &Fields<F> {
        &self.fields
    }

    /// Inject velocity and dye at a point given in surface pixels.
    ///
    /// `color` is attenuated by the configured intensity before it reaches
    /// the density field.
    pub fn splat<B>(&mut self, backend: &mut B, surface: Size, impulse: &Impulse)
    where
        B: Backend<Field = F>,
    {
        let point = [
            impulse.x / surface.width as f32,
            1.0 - impulse.y / surface.height as f32,
        ];
        let aspect_ratio = surface.aspect_ratio();
        let radius = self.settings.splat_radius;

        let (velocity, next) = self.fields.velocity.split();
        backend.splat(
            velocity,
            &Splat {
                point,
                // Surface y points down. Field y points up.
                color: [impulse.dx, -impulse.dy, 1.0],
                radius,
                aspect_ratio,
            },
            next,
        );
        self.fields.velocity.swap();

        let intensity = self.settings.color_intensity;
        let (density, next) = self.fields.density.split();
        backend.splat(
            density,
            &Splat {
                point,
                color: impulse.color.map(|channel| channel * intensity),
                radius,
                aspect_ratio,
            },
            next,
        );
        self.fields.density.swap();
    }

    /// Advance the simulation by `timestep` seconds and draw the dye to the
    /// surface.
    pub fn step<B>(&mut self, backend: &mut B, surface: Size, timestep: f32, pointers: &mut Pointers)
    where
        B: Backend<Field = F>,
    {
        let settings = Rc::clone(&self.settings);

        {
            let (velocity, next) = self.fields.velocity.split();
            backend.advect(
                velocity,
                velocity,
                &Advection {
                    timestep,
                    dissipation: settings.velocity_dissipation,
                },
                next,
            );
            self.fields.velocity.swap();
        }

        {
            let velocity = self.fields.velocity.current();
            let (density, next) = self.fields.density.split();
            backend.advect(
                velocity,
                density,
                &Advection {
                    timestep,
                    dissipation: settings.density_dissipation,
                },
                next,
            );
            self.fields.density.swap();
        }

        for pointer in pointers.iter_mut().filter(|pointer| pointer.moved) {
            pointer.moved = false;
            let impulse = Impulse {
                x: pointer.x,
                y: pointer.y,
                dx: pointer.dx,
                dy: pointer.dy,
                color: pointer.color,
            };
            self.splat(backend, surface, &impulse);
        }

        for impulse in pointers.take_impulses() {
            self.splat(backend, surface, &impulse);
        }

        backend.curl(self.fields.velocity.current(), &mut self.fields.curl);

        {
            let (velocity, next) = self.fields.velocity.split();
            backend.vorticity(
                velocity,
                &self.fields.curl,
                &Confinement {
                    strength: settings.curl,
                    timestep,
                },
                next,
            );
            self.fields.velocity.swap();
        }

        backend.divergence(self.fields.velocity.current(), &mut self.fields.divergence);

        {
            let (pressure, next) = self.fields.pressure.split();
            backend.clear(pressure, settings.pressure_dissipation, next);
            self.fields.pressure.swap();
        }

        for _ in 0..settings.pressure_iterations {
            let (pressure, next) = self.fields.pressure.split();
            backend.pressure(pressure, &self.fields.divergence, next);
            self.fields.pressure.swap();
        }

        {
            let pressure = self.fields.pressure.current();
            let (velocity, next) = self.fields.velocity.split();
            backend.subtract_gradient(pressure, velocity, next);
            self.fields.velocity.swap();
        }

        backend.display(self.fields.density.current(), surface);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::host::{HostBackend, HostField};
    use crate::backend::recorder::{Pass, Recorder};
    use crate::context::Capabilities;
    use crate::field::Allocation;
    use crate::input::PointerId;
    use approx::assert_relative_eq;

    fn settings(texture_downsample: u32) -> Rc<Settings> {
        Rc::new(Settings {
            texture_downsample,
            seed: Some("fluid".into()),
            ..Default::default()
        })
    }

    fn fluid<B>(backend: &mut B, surface: Size, settings: &Rc<Settings>) -> Fluid<HostField>
    where
        B: Backend<Field = HostField>,
    {
        match Fields::allocate(backend, surface, settings) {
            Ok(Allocation::Allocated(fields)) => Fluid::new(fields, settings),
            _ => panic!("expected the fields to be allocated"),
        }
    }

    fn total(field: &HostField) -> [f32; 3] {
        field.texels().iter().fold([0.0; 3], |sum, texel| {
            [sum[0] + texel[0], sum[1] + texel[1], sum[2] + texel[2]]
        })
    }

    #[test]
    fn stages_run_in_order() {
        let settings = settings(0);
        let surface = Size::new(32, 32);
        let mut backend = Recorder::new(Capabilities::webgl2(true));
        let mut fluid = fluid(&mut backend, surface, &settings);
        let mut pointers = Pointers::new(&settings);

        pointers.move_to(PointerId::Mouse, 10.0, 10.0);
        pointers.move_to(PointerId::Mouse, 12.0, 10.0);
        fluid.step(&mut backend, surface, 0.016, &mut pointers);

        let mut expected = vec![
            "advect",
            "advect",
            "splat",
            "splat",
            "curl",
            "vorticity",
            "divergence",
            "clear",
        ];
        expected.extend(std::iter::repeat("pressure").take(25));
        expected.extend(["subtract_gradient", "display"]);

        assert_eq!(backend.names(), expected);
    }

    #[test]
    fn no_splat_without_movement() {
        let settings = settings(0);
        let surface = Size::new(32, 32);
        let mut backend = Recorder::new(Capabilities::webgl2(true));
        let mut fluid = fluid(&mut backend, surface, &settings);
        let mut pointers = Pointers::new(&settings);

        // Tracked, pressed, but never moved.
        pointers.press(PointerId::Touch(1), 16.0, 16.0);
        fluid.step(&mut backend, surface, 0.016, &mut pointers);

        assert_eq!(backend.count("splat"), 0);
        assert!(total(fluid.fields().density.current())
            .iter()
            .all(|channel| *channel == 0.0));
    }

    #[test]
    fn a_move_is_consumed_once() {
        let settings = settings(0);
        let surface = Size::new(32, 32);
        let mut backend = Recorder::new(Capabilities::webgl2(true));
        let mut fluid = fluid(&mut backend, surface, &settings);
        let mut pointers = Pointers::new(&settings);

        pointers.press(PointerId::Touch(1), 16.0, 16.0);
        pointers.move_to(PointerId::Touch(1), 18.0, 16.0);
        fluid.step(&mut backend, surface, 0.016, &mut pointers);
        fluid.step(&mut backend, surface, 0.016, &mut pointers);

        assert_eq!(backend.count("splat"), 2);
        assert!(!pointers.get(PointerId::Touch(1)).unwrap().moved);
    }

    #[test]
    fn pressure_iterations_alternate_buffers() {
        let settings = Rc::new(Settings {
            texture_downsample: 0,
            pressure_iterations: 7,
            ..Default::default()
        });
        let surface = Size::new(16, 16);
        let mut backend = Recorder::new(Capabilities::webgl2(true));
        let mut fluid = fluid(&mut backend, surface, &settings);
        let mut pointers = Pointers::new(&settings);

        fluid.step(&mut backend, surface, 0.016, &mut pointers);

        let solves: Vec<(u64, u64)> = backend
            .passes
            .iter()
            .filter_map(|pass| match *pass {
                Pass::Pressure {
                    pressure, target, ..
                } => Some((pressure, target)),
                _ => None,
            })
            .collect();
        assert_eq!(solves.len(), 7);

        for (source, target) in &solves {
            assert_ne!(source, target);
        }
        for pair in solves.windows(2) {
            // Each iteration reads what the previous one wrote.
            assert_eq!(pair[0].1, pair[1].0);
            assert_eq!(pair[0].0, pair[1].1);
        }

        // The clear feeds the first iteration.
        let clear_target = backend.passes.iter().find_map(|pass| match *pass {
            Pass::Clear { target, value, .. } => {
                assert_relative_eq!(value, 0.8);
                Some(target)
            }
            _ => None,
        });
        assert_eq!(clear_target, Some(solves[0].0));
    }

    #[test]
    fn splat_at_the_center_of_800_by_600() {
        let settings = settings(1);
        let surface = Size::new(800, 600);
        let mut backend = HostBackend::new(Capabilities::webgl2(true));
        let mut fluid = fluid(&mut backend, surface, &settings);
        let mut pointers = Pointers::new(&settings);

        assert_eq!(fluid.resolution(), Size::new(400, 300));
        assert!(total(fluid.fields().density.current()) == [0.0; 3]);
        assert!(total(fluid.fields().velocity.current()) == [0.0; 3]);

        pointers.press(PointerId::Touch(0), 399.0, 300.0);
        pointers.move_to(PointerId::Touch(0), 400.0, 300.0);
        let color = [1.0, 0.5, 0.25];
        pointers.iter_mut().for_each(|pointer| pointer.color = color);

        fluid.step(&mut backend, surface, 0.016, &mut pointers);

        let density = fluid.fields().density.current();
        let center = density.texel(200, 150);
        for channel in 0..3 {
            assert_relative_eq!(center[channel], color[channel] * 0.3, epsilon = 1e-3);
        }
        for (x, y) in [(0, 0), (399, 0), (0, 299), (399, 299), (20, 150)] {
            let far = density.texel(x, y);
            assert!(far[0].abs() < 1e-6 && far[1].abs() < 1e-6 && far[2].abs() < 1e-6);
        }

        // The rightward push shows up in the velocity field.
        let velocity = fluid.fields().velocity.current();
        assert!(velocity.texel(200, 150)[0] > 0.0);

        let frame = backend.frame().unwrap();
        assert_eq!(frame.size, surface);
        assert!(frame.pixel(400, 300)[0] > 0.2);
    }

    #[test]
    fn concurrent_pointers_both_splat() {
        let settings = settings(0);
        let surface = Size::new(64, 64);

        let run = |moving: &[PointerId]| {
            let mut backend = HostBackend::new(Capabilities::webgl2(true));
            let mut fluid = fluid(&mut backend, surface, &settings);
            let mut pointers = Pointers::new(&settings);

            pointers.press(PointerId::Touch(1), 16.0, 16.0);
            pointers.press(PointerId::Touch(2), 48.0, 40.0);
            for id in moving {
                let pointer = pointers.get(*id).unwrap().clone();
                pointers.move_to(*id, pointer.x + 1.0, pointer.y);
            }

            fluid.step(&mut backend, surface, 0.016, &mut pointers);
            total(fluid.fields().density.current())
        };

        let first = run(&[PointerId::Touch(1)]);
        let second = run(&[PointerId::Touch(2)]);
        let both = run(&[PointerId::Touch(1), PointerId::Touch(2)]);

        for channel in 0..3 {
            assert!(first[channel] > 0.0 && second[channel] > 0.0);
            assert_relative_eq!(
                both[channel],
                first[channel] + second[channel],
                max_relative = 1e-4
            );
        }
    }

    #[test]
    fn queued_impulses_are_splatted() {
        let settings = settings(0);
        let surface = Size::new(32, 32);
        let mut backend = Recorder::new(Capabilities::webgl1(false));
        let mut fluid = fluid(&mut backend, surface, &settings);
        let mut pointers = Pointers::new(&settings);

        pointers.queue(Impulse {
            x: 16.0,
            y: 16.0,
            dx: 100.0,
            dy: 0.0,
            color: [5.0, 5.0, 5.0],
        });
        fluid.step(&mut backend, surface, 0.016, &mut pointers);

        assert_eq!(backend.count("splat"), 2);
        let splats: Vec<Splat> = backend
            .passes
            .iter()
            .filter_map(|pass| match pass {
                Pass::Splat { splat, .. } => Some(*splat),
                _ => None,
            })
            .collect();
        assert_eq!(splats[0].color, [100.0, -0.0, 1.0]);
        assert_relative_eq!(splats[1].color[0], 1.5);
        assert_eq!(splats[0].point, [0.5, 0.5]);
    }
}
