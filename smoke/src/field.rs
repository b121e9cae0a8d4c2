use crate::backend::Backend;
use crate::context::TextureFormat;
use crate::render;
use crate::settings::Settings;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Shrink both dimensions by `2^shift`, flooring. Never upsamples.
    pub fn downsample(&self, shift: u32) -> Self {
        Self {
            width: self.width.checked_shr(shift).unwrap_or(0),
            height: self.height.checked_shr(shift).unwrap_or(0),
        }
    }

    pub fn is_renderable(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn texel_size(&self) -> [f32; 2] {
        [1.0 / self.width as f32, 1.0 / self.height as f32]
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
}

impl Filter {
    pub fn to_gl(self) -> u32 {
        match self {
            Filter::Nearest => glow::NEAREST,
            Filter::Linear => glow::LINEAR,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct FieldDescriptor {
    pub label: &'static str,
    pub size: Size,
    pub format: TextureFormat,
    pub filter: Filter,
}

/// Two same-sized slots, one of which is current.
///
/// A pass reads from `current()` and writes into `next()`. Swapping right
/// after the write makes the freshly written slot current.
#[derive(Debug)]
pub struct PingPong<T> {
    slots: [T; 2],
    current: usize,
}

impl<T> PingPong<T> {
    pub fn new(first: T, second: T) -> Self {
        Self {
            slots: [first, second],
            current: 0,
        }
    }

    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    pub fn next(&self) -> &T {
        &self.slots[1 - self.current]
    }

    /// Borrow the current slot for reading and the other one for writing.
    pub fn split(&mut self) -> (&T, &mut T) {
        let [first, second] = &mut self.slots;
        if self.current == 0 {
            (first, second)
        } else {
            (second, first)
        }
    }

    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

pub enum Allocation<F> {
    Allocated(Fields<F>),
    /// The surface, or the grid derived from it, has no area. Try again once
    /// a positive size is observed.
    Deferred,
}

pub struct Fields<F> {
    pub resolution: Size,
    pub velocity: PingPong<F>,
    pub density: PingPong<F>,
    pub pressure: PingPong<F>,
    pub divergence: F,
    pub curl: F,
}

impl<F> Fields<F> {
    pub fn allocate<B>(
        backend: &mut B,
        surface: Size,
        settings: &Settings,
    ) -> Result<Allocation<F>, render::Problem>
    where
        B: Backend<Field = F>,
    {
        let resolution = surface.downsample(settings.texture_downsample);
        if !resolution.is_renderable() {
            return Ok(Allocation::Deferred);
        }

        let capabilities = backend.capabilities().clone();
        let flow_filter = if capabilities.linear_filtering {
            Filter::Linear
        } else {
            Filter::Nearest
        };

        let mut create = |label, format, filter| {
            backend.create_field(&FieldDescriptor {
                label,
                size: resolution,
                format,
                filter,
            })
        };

        let density = PingPong::new(
            create("density_0", capabilities.color_format, flow_filter)?,
            create("density_1", capabilities.color_format, flow_filter)?,
        );
        let velocity = PingPong::new(
            create("velocity_0", capabilities.vector_format, flow_filter)?,
            create("velocity_1", capabilities.vector_format, flow_filter)?,
        );
        let divergence = create("divergence", capabilities.vector_format, Filter::Nearest)?;
        let curl = create("curl", capabilities.vector_format, Filter::Nearest)?;
        let pressure = PingPong::new(
            create("pressure_0", capabilities.vector_format, Filter::Nearest)?,
            create("pressure_1", capabilities.vector_format, Filter::Nearest)?,
        );

        Ok(Allocation::Allocated(Fields {
            resolution,
            velocity,
            density,
            pressure,
            divergence,
            curl,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::backend::host::HostBackend;
    use crate::context::Capabilities;

    #[test]
    fn swapping_twice_is_the_identity() {
        let mut pair = PingPong::new("first", "second");
        assert_eq!(*pair.current(), "first");

        pair.swap();
        assert_eq!(*pair.current(), "second");
        assert_eq!(*pair.next(), "first");

        pair.swap();
        assert_eq!(*pair.current(), "first");
        assert_eq!(*pair.next(), "second");
    }

    #[test]
    fn split_writes_into_the_next_slot() {
        let mut pair = PingPong::new(1, 2);
        pair.swap();

        let (current, next) = pair.split();
        *next = *current * 10;
        pair.swap();

        assert_eq!(*pair.current(), 20);
        assert_eq!(*pair.next(), 2);
    }

    #[test]
    fn downsample_floors() {
        assert_eq!(Size::new(800, 600).downsample(0), Size::new(800, 600));
        assert_eq!(Size::new(800, 600).downsample(1), Size::new(400, 300));
        assert_eq!(Size::new(801, 599).downsample(1), Size::new(400, 299));
        assert_eq!(Size::new(3, 3).downsample(2), Size::new(0, 0));
        assert_eq!(Size::new(800, 600).downsample(40), Size::new(0, 0));
    }

    #[test]
    fn every_field_shares_the_grid_resolution() {
        let mut backend = HostBackend::new(Capabilities::webgl2(true));
        let settings = Settings::default();

        let fields = match Fields::allocate(&mut backend, Size::new(801, 603), &settings) {
            Ok(Allocation::Allocated(fields)) => fields,
            _ => panic!("expected the fields to be allocated"),
        };

        let expected = Size::new(400, 301);
        assert_eq!(fields.resolution, expected);
        for field in [
            fields.velocity.current(),
            fields.velocity.next(),
            fields.density.current(),
            fields.density.next(),
            fields.pressure.current(),
            fields.pressure.next(),
            &fields.divergence,
            &fields.curl,
        ] {
            assert_eq!(field.size(), expected);
        }
    }

    #[test]
    fn unrenderable_surfaces_defer_allocation() {
        let mut backend = HostBackend::new(Capabilities::webgl2(true));
        let settings = Settings::default();

        for surface in [Size::new(0, 0), Size::new(640, 0), Size::new(1, 1)] {
            assert!(matches!(
                Fields::allocate(&mut backend, surface, &settings),
                Ok(Allocation::Deferred)
            ));
        }
    }

    #[test]
    fn filtering_follows_the_capabilities() {
        let settings = Settings::default();

        let mut backend = HostBackend::new(Capabilities::webgl2(false));
        let Ok(Allocation::Allocated(fields)) =
            Fields::allocate(&mut backend, Size::new(64, 64), &settings)
        else {
            panic!("expected the fields to be allocated");
        };
        assert_eq!(fields.velocity.current().filter(), Filter::Nearest);
        assert_eq!(fields.density.current().filter(), Filter::Nearest);

        let mut backend = HostBackend::new(Capabilities::webgl2(true));
        let Ok(Allocation::Allocated(fields)) =
            Fields::allocate(&mut backend, Size::new(64, 64), &settings)
        else {
            panic!("expected the fields to be allocated");
        };
        assert_eq!(fields.velocity.current().filter(), Filter::Linear);
        assert_eq!(fields.density.current().filter(), Filter::Linear);
        assert_eq!(fields.pressure.current().filter(), Filter::Nearest);
        assert_eq!(fields.curl.filter(), Filter::Nearest);
    }
}
