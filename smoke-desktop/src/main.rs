use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, GlProfile, NotCurrentGlContext, PossiblyCurrentContext,
    Version,
};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use smoke::{GlBackend, PointerId, Settings, Size, Smoke};
use std::error::Error;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, Touch, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

const RANDOM_SPLATS: u32 = 10;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let settings = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Reading settings from {}", path);
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        }
        None => Settings::default(),
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(Rc::new(settings));
    event_loop.run_app(&mut app)?;

    Ok(())
}

struct App {
    settings: Rc<Settings>,
    start: Instant,
    graphics: Option<Graphics>,
    // The mouse is tracked while it hovers over the window.
    hovering: bool,
}

// Dropped in declaration order. The session releases its GL objects while the
// context is still current.
struct Graphics {
    smoke: Smoke<GlBackend>,
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    window: Window,
}

impl App {
    fn new(settings: Rc<Settings>) -> Self {
        Self {
            settings,
            start: Instant::now(),
            graphics: None,
            hovering: false,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }

        match Graphics::new(event_loop, &self.settings) {
            Ok(graphics) => {
                graphics.window.request_redraw();
                self.graphics = Some(graphics);
            }
            Err(err) => {
                log::error!("Cannot start the smoke background: {}", err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                graphics.smoke.dispose();
                self.graphics = None;
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => graphics.resize(physical_size),

            WindowEvent::RedrawRequested => {
                let timestamp = self.start.elapsed().as_secs_f64() * 1000.0;
                graphics.smoke.animate(timestamp);

                if !graphics.smoke.is_running() {
                    log::info!("The simulation stopped");
                    self.graphics = None;
                    event_loop.exit();
                    return;
                }

                if let Err(err) = graphics.gl_surface.swap_buffers(&graphics.gl_context) {
                    log::error!("Cannot swap buffers: {}", err);
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = (position.x as f32, position.y as f32);
                if self.hovering {
                    graphics.smoke.move_to(PointerId::Mouse, x, y);
                } else {
                    graphics.smoke.press(PointerId::Mouse, x, y);
                    self.hovering = true;
                }
            }

            WindowEvent::CursorLeft { .. } => {
                graphics.smoke.release(PointerId::Mouse);
                self.hovering = false;
            }

            WindowEvent::Touch(Touch {
                id,
                phase,
                location,
                ..
            }) => {
                let pointer = PointerId::Touch(id);
                let (x, y) = (location.x as f32, location.y as f32);
                match phase {
                    TouchPhase::Started => graphics.smoke.press(pointer, x, y),
                    TouchPhase::Moved => graphics.smoke.move_to(pointer, x, y),
                    TouchPhase::Ended | TouchPhase::Cancelled => graphics.smoke.release(pointer),
                }
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Space),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => graphics.smoke.random_splats(RANDOM_SPLATS),

            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(graphics) = self.graphics.as_ref() {
            graphics.window.request_redraw();
        }
    }
}

impl Graphics {
    fn new(event_loop: &ActiveEventLoop, settings: &Rc<Settings>) -> Result<Self, Box<dyn Error>> {
        let window_attributes = Window::default_attributes()
            .with_title("Smoke")
            .with_resizable(true)
            .with_inner_size(LogicalSize::new(1280, 800));

        let template = ConfigTemplateBuilder::new().with_alpha_size(8);
        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(window_attributes))
            .build(event_loop, template, pick_config)?;
        let window = window.ok_or("Cannot create a window")?;

        let raw_window_handle = window.window_handle()?.as_raw();
        let gl_display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new()
            .with_profile(GlProfile::Core)
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .build(Some(raw_window_handle));
        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes)? };

        let surface_attributes = window.build_surface_attributes(Default::default())?;
        let gl_surface =
            unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes)? };
        let gl_context = not_current.make_current(&gl_surface)?;

        if let Err(err) =
            gl_surface.set_swap_interval(&gl_context, SwapInterval::Wait(NonZeroU32::MIN))
        {
            log::warn!("Cannot enable vsync: {}", err);
        }

        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|name| gl_display.get_proc_address(name))
        };
        let context = Rc::new(gl);

        let PhysicalSize { width, height } = window.inner_size();
        let backend = GlBackend::new(&context)?;
        let mut smoke = Smoke::new(backend, settings);
        smoke.initialize(Size::new(width, height))?;
        smoke.start()?;

        Ok(Self {
            smoke,
            gl_surface,
            gl_context,
            window,
        })
    }

    fn resize(&mut self, physical_size: PhysicalSize<u32>) {
        let PhysicalSize { width, height } = physical_size;
        if let (Some(width), Some(height)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
            self.gl_surface.resize(&self.gl_context, width, height);
        }
        self.smoke.resize(Size::new(width, height));
    }
}

// The simulation renders into its own textures. Skip multisampling.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .min_by_key(|config| config.num_samples())
        .expect("The display offers no GL configs")
}
