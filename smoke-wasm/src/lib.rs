use gloo_utils::format::JsValueSerdeExt;
use smoke::{ContextAttributes, GlBackend, PointerId, Settings, Size, Smoke};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    EventTarget, HtmlCanvasElement, PointerEvent, WebGl2RenderingContext, WebGlRenderingContext,
    Window,
};

type AnimationFrame = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// A smoke simulation mounted on a canvas element.
#[wasm_bindgen]
pub struct SmokeBackground {
    session: Rc<RefCell<Session>>,
    animation_frame: AnimationFrame,
    listeners: Vec<Listener>,
}

#[wasm_bindgen]
impl SmokeBackground {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, settings_object: &JsValue) -> Result<SmokeBackground, JsValue> {
        // Fails if an earlier instance already installed the logger.
        let _ = console_log::init_with_level(log::Level::Debug);
        set_panic_hook();

        Self::mount(canvas_id, settings_object).map_err(|err| {
            log::error!("Cannot start the smoke background: {:?}", err);
            err
        })
    }

    /// Start the animation loop.
    pub fn start(&mut self) -> Result<(), JsValue> {
        self.session.borrow_mut().smoke.start().map_err(to_js)?;

        let session = Rc::clone(&self.session);
        let animation_frame = Rc::clone(&self.animation_frame);
        *self.animation_frame.borrow_mut() = Some(Closure::new(move |timestamp: f64| {
            let mut session = session.borrow_mut();
            session.frame(timestamp);

            if !session.smoke.is_running() {
                session.request_id = None;
                return;
            }

            if let Some(callback) = animation_frame.borrow().as_ref() {
                session.request_id = request_animation_frame(callback).ok();
            }
        }));

        if let Some(callback) = self.animation_frame.borrow().as_ref() {
            self.session.borrow_mut().request_id = Some(request_animation_frame(callback)?);
        }

        Ok(())
    }

    /// Stop the animation loop, detach every listener and release the GL
    /// resources. The instance can't be restarted.
    pub fn dispose(&mut self) {
        self.listeners.clear();

        if let Ok(mut session) = self.session.try_borrow_mut() {
            if let Some(request_id) = session.request_id.take() {
                if let Ok(window) = window() {
                    let _ = window.cancel_animation_frame(request_id);
                }
            }
            session.smoke.dispose();
        }

        // Breaks the cycle between the frame callback and itself.
        self.animation_frame.borrow_mut().take();
    }
}

impl SmokeBackground {
    fn mount(canvas_id: &str, settings_object: &JsValue) -> Result<Self, JsValue> {
        let settings: Settings = if settings_object.is_undefined() || settings_object.is_null() {
            Settings::default()
        } else {
            settings_object.into_serde().map_err(to_js)?
        };

        let window = window()?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("Expected to find a document"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| {
                JsValue::from_str(&format!("Expected a canvas element with id `{}`", canvas_id))
            })?
            .dyn_into::<HtmlCanvasElement>()?;

        let surface = resize_canvas(&window, &canvas);
        let context = Rc::new(get_rendering_context(&canvas)?);
        let backend = GlBackend::new(&context).map_err(to_js)?;

        let mut smoke = Smoke::new(backend, &Rc::new(settings));
        smoke.initialize(surface).map_err(to_js)?;

        let session = Rc::new(RefCell::new(Session {
            canvas: canvas.clone(),
            smoke,
            request_id: None,
        }));

        let mut listeners = Vec::new();
        for (name, action) in [
            ("pointermove", PointerAction::Move),
            ("pointerdown", PointerAction::Press),
            ("pointerup", PointerAction::Release),
            ("pointercancel", PointerAction::Release),
        ] {
            let session = Rc::clone(&session);
            listeners.push(Listener::new(&window, name, move |event| {
                let Some(event) = event.dyn_ref::<PointerEvent>() else {
                    return;
                };
                if let Ok(mut session) = session.try_borrow_mut() {
                    session.pointer(action, event);
                }
            })?);
        }

        let lost = Rc::clone(&session);
        listeners.push(Listener::new(&canvas, "webglcontextlost", move |_| {
            if let Ok(mut session) = lost.try_borrow_mut() {
                session.smoke.lose_context();
            }
        })?);

        Ok(Self {
            session,
            animation_frame: Rc::new(RefCell::new(None)),
            listeners,
        })
    }
}

impl Drop for SmokeBackground {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct Session {
    canvas: HtmlCanvasElement,
    smoke: Smoke<GlBackend>,
    request_id: Option<i32>,
}

impl Session {
    fn frame(&mut self, timestamp: f64) {
        if let Ok(window) = window() {
            let surface = resize_canvas(&window, &self.canvas);
            self.smoke.resize(surface);
        }

        self.smoke.animate(timestamp);
    }

    fn pointer(&mut self, action: PointerAction, event: &PointerEvent) {
        let id = if event.pointer_type() == "mouse" {
            PointerId::Mouse
        } else {
            PointerId::Touch(event.pointer_id() as u64)
        };

        match action {
            // The mouse keeps splatting while it hovers.
            PointerAction::Release if id == PointerId::Mouse => (),
            PointerAction::Release => self.smoke.release(id),
            PointerAction::Press | PointerAction::Move => {
                let Some((x, y)) = to_canvas_pixels(&self.canvas, event) else {
                    return;
                };

                if action == PointerAction::Press {
                    self.smoke.press(id, x, y);
                } else {
                    self.smoke.move_to(id, x, y);
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PointerAction {
    Move,
    Press,
    Release,
}

// An event listener that detaches itself when dropped.
struct Listener {
    target: EventTarget,
    name: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl Listener {
    fn new(
        target: &EventTarget,
        name: &'static str,
        callback: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut(web_sys::Event)>::new(callback);
        target.add_event_listener_with_callback(name, callback.as_ref().unchecked_ref())?;

        Ok(Self {
            target: target.clone(),
            name,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.name, self.callback.as_ref().unchecked_ref());
    }
}

/// Try WebGL2 first, then fall back to WebGL1.
fn get_rendering_context(canvas: &HtmlCanvasElement) -> Result<glow::Context, JsValue> {
    let options = JsValue::from_serde(&ContextAttributes::default()).map_err(to_js)?;

    if let Ok(Some(gl)) = canvas.get_context_with_context_options("webgl2", &options) {
        let gl = gl.dyn_into::<WebGl2RenderingContext>()?;
        for extension in ["EXT_color_buffer_float", "OES_texture_float_linear"] {
            if gl.get_extension(extension)?.is_none() {
                log::debug!("{} is unavailable", extension);
            }
        }

        return Ok(glow::Context::from_webgl2_context(gl));
    }

    for context_id in ["webgl", "experimental-webgl"] {
        if let Ok(Some(gl)) = canvas.get_context_with_context_options(context_id, &options) {
            let gl = gl.dyn_into::<WebGlRenderingContext>()?;
            for extension in ["OES_texture_half_float", "OES_texture_half_float_linear"] {
                if gl.get_extension(extension)?.is_none() {
                    log::debug!("{} is unavailable", extension);
                }
            }

            log::warn!("WebGL2 is unavailable. Falling back to {}", context_id);
            return Ok(glow::Context::from_webgl1_context(gl));
        }
    }

    Err(JsValue::from_str("Can’t create a WebGL rendering context"))
}

/// Match the canvas backing store to its CSS size and the device pixel ratio.
fn resize_canvas(window: &Window, canvas: &HtmlCanvasElement) -> Size {
    let (width, height) = physical_from_logical_size(
        canvas.client_width().max(0) as u32,
        canvas.client_height().max(0) as u32,
        window.device_pixel_ratio(),
    );

    if canvas.width() != width {
        canvas.set_width(width);
    }
    if canvas.height() != height {
        canvas.set_height(height);
    }

    Size::new(width, height)
}

// Map a pointer position into canvas pixels, with the origin at the top left.
// Positions outside the canvas are dropped.
fn to_canvas_pixels(canvas: &HtmlCanvasElement, event: &PointerEvent) -> Option<(f32, f32)> {
    let rect = canvas.get_bounding_client_rect();
    let x = f64::from(event.client_x()) - rect.left();
    let y = f64::from(event.client_y()) - rect.top();

    if x < 0.0 || y < 0.0 || x >= rect.width() || y >= rect.height() {
        return None;
    }

    Some((
        (x * f64::from(canvas.width()) / rect.width()) as f32,
        (y * f64::from(canvas.height()) / rect.height()) as f32,
    ))
}

fn request_animation_frame(callback: &Closure<dyn FnMut(f64)>) -> Result<i32, JsValue> {
    window()?.request_animation_frame(callback.as_ref().unchecked_ref())
}

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("The global `window` doesn’t exist"))
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// https://github.com/rustwasm/console_error_panic_hook#readme
fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn physical_from_logical_size(
    logical_width: u32,
    logical_height: u32,
    pixel_ratio: f64,
) -> (u32, u32) {
    (
        (pixel_ratio * f64::from(logical_width)) as u32,
        (pixel_ratio * f64::from(logical_height)) as u32,
    )
}
