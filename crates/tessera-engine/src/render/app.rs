//! Windowed runner.
//!
//! [`run_windowed`] drives an [`Engine`] inside a winit event loop. The
//! loop sleeps until the engine's ticker is due, then requests a redraw.
//! Each `RedrawRequested` event runs one engine frame and hands the recorded
//! [`RenderFrame`](super::RenderFrame) to the [`GpuRenderer`]. Window events
//! are translated into the engine's [`Input`](crate::input::Input) snapshot.
//!
//! This module is feature-gated behind `renderer`.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, WindowAttributes, WindowId};

use super::gpu::GpuRenderer;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::input::{Key, Modifiers, MouseButton};

/// Open a window and run `engine` until it closes.
///
/// # Errors
///
/// Returns an error if the event loop, the window or the GPU backend cannot
/// be created.
pub fn run_windowed(engine: &mut Engine) -> Result<(), EngineError> {
    let event_loop = EventLoop::new().map_err(|e| EngineError::Window(e.to_string()))?;
    event_loop.set_control_flow(ControlFlow::WaitUntil(engine.ticker().deadline()));

    let mut app = App {
        engine,
        state: AppState::Pending,
        init_error: None,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| EngineError::Window(e.to_string()))?;

    match app.init_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Internal state machine
// ---------------------------------------------------------------------------

/// Winit 0.30 only allows window creation inside `resumed`, so the renderer
/// starts out pending.
enum AppState {
    Pending,
    Running { renderer: GpuRenderer },
}

struct App<'a> {
    engine: &'a mut Engine,
    state: AppState,
    /// Set when window or GPU setup fails, so `run_windowed` can report it
    /// after the event loop exits.
    init_error: Option<EngineError>,
}

impl App<'_> {
    fn create_renderer(&self, event_loop: &ActiveEventLoop) -> Result<GpuRenderer, EngineError> {
        let options = self.engine.options();
        let mut attributes = WindowAttributes::default()
            .with_title(options.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(options.width, options.height));
        if options.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = event_loop
            .create_window(attributes)
            .map_err(|e| EngineError::Window(e.to_string()))?;
        let window = Arc::new(window);
        pollster::block_on(GpuRenderer::new(window, options.vsync))
            .map_err(|e| EngineError::Gpu(format!("{e:#}")))
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        self.engine.step();
        if self.engine.is_closed() {
            event_loop.exit();
            return;
        }

        let AppState::Running { renderer } = &mut self.state else {
            return;
        };
        let commands = self.engine.context().frame.borrow_mut().take();
        match renderer.render(&commands) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = renderer.window().inner_size();
                renderer.resize(size);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("GPU out of memory; exiting");
                event_loop.exit();
            }
            Err(e) => {
                tracing::warn!(error = %e, "surface error during render");
            }
        }
    }
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if matches!(self.state, AppState::Running { .. }) {
            return;
        }
        match self.create_renderer(event_loop) {
            Ok(renderer) => {
                let size = renderer.window().inner_size();
                tracing::info!(width = size.width, height = size.height, "window created");
                self.engine.resize(size.width as f32, size.height as f32);
                renderer.window().request_redraw();
                self.state = AppState::Running { renderer };
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to initialize window; exiting");
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let AppState::Running { renderer } = &mut self.state else {
            return;
        };
        let input = self.engine.context().input.clone();

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!(frames = self.engine.clock().frames(), "window close requested");
                self.engine.request_close();
            }
            WindowEvent::Resized(size) => {
                renderer.resize(size);
                if size.width > 0 && size.height > 0 {
                    self.engine.resize(size.width as f32, size.height as f32);
                }
            }
            WindowEvent::RedrawRequested => self.frame(event_loop),
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = map_key(code) {
                        input.borrow_mut().set_key(key, pressed);
                    }
                }
                if pressed {
                    if let Some(text) = &event.text {
                        let mut input = input.borrow_mut();
                        text.chars().filter(|c| !c.is_control()).for_each(|c| input.push_char(c));
                    }
                }
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                input.borrow_mut().set_modifiers(Modifiers {
                    shift: state.shift_key(),
                    control: state.control_key(),
                    alt: state.alt_key(),
                    super_key: state.super_key(),
                });
            }
            WindowEvent::CursorMoved { position, .. } => {
                input
                    .borrow_mut()
                    .set_cursor(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    winit::event::MouseButton::Left => MouseButton::Left,
                    winit::event::MouseButton::Right => MouseButton::Right,
                    winit::event::MouseButton::Middle => MouseButton::Middle,
                    _ => return,
                };
                input
                    .borrow_mut()
                    .set_mouse_button(button, state == ElementState::Pressed);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (dx, dy) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (x, y),
                    MouseScrollDelta::PixelDelta(p) => (p.x as f32 / 40.0, p.y as f32 / 40.0),
                };
                input.borrow_mut().add_scroll(dx, dy);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_closed() {
            event_loop.exit();
            return;
        }
        if let AppState::Running { renderer } = &self.state {
            if self.engine.poll_frame(Instant::now()) {
                renderer.window().request_redraw();
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.engine.ticker().deadline()));
    }
}

/// The engine key for a physical key, if it has one.
fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyA => Key::A,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,
        KeyCode::Digit0 => Key::Zero,
        KeyCode::Digit1 => Key::One,
        KeyCode::Digit2 => Key::Two,
        KeyCode::Digit3 => Key::Three,
        KeyCode::Digit4 => Key::Four,
        KeyCode::Digit5 => Key::Five,
        KeyCode::Digit6 => Key::Six,
        KeyCode::Digit7 => Key::Seven,
        KeyCode::Digit8 => Key::Eight,
        KeyCode::Digit9 => Key::Nine,
        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,
        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,
        KeyCode::Space => Key::Space,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
        KeyCode::Escape => Key::Escape,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Insert => Key::Insert,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::ShiftLeft => Key::LeftShift,
        KeyCode::ShiftRight => Key::RightShift,
        KeyCode::ControlLeft => Key::LeftControl,
        KeyCode::ControlRight => Key::RightControl,
        KeyCode::AltLeft => Key::LeftAlt,
        KeyCode::AltRight => Key::RightAlt,
        KeyCode::SuperLeft => Key::LeftSuper,
        KeyCode::SuperRight => Key::RightSuper,
        KeyCode::Minus => Key::Minus,
        KeyCode::Equal => Key::Equals,
        KeyCode::Comma => Key::Comma,
        KeyCode::Period => Key::Period,
        KeyCode::Slash => Key::Slash,
        KeyCode::Semicolon => Key::Semicolon,
        KeyCode::Quote => Key::Apostrophe,
        KeyCode::BracketLeft => Key::LeftBracket,
        KeyCode::BracketRight => Key::RightBracket,
        KeyCode::Backslash => Key::Backslash,
        KeyCode::Backquote => Key::Grave,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_arrows_map() {
        assert_eq!(map_key(KeyCode::KeyW), Some(Key::W));
        assert_eq!(map_key(KeyCode::ArrowLeft), Some(Key::ArrowLeft));
        assert_eq!(map_key(KeyCode::NumpadEnter), Some(Key::Enter));
        assert_eq!(map_key(KeyCode::MediaPlayPause), None);
    }
}
