//! Keyboard and mouse snapshot.
//!
//! The presentation layer feeds raw events into [`Input`]; systems read the
//! snapshot during their update. [`Input::end_frame`] runs after the world
//! update and turns this frame's edges ("just pressed") into levels.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Keyboard keys, by physical position on a US layout.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Zero, One, Two, Three, Four, Five, Six, Seven, Eight, Nine,
    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    ArrowUp, ArrowDown, ArrowLeft, ArrowRight,
    Space, Enter, Escape, Tab, Backspace, Delete, Insert,
    Home, End, PageUp, PageDown,
    LeftShift, RightShift, LeftControl, RightControl,
    LeftAlt, RightAlt, LeftSuper, RightSuper,
    Minus, Equals, Comma, Period, Slash, Semicolon, Apostrophe,
    LeftBracket, RightBracket, Backslash, Grave,
}

/// State of one key for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    last: bool,
    current: bool,
}

impl KeyState {
    /// Pressed this frame, up last frame.
    pub fn just_pressed(&self) -> bool {
        !self.last && self.current
    }

    /// Released this frame, down last frame.
    pub fn just_released(&self) -> bool {
        self.last && !self.current
    }

    /// Down this frame.
    pub fn down(&self) -> bool {
        self.current
    }

    /// Up this frame.
    pub fn up(&self) -> bool {
        !self.current
    }
}

// ---------------------------------------------------------------------------
// Mouse
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// What the mouse did since the last frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MouseAction {
    #[default]
    Neutral,
    Press,
    Release,
    Move,
}

/// Modifier keys held during a mouse event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub super_key: bool,
}

/// Cursor state in window coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mouse {
    pub x: f32,
    pub y: f32,
    pub scroll_x: f32,
    pub scroll_y: f32,
    pub action: MouseAction,
    pub button: Option<MouseButton>,
    pub modifiers: Modifiers,
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Per-frame keyboard and mouse snapshot.
#[derive(Debug, Clone, Default)]
pub struct Input {
    keys: HashMap<Key, KeyState>,
    mouse: Mouse,
    /// Text typed this frame.
    chars: Vec<char>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    // -- event intake -------------------------------------------------------

    /// Record a key press or release.
    pub fn set_key(&mut self, key: Key, pressed: bool) {
        self.keys.entry(key).or_default().current = pressed;
    }

    /// Record the cursor position in window pixels.
    pub fn set_cursor(&mut self, x: f32, y: f32) {
        self.mouse.x = x;
        self.mouse.y = y;
        self.mouse.action = MouseAction::Move;
    }

    /// Record a mouse button press or release.
    pub fn set_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        self.mouse.button = Some(button);
        self.mouse.action = if pressed {
            MouseAction::Press
        } else {
            MouseAction::Release
        };
    }

    /// Accumulate wheel movement for this frame.
    pub fn add_scroll(&mut self, dx: f32, dy: f32) {
        self.mouse.scroll_x += dx;
        self.mouse.scroll_y += dy;
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.mouse.modifiers = modifiers;
    }

    /// Record typed text.
    pub fn push_char(&mut self, c: char) {
        self.chars.push(c);
    }

    // -- queries ------------------------------------------------------------

    /// State of `key` this frame. Keys never seen are up.
    pub fn key(&self, key: Key) -> KeyState {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    pub fn just_pressed(&self, key: Key) -> bool {
        self.key(key).just_pressed()
    }

    pub fn just_released(&self, key: Key) -> bool {
        self.key(key).just_released()
    }

    pub fn down(&self, key: Key) -> bool {
        self.key(key).down()
    }

    pub fn mouse(&self) -> &Mouse {
        &self.mouse
    }

    /// Characters typed this frame, in order.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    // -- frame boundary -----------------------------------------------------

    /// Advance key edges, drop scroll and text, and reset the mouse action.
    pub fn end_frame(&mut self) {
        for state in self.keys.values_mut() {
            state.last = state.current;
        }
        self.mouse.scroll_x = 0.0;
        self.mouse.scroll_y = 0.0;
        self.mouse.action = MouseAction::Neutral;
        self.chars.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
