/// Pointer button. Only `Left` (primary) and `Right` (secondary) reach the
/// parameter blocks; the rest are tracked for completeness.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// Back, forward and vendor buttons, by platform code.
    Other(u16),
}

/// Input after platform translation. Positions are physical pixels with the
/// origin at the top-left of the client area.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    CursorMoved { x: f32, y: f32 },
    /// Platforms report no position with buttons; the runtime stamps the last
    /// cursor position.
    Button {
        button: MouseButton,
        pressed: bool,
        x: f32,
        y: f32,
    },
    CursorLeft,
    Focus(bool),
}

impl InputEvent {
    pub fn pointer_down(button: MouseButton, x: f32, y: f32) -> Self {
        Self::Button {
            button,
            pressed: true,
            x,
            y,
        }
    }

    /// The position of a release is never read.
    pub fn pointer_up(button: MouseButton) -> Self {
        Self::Button {
            button,
            pressed: false,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::CursorMoved { x, y }
    }
}
