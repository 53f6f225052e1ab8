use super::types::{InputEvent, MouseButton};

/// What a button release does to the button flags.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ReleasePolicy {
    /// Release clears the released button's flag; flags mean "currently held".
    #[default]
    Clear,
    /// A press sets the pressed button's flag and clears the other one; release
    /// leaves both. Flags mean "pressed last".
    Latch,
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
}

/// Pointer state folded into parameter blocks.
///
/// Only the primary button (`MouseButton::Left`) drives the drag; the
/// secondary button only has a flag.
#[derive(Debug, Clone, Default)]
pub struct PointerState {
    policy: ReleasePolicy,
    /// Last known cursor position, physical pixels.
    cursor: Option<(f32, f32)>,
    active: [f32; 2],
    primary: bool,
    secondary: bool,
    phase: DragPhase,
}

impl PointerState {
    pub fn new(policy: ReleasePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    /// Applies one event.
    pub fn apply(&mut self, ev: &InputEvent) {
        match ev {
            InputEvent::CursorMoved { x, y } => self.pointer_move(*x, *y),

            InputEvent::Button {
                button,
                pressed: true,
                x,
                y,
            } => self.pointer_down(*button, *x, *y),
            InputEvent::Button { button, .. } => self.pointer_up(*button),

            InputEvent::CursorLeft => {
                self.cursor = None;
            }

            InputEvent::Focus(f) => {
                // Releases are not delivered while unfocused.
                if !*f {
                    self.phase = DragPhase::Idle;
                    if self.policy == ReleasePolicy::Clear {
                        self.primary = false;
                        self.secondary = false;
                    }
                }
            }
        }
    }

    pub fn pointer_down(&mut self, button: MouseButton, x: f32, y: f32) {
        self.cursor = Some((x, y));

        match self.policy {
            ReleasePolicy::Clear => match button {
                MouseButton::Left => self.primary = true,
                MouseButton::Right => self.secondary = true,
                _ => {}
            },
            ReleasePolicy::Latch => {
                self.primary = button == MouseButton::Left;
                self.secondary = button == MouseButton::Right;
            }
        }

        if button == MouseButton::Left {
            self.active = [x, y];
            self.phase = DragPhase::Dragging;
        }
    }

    pub fn pointer_up(&mut self, button: MouseButton) {
        if button == MouseButton::Left {
            self.phase = DragPhase::Idle;
        }

        if self.policy == ReleasePolicy::Clear {
            match button {
                MouseButton::Left => self.primary = false,
                MouseButton::Right => self.secondary = false,
                _ => {}
            }
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        self.cursor = Some((x, y));
        if self.phase == DragPhase::Dragging {
            self.active = [x, y];
        }
    }

    /// Position recorded at the last primary press, updated while dragging.
    pub fn active_point(&self) -> [f32; 2] {
        self.active
    }

    pub fn cursor(&self) -> Option<(f32, f32)> {
        self.cursor
    }

    pub fn phase(&self) -> DragPhase {
        self.phase
    }

    pub fn is_dragging(&self) -> bool {
        self.phase == DragPhase::Dragging
    }

    /// Flag of `button`; only the primary and secondary buttons are tracked.
    pub fn button_flag(&self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.primary,
            MouseButton::Right => self.secondary,
            _ => false,
        }
    }

    /// `(active.x, active.y, primary, secondary)` with flags as 0.0 / 1.0.
    pub fn as_vec4(&self) -> [f32; 4] {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        [self.active[0], self.active[1], flag(self.primary), flag(self.secondary)]
    }
}
