use ::winit::event::{ElementState, MouseButton as WinitButton, WindowEvent};

use crate::input::{InputEvent, MouseButton};

/// `InputEvent` for a winit window event, or `None` when the pointer state
/// has no use for it.
///
/// winit 0.30 sends no position with `MouseInput`, so presses are stamped with
/// `cursor`, the last tracked position (origin when unknown).
pub fn translate_window_event(cursor: Option<(f32, f32)>, event: &WindowEvent) -> Option<InputEvent> {
    let ev = match event {
        WindowEvent::CursorMoved { position, .. } => InputEvent::pointer_move(position.x as f32, position.y as f32),
        WindowEvent::CursorLeft { .. } => InputEvent::CursorLeft,
        WindowEvent::Focused(focused) => InputEvent::Focus(*focused),
        WindowEvent::MouseInput { state, button, .. } => {
            let (x, y) = cursor.unwrap_or_default();
            InputEvent::Button {
                button: button_from(*button),
                pressed: *state == ElementState::Pressed,
                x,
                y,
            }
        }
        _ => return None,
    };
    Some(ev)
}

// Back and forward keep their conventional X11 numbers.
fn button_from(b: WinitButton) -> MouseButton {
    match b {
        WinitButton::Left => MouseButton::Left,
        WinitButton::Right => MouseButton::Right,
        WinitButton::Middle => MouseButton::Middle,
        WinitButton::Back => MouseButton::Other(8),
        WinitButton::Forward => MouseButton::Other(9),
        WinitButton::Other(code) => MouseButton::Other(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_and_secondary_keep_their_identity() {
        assert_eq!(button_from(WinitButton::Left), MouseButton::Left);
        assert_eq!(button_from(WinitButton::Right), MouseButton::Right);
        assert_eq!(button_from(WinitButton::Back), MouseButton::Other(8));
        assert_eq!(button_from(WinitButton::Other(12)), MouseButton::Other(12));
    }

    #[test]
    fn focus_loss_is_forwarded() {
        assert_eq!(
            translate_window_event(None, &WindowEvent::Focused(false)),
            Some(InputEvent::Focus(false))
        );
    }

    #[test]
    fn unrelated_events_are_dropped() {
        assert_eq!(translate_window_event(Some((1.0, 2.0)), &WindowEvent::CloseRequested), None);
    }
}
