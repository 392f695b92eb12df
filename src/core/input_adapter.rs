use std::collections::HashSet;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use super::controller::{Button, Controller};
use crate::interaction::InputEvent;

/// Tracks held buttons from winit events and turns pointer activity into
/// surface-local [`InputEvent`]s in logical pixels
#[derive(Debug, Clone)]
pub struct WinitController {
    held: HashSet<Button>,
    /// Last pointer position, cleared when the pointer leaves the surface
    pointer: Option<(f32, f32)>,
}

impl WinitController {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            pointer: None,
        }
    }

    /// Update button state and translate pointer activity. Moves with the
    /// primary button held become drags.
    pub fn process_event(&mut self, event: &WindowEvent, scale_factor: f64) -> Option<InputEvent> {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(button) = Self::key_button(code) {
                        self.set_button(button, event.state);
                    }
                }
                None
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = Self::pointer_button(*button) {
                    self.set_button(button, *state);
                }
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f32>(scale_factor);
                let (x, y) = (logical.x, logical.y);

                match self.pointer.replace((x, y)) {
                    Some((px, py)) if self.is_down(Button::Primary) => {
                        Some(InputEvent::PointerDragged { dx: x - px, dy: y - py })
                    }
                    _ => Some(InputEvent::PointerMoved { x, y }),
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.pointer = None;
                None
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let notches = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                (notches != 0.0).then_some(InputEvent::Wheel { notches })
            }
            _ => None,
        }
    }

    /// Track an event something else has already handled, such as the
    /// overlay. Button and pointer state update; nothing is reported.
    pub fn absorb_event(&mut self, event: &WindowEvent, scale_factor: f64) {
        let _ = self.process_event(event, scale_factor);
    }

    /// Action triggered by a fresh key press; repeats and releases give None
    pub fn key_action(event: &KeyEvent) -> Option<Button> {
        if event.state != ElementState::Pressed || event.repeat {
            return None;
        }
        match event.physical_key {
            PhysicalKey::Code(code) => Self::key_button(code).filter(|b| b.is_action()),
            PhysicalKey::Unidentified(_) => None,
        }
    }

    fn set_button(&mut self, button: Button, state: ElementState) {
        match state {
            ElementState::Pressed => self.held.insert(button),
            ElementState::Released => self.held.remove(&button),
        };
    }

    fn key_button(code: KeyCode) -> Option<Button> {
        match code {
            KeyCode::KeyR => Some(Button::Reset),
            KeyCode::KeyH => Some(Button::ToggleOverlay),
            KeyCode::Escape => Some(Button::Quit),
            _ => None,
        }
    }

    fn pointer_button(button: MouseButton) -> Option<Button> {
        match button {
            MouseButton::Left => Some(Button::Primary),
            _ => None,
        }
    }
}

impl Default for WinitController {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller for WinitController {
    fn is_down(&self, button: Button) -> bool {
        self.held.contains(&button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::{DeviceId, TouchPhase};

    fn device() -> DeviceId {
        // SAFETY: only compared for equality, never handed to a backend
        unsafe { DeviceId::dummy() }
    }

    fn moved(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: device(),
            position: PhysicalPosition::new(x, y),
        }
    }

    fn left(state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: device(),
            state,
            button: MouseButton::Left,
        }
    }

    fn wheel(delta: MouseScrollDelta) -> WindowEvent {
        WindowEvent::MouseWheel {
            device_id: device(),
            delta,
            phase: TouchPhase::Moved,
        }
    }

    #[test]
    fn hover_reports_position() {
        let mut controller = WinitController::new();
        assert_eq!(
            controller.process_event(&moved(120.0, 80.0), 1.0),
            Some(InputEvent::PointerMoved { x: 120.0, y: 80.0 })
        );
        assert_eq!(
            controller.process_event(&moved(130.0, 90.0), 1.0),
            Some(InputEvent::PointerMoved { x: 130.0, y: 90.0 })
        );
    }

    #[test]
    fn primary_held_turns_moves_into_drags() {
        let mut controller = WinitController::new();
        controller.process_event(&moved(10.0, 10.0), 1.0);
        assert_eq!(controller.process_event(&left(ElementState::Pressed), 1.0), None);
        assert!(controller.is_down(Button::Primary));

        assert_eq!(
            controller.process_event(&moved(50.0, 4.0), 1.0),
            Some(InputEvent::PointerDragged { dx: 40.0, dy: -6.0 })
        );

        controller.process_event(&left(ElementState::Released), 1.0);
        assert_eq!(
            controller.process_event(&moved(60.0, 4.0), 1.0),
            Some(InputEvent::PointerMoved { x: 60.0, y: 4.0 })
        );
    }

    #[test]
    fn first_move_of_a_press_is_not_a_drag() {
        let mut controller = WinitController::new();
        controller.process_event(&left(ElementState::Pressed), 1.0);
        assert_eq!(
            controller.process_event(&moved(10.0, 10.0), 1.0),
            Some(InputEvent::PointerMoved { x: 10.0, y: 10.0 })
        );
    }

    #[test]
    fn release_over_overlay_still_ends_the_drag() {
        let mut controller = WinitController::new();
        controller.process_event(&left(ElementState::Pressed), 1.0);
        controller.process_event(&moved(10.0, 10.0), 1.0);

        // The overlay swallows the release
        controller.absorb_event(&left(ElementState::Released), 1.0);
        assert!(!controller.is_down(Button::Primary));

        assert_eq!(
            controller.process_event(&moved(50.0, 10.0), 1.0),
            Some(InputEvent::PointerMoved { x: 50.0, y: 10.0 })
        );
    }

    #[test]
    fn moves_under_overlay_keep_the_pointer_current() {
        let mut controller = WinitController::new();
        controller.process_event(&moved(10.0, 10.0), 1.0);
        controller.process_event(&left(ElementState::Pressed), 1.0);
        controller.absorb_event(&moved(200.0, 10.0), 1.0);

        assert_eq!(
            controller.process_event(&moved(205.0, 10.0), 1.0),
            Some(InputEvent::PointerDragged { dx: 5.0, dy: 0.0 })
        );
    }

    #[test]
    fn positions_are_logical_pixels() {
        let mut controller = WinitController::new();
        assert_eq!(
            controller.process_event(&moved(400.0, 300.0), 2.0),
            Some(InputEvent::PointerMoved { x: 200.0, y: 150.0 })
        );

        controller.process_event(&left(ElementState::Pressed), 2.0);
        assert_eq!(
            controller.process_event(&moved(440.0, 300.0), 2.0),
            Some(InputEvent::PointerDragged { dx: 20.0, dy: 0.0 })
        );
    }

    #[test]
    fn leaving_the_surface_forgets_the_pointer() {
        let mut controller = WinitController::new();
        controller.process_event(&left(ElementState::Pressed), 1.0);
        controller.process_event(&moved(10.0, 10.0), 1.0);

        let left_surface = WindowEvent::CursorLeft { device_id: device() };
        assert_eq!(controller.process_event(&left_surface, 1.0), None);

        // Re-entering far away must not produce a jump
        assert_eq!(
            controller.process_event(&moved(700.0, 10.0), 1.0),
            Some(InputEvent::PointerMoved { x: 700.0, y: 10.0 })
        );
    }

    #[test]
    fn wheel_reports_notches() {
        let mut controller = WinitController::new();
        assert_eq!(
            controller.process_event(&wheel(MouseScrollDelta::LineDelta(0.0, 1.0)), 1.0),
            Some(InputEvent::Wheel { notches: 1.0 })
        );
        assert_eq!(
            controller.process_event(&wheel(MouseScrollDelta::LineDelta(0.5, -2.0)), 1.0),
            Some(InputEvent::Wheel { notches: -2.0 })
        );
        assert_eq!(
            controller.process_event(
                &wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 3.0))),
                1.0
            ),
            Some(InputEvent::Wheel { notches: 3.0 })
        );
    }

    #[test]
    fn empty_wheel_is_dropped() {
        let mut controller = WinitController::new();
        assert_eq!(
            controller.process_event(&wheel(MouseScrollDelta::LineDelta(1.0, 0.0)), 1.0),
            None
        );
        assert_eq!(
            controller.process_event(
                &wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, 0.0))),
                1.0
            ),
            None
        );
    }

    #[test]
    fn other_mouse_buttons_are_ignored() {
        let mut controller = WinitController::new();
        let right = WindowEvent::MouseInput {
            device_id: device(),
            state: ElementState::Pressed,
            button: MouseButton::Right,
        };
        controller.process_event(&right, 1.0);
        controller.process_event(&moved(10.0, 10.0), 1.0);
        assert_eq!(
            controller.process_event(&moved(20.0, 10.0), 1.0),
            Some(InputEvent::PointerMoved { x: 20.0, y: 10.0 })
        );
    }

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(WinitController::key_button(KeyCode::KeyR), Some(Button::Reset));
        assert_eq!(WinitController::key_button(KeyCode::KeyH), Some(Button::ToggleOverlay));
        assert_eq!(WinitController::key_button(KeyCode::Escape), Some(Button::Quit));
        assert_eq!(WinitController::key_button(KeyCode::KeyZ), None);
    }
}
