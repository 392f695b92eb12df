/// Host input the application reacts to, independent of the physical key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Tear the scene down and rebuild it from configuration
    Reset,
    ToggleOverlay,
    Quit,
    /// Primary pointer button; held while orbiting
    Primary,
}

impl Button {
    /// Keyboard actions fire once per press; pointer buttons are held
    pub fn is_action(self) -> bool {
        matches!(self, Button::Reset | Button::ToggleOverlay | Button::Quit)
    }
}

/// Button state as seen by the application
pub trait Controller {
    fn is_down(&self, button: Button) -> bool;
}
