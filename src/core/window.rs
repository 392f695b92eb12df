/// Window size in logical pixels plus the device pixel density
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowDimensions {
    pub width: f32,
    pub height: f32,
    /// Physical pixels per logical pixel
    pub scale_factor: f32,
}

impl WindowDimensions {
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self {
            width,
            height,
            scale_factor,
        }
    }
}

/// Window abstraction - what the frame loop needs from its host surface
pub trait WindowContext {
    /// Get window dimensions in logical pixels
    fn dimensions(&self) -> WindowDimensions;

    /// Ask the host to schedule another display-synchronized frame
    fn request_redraw(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_window_dimensions_new() {
        let dims = WindowDimensions::new(1920.0, 1080.0, 1.0);
        assert_eq!(dims.width, 1920.0);
        assert_eq!(dims.height, 1080.0);
        assert_eq!(dims.scale_factor, 1.0);
    }

    #[test]
    fn test_window_dimensions_copy() {
        let dims1 = WindowDimensions::new(1024.0, 768.0, 2.0);
        let dims2 = dims1; // Copy

        assert_eq!(dims1, dims2);
    }

    #[test]
    fn test_window_dimensions_debug() {
        let dims = WindowDimensions::new(640.0, 480.0, 1.5);
        let debug_str = format!("{:?}", dims);
        assert!(debug_str.contains("WindowDimensions"));
        assert!(debug_str.contains("640"));
        assert!(debug_str.contains("1.5"));
    }

    // Mock window for testing trait implementation
    struct MockWindow {
        dims: WindowDimensions,
        redraw_called: RefCell<usize>,
    }

    impl WindowContext for MockWindow {
        fn dimensions(&self) -> WindowDimensions {
            self.dims
        }

        fn request_redraw(&self) {
            *self.redraw_called.borrow_mut() += 1;
        }
    }

    #[test]
    fn test_window_context_redraw() {
        let window = MockWindow {
            dims: WindowDimensions::new(800.0, 600.0, 1.0),
            redraw_called: RefCell::new(0),
        };

        assert_eq!(*window.redraw_called.borrow(), 0);

        window.request_redraw();
        window.request_redraw();
        assert_eq!(*window.redraw_called.borrow(), 2);
        assert_eq!(window.dimensions().width, 800.0);
    }
}
