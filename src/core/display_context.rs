/// Display context - physical size of the render output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayContext {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl DisplayContext {
    /// Create new display context
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Physical output size for a logical size at a given pixel ratio.
    ///
    /// The device ratio is capped at `max_pixel_ratio` so very dense
    /// displays don't multiply fill-rate cost; each side is floored and kept
    /// at least one pixel.
    pub fn from_logical(width: f32, height: f32, device_pixel_ratio: f32, max_pixel_ratio: f32) -> Self {
        let ratio = Self::effective_pixel_ratio(device_pixel_ratio, max_pixel_ratio);
        Self {
            width: ((width * ratio).floor() as u32).max(1),
            height: ((height * ratio).floor() as u32).max(1),
        }
    }

    /// `min(device, max)`, the ratio actually used for the output surface
    pub fn effective_pixel_ratio(device_pixel_ratio: f32, max_pixel_ratio: f32) -> f32 {
        device_pixel_ratio.min(max_pixel_ratio)
    }

    /// Scale down so neither side exceeds `max`, keeping the aspect ratio
    pub fn clamped(self, max: u32) -> Self {
        let max = max.max(1);
        let largest = self.width.max(self.height);
        if largest <= max {
            return self;
        }
        let scale = max as f64 / largest as f64;
        Self {
            width: ((self.width as f64 * scale).floor() as u32).clamp(1, max),
            height: ((self.height as f64 * scale).floor() as u32).clamp(1, max),
        }
    }

    /// Total number of pixels
    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_context_with_dimensions() {
        let ctx = DisplayContext::new(1920, 1080);
        assert_eq!(ctx.width, 1920);
        assert_eq!(ctx.height, 1080);
    }

    #[test]
    fn test_pixel_count_calculation() {
        let ctx = DisplayContext::new(640, 480);
        assert_eq!(ctx.pixel_count(), 307200);
    }

    #[test]
    fn test_from_logical_standard_density() {
        let ctx = DisplayContext::from_logical(800.0, 600.0, 1.0, 2.0);
        assert_eq!(ctx, DisplayContext::new(800, 600));
    }

    #[test]
    fn test_from_logical_retina() {
        let ctx = DisplayContext::from_logical(800.0, 600.0, 2.0, 2.0);
        assert_eq!(ctx, DisplayContext::new(1600, 1200));
    }

    #[test]
    fn test_from_logical_caps_density() {
        // A 3x phone display is rendered at 2x
        let ctx = DisplayContext::from_logical(400.0, 800.0, 3.0, 2.0);
        assert_eq!(ctx, DisplayContext::new(800, 1600));
        assert_eq!(DisplayContext::effective_pixel_ratio(3.0, 2.0), 2.0);
    }

    #[test]
    fn test_from_logical_floors_fractional_pixels() {
        let ctx = DisplayContext::from_logical(333.0, 250.0, 1.5, 2.0);
        assert_eq!(ctx, DisplayContext::new(499, 375));
    }

    #[test]
    fn test_from_logical_never_zero() {
        let ctx = DisplayContext::from_logical(0.2, 0.2, 1.0, 2.0);
        assert_eq!(ctx, DisplayContext::new(1, 1));
    }

    #[test]
    fn test_clamped_keeps_sizes_within_limit() {
        let ctx = DisplayContext::new(1920, 1080);
        assert_eq!(ctx.clamped(8192), ctx);
        assert_eq!(ctx.clamped(1920), ctx);
    }

    #[test]
    fn test_clamped_scales_oversized_output() {
        // A wide window at high density past an 8K texture limit
        let ctx = DisplayContext::new(16384, 4096).clamped(8192);
        assert_eq!(ctx, DisplayContext::new(8192, 2048));

        let tall = DisplayContext::new(100, 20000).clamped(8192);
        assert_eq!(tall.height, 8192);
        assert_eq!(tall.width, 40);
    }

    #[test]
    fn test_clamped_never_zero() {
        let ctx = DisplayContext::new(100000, 1).clamped(4096);
        assert_eq!(ctx, DisplayContext::new(4096, 1));
    }

    #[test]
    fn test_various_common_resolutions() {
        let resolutions = [
            (640, 480),    // VGA
            (800, 600),    // SVGA
            (1280, 720),   // HD
            (1920, 1080),  // Full HD
            (3840, 2160),  // 4K UHD
        ];

        for (width, height) in resolutions {
            let ctx = DisplayContext::from_logical(width as f32, height as f32, 1.0, 2.0);
            assert_eq!(ctx.width, width);
            assert_eq!(ctx.height, height);
            assert_eq!(ctx.pixel_count(), (width * height) as usize);
        }
    }
}
