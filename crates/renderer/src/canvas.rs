use winit::dpi::PhysicalSize;

/// Uniform written whenever the canvas changes shape.
pub const SCREEN_RATIO_UNIFORM: &str = "screen_ratio";

/// Pixel dimensions of the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Width over height.
    pub fn screen_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Canvas of `fixed_width` pixels keeping the aspect ratio of `source`.
    ///
    /// Height is `round(fixed_width / (source_width / source_height))`.
    pub fn fit_to_width(fixed_width: u32, source_width: u32, source_height: u32) -> Self {
        let ratio = f64::from(source_width.max(1)) / f64::from(source_height.max(1));
        let height = (f64::from(fixed_width) / ratio).round() as u32;
        Self::new(fixed_width, height)
    }
}

impl From<PhysicalSize<u32>> for CanvasSize {
    fn from(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

impl From<CanvasSize> for PhysicalSize<u32> {
    fn from(size: CanvasSize) -> Self {
        PhysicalSize::new(size.width, size.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_image_fills_fixed_width_square() {
        let canvas = CanvasSize::fit_to_width(1000, 512, 512);
        assert_eq!(canvas, CanvasSize::new(1000, 1000));
        assert_eq!(canvas.screen_ratio(), 1.0);
    }

    #[test]
    fn wide_image_halves_height() {
        let canvas = CanvasSize::fit_to_width(800, 1200, 600);
        assert_eq!(canvas, CanvasSize::new(800, 400));
        assert_eq!(canvas.screen_ratio(), 2.0);
    }

    #[test]
    fn height_is_rounded_to_nearest_pixel() {
        // 800 / (4000 / 3000) = 600, 800 / (1920 / 1081) = 450.4...
        assert_eq!(CanvasSize::fit_to_width(800, 4000, 3000).height, 600);
        assert_eq!(CanvasSize::fit_to_width(800, 1920, 1081).height, 450);
        assert_eq!(CanvasSize::fit_to_width(1000, 3, 2).height, 667);
    }

    #[test]
    fn extreme_aspect_keeps_at_least_one_pixel() {
        let canvas = CanvasSize::fit_to_width(100, 100_000, 1);
        assert_eq!(canvas.height, 1);
        assert!(canvas.screen_ratio() > 0.0);
    }

    #[test]
    fn converts_to_and_from_physical_size() {
        let canvas = CanvasSize::from(PhysicalSize::new(0, 240));
        assert_eq!(canvas, CanvasSize::new(1, 240));
        let physical: PhysicalSize<u32> = canvas.into();
        assert_eq!(physical, PhysicalSize::new(1, 240));
    }
}
