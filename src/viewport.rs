/// Pixel rectangle the scene is drawn into, in OpenGL window coordinates
/// (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// Converts an egui rect (points, origin top-left) to GL pixels.
    pub fn from_egui_rect(rect: egui::Rect, pixels_per_point: f32, window_height: u32) -> Self {
        let x = (rect.min.x * pixels_per_point) as i32;
        let y = (rect.min.y * pixels_per_point) as i32;
        let width = (rect.width() * pixels_per_point) as i32;
        let height = (rect.height() * pixels_per_point) as i32;

        // Reverse the y since OpenGL uses a different origin
        Self::new(x, window_height as i32 - y - height, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width.max(0) as u32, self.height.max(0) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn egui_rect_is_flipped_and_scaled() {
        let rect = egui::Rect::from_min_size(egui::pos2(150.0, 20.0), egui::vec2(400.0, 300.0));
        let viewport = Viewport::from_egui_rect(rect, 2.0, 1000);
        assert_eq!(viewport, Viewport::new(300, 1000 - 40 - 600, 800, 600));
        assert_eq!(viewport.size(), (800, 600));
    }

    #[test]
    fn zero_area_is_empty() {
        assert!(Viewport::new(0, 0, 0, 10).is_empty());
        assert!(!Viewport::full(10, 10).is_empty());
    }
}
