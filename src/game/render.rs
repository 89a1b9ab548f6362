//! Drawing seam: the simulation emits rectangles, a backend paints them

/// Axis-aligned rectangle in canvas pixels, top-left origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Anything that can fill rectangles (canvas, terminal, test recorder)
pub trait Surface {
    fn fill_rect(&mut self, rect: Rect, color: &str);
}

/// Surface that keeps every draw call, for headless runs
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<(Rect, String)>,
}

impl Surface for RecordingSurface {
    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.calls.push((rect, color.to_string()));
    }
}
