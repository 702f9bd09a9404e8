use kurbo::{Point, Rect, Size, Vec2};

use super::geometry::{bubble_rect, bubble_size, clamp_bubble};

/// Pointer drag of the webcam bubble.
///
/// Lives outside the composition settings so per-move updates do not touch
/// shared state; the caller writes the resulting position back.
#[derive(Debug, Clone, Default)]
pub struct BubbleDrag {
    grab_offset: Option<Vec2>,
}

impl BubbleDrag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.grab_offset.is_some()
    }

    /// Map a pointer position on the displayed element into surface pixels.
    pub fn to_surface(client: Point, display: Rect, surface: Size) -> Point {
        if display.width() <= 0.0 || display.height() <= 0.0 {
            return Point::ORIGIN;
        }
        let sx = surface.width / display.width();
        let sy = surface.height / display.height();
        Point::new((client.x - display.x0) * sx, (client.y - display.y0) * sy)
    }

    /// Begin a drag if `pointer` (surface space) hits the bubble.
    pub fn pointer_down(&mut self, pointer: Point, position: Point, scale: f64, surface: Size) -> bool {
        let rect = bubble_rect(position, scale, surface);
        if rect.contains(pointer) {
            self.grab_offset = Some(pointer - rect.origin());
            true
        } else {
            false
        }
    }

    /// New clamped bubble position while dragging, `None` otherwise.
    pub fn pointer_move(&self, pointer: Point, scale: f64, surface: Size) -> Option<Point> {
        let offset = self.grab_offset?;
        Some(clamp_bubble(pointer - offset, bubble_size(surface, scale), surface))
    }

    pub fn pointer_up(&mut self) {
        self.grab_offset = None;
    }
}
