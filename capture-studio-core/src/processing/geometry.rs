//! Layout math for the composite: fitting and bubble placement.

use kurbo::{Point, Rect, Size};

/// Corner radius of the framed screen rectangle.
pub const SCREEN_CORNER_RADIUS: f64 = 20.0;
/// Corner radius of the rounded-rect bubble.
pub const BUBBLE_CORNER_RADIUS: f64 = 32.0;
/// Blur extent of the framed screen's drop shadow.
pub const SHADOW_BLUR: f64 = 40.0;
/// Bubble outline width.
pub const OUTLINE_WIDTH: f64 = 3.0;

/// Largest rectangle with `content`'s aspect ratio that fits in `bounds`, centered.
pub fn fit_contain(content: Size, bounds: Rect) -> Rect {
    if content.width <= 0.0 || content.height <= 0.0 {
        return Rect::ZERO;
    }
    let scale = (bounds.width() / content.width).min(bounds.height() / content.height);
    let size = Size::new(content.width * scale, content.height * scale);
    Rect::from_center_size(bounds.center(), size)
}

/// `rect` scaled by `factor` around its own center.
pub fn scale_about_center(rect: Rect, factor: f64) -> Rect {
    Rect::from_center_size(rect.center(), rect.size() * factor)
}

/// Source sub-rectangle of an image of `source` size that covers a `dest`
/// of the given size without distortion (center crop).
pub fn cover_rect(source: Size, dest: Size) -> Rect {
    if source.width <= 0.0 || source.height <= 0.0 || dest.width <= 0.0 || dest.height <= 0.0 {
        return Rect::ZERO;
    }
    let scale = (dest.width / source.width).max(dest.height / source.height);
    let crop = Size::new(dest.width / scale, dest.height / scale);
    Rect::from_center_size(Rect::from_origin_size(Point::ORIGIN, source).center(), crop)
}

/// Edge length of the square bubble for a surface and scale.
pub fn bubble_size(surface: Size, scale: f64) -> f64 {
    (surface.height * scale).min(surface.width).max(0.0)
}

/// Clamp the bubble's top-left corner so the bubble stays fully on the surface.
pub fn clamp_bubble(position: Point, size: f64, surface: Size) -> Point {
    let max_x = (surface.width - size).max(0.0);
    let max_y = (surface.height - size).max(0.0);
    Point::new(position.x.clamp(0.0, max_x), position.y.clamp(0.0, max_y))
}

/// The bubble's on-surface square for a stored position and scale.
pub fn bubble_rect(position: Point, scale: f64, surface: Size) -> Rect {
    let size = bubble_size(surface, scale);
    Rect::from_origin_size(clamp_bubble(position, size, surface), Size::new(size, size))
}
