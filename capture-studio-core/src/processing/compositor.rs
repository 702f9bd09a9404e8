use std::sync::Arc;

use image::{Rgba, RgbaImage};
use kurbo::{Point, Rect, Size};
use log::{debug, warn};
use parking_lot::RwLock;
use vello_cpu::kurbo::{self as vk, Shape};
use vello_cpu::peniko::color::PremulRgba8;
use vello_cpu::peniko::Gradient;

use super::canvas_track::CanvasCaptureTrack;
use super::color::{gradient_stops, to_paint, BUBBLE_OUTLINE, FALLBACK_BACKGROUND};
use super::geometry::{
    bubble_rect, cover_rect, fit_contain, scale_about_center, BUBBLE_CORNER_RADIUS, OUTLINE_WIDTH,
    SCREEN_CORNER_RADIUS, SHADOW_BLUR,
};
use crate::models::composition::{CompositionSettings, WebcamShape};
use crate::traits::media_track::{MediaStream, MediaTrack, VideoFrame};

/// Last published frame, shared with capture tracks.
pub type SharedSurface = Arc<RwLock<Arc<RgbaImage>>>;

const SHADOW_ALPHA: u8 = 128;
const PATH_TOLERANCE: f64 = 0.1;

/// Inputs for one composite frame.
#[derive(Debug, Clone, Copy)]
pub struct CompositeFrame<'a> {
    pub screen: Option<&'a VideoFrame>,
    pub camera: Option<&'a VideoFrame>,
    pub settings: &'a CompositionSettings,
}

/// Real-time drawing engine for the composite surface.
///
/// Frames are rasterized into a private pixmap and published whole, so
/// readers of the surface never observe a partially drawn frame.
pub struct Compositor {
    front: SharedSurface,
    pixmap: vello_cpu::Pixmap,
    staging: RgbaImage,
    stops: Option<(String, Vec<vello_cpu::peniko::Color>)>,
    frames_rendered: u64,
    resize_count: u64,
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            front: Arc::new(RwLock::new(Arc::new(RgbaImage::new(0, 0)))),
            pixmap: vello_cpu::Pixmap::new(0, 0),
            staging: RgbaImage::new(0, 0),
            stops: None,
            frames_rendered: 0,
            resize_count: 0,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (u32::from(self.pixmap.width()), u32::from(self.pixmap.height()))
    }

    /// Resize the backing surface. Returns `false` and keeps the existing
    /// buffer when the size is unchanged. Dimensions saturate at `u16::MAX`.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let w = u16::try_from(width).unwrap_or(u16::MAX);
        let h = u16::try_from(height).unwrap_or(u16::MAX);
        if (u32::from(w), u32::from(h)) != (width, height) {
            warn!("Compositor: {}x{} exceeds the raster limit, using {}x{}", width, height, w, h);
        }
        if (self.pixmap.width(), self.pixmap.height()) == (w, h) {
            return false;
        }
        debug!("Compositor: resizing surface {:?} -> {}x{}", self.size(), w, h);
        self.pixmap = vello_cpu::Pixmap::new(w, h);
        self.staging = RgbaImage::new(u32::from(w), u32::from(h));
        self.resize_count += 1;
        true
    }

    /// Number of times the surface was actually reallocated.
    pub fn resize_count(&self) -> u64 {
        self.resize_count
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// The most recently published frame.
    pub fn snapshot(&self) -> Arc<RgbaImage> {
        self.front.read().clone()
    }

    /// A live stream whose single video track reads this surface.
    pub fn capture_stream(&self, frame_rate: u32) -> MediaStream {
        let track: Arc<dyn MediaTrack> = Arc::new(CanvasCaptureTrack::new(self.front.clone(), frame_rate));
        MediaStream::new(vec![track])
    }

    /// Paint and publish one frame.
    pub fn render(&mut self, frame: &CompositeFrame<'_>) {
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        if width == 0 || height == 0 {
            return;
        }
        let mut ctx = vello_cpu::RenderContext::new(width, height);
        self.paint_background(&mut ctx, frame.settings);
        if let Some(screen) = frame.screen {
            self.paint_screen(&mut ctx, screen, frame.settings);
        }
        if let Some(camera) = frame.camera {
            self.paint_bubble(&mut ctx, camera, frame.settings);
        }
        ctx.flush();
        ctx.render_to_pixmap(&mut self.pixmap);
        self.publish();
    }

    fn surface_size(&self) -> Size {
        let (w, h) = self.size();
        Size::new(w as f64, h as f64)
    }

    fn paint_background(&mut self, ctx: &mut vello_cpu::RenderContext, settings: &CompositionSettings) {
        let surface = self.surface_size();
        let full = vk::Rect::new(0.0, 0.0, surface.width, surface.height);
        reset(ctx);

        let colors = settings.background_preset().and_then(|p| p.colors);
        let cached = matches!(&self.stops, Some((id, _)) if *id == settings.background);
        if !cached {
            self.stops = colors
                .and_then(gradient_stops)
                .map(|stops| (settings.background.clone(), stops));
        }
        match &self.stops {
            Some((_, stops)) if stops.len() == 1 => ctx.set_paint(stops[0]),
            Some((_, stops)) => {
                // Runs along the (0,0) -> (w,h) diagonal.
                let gradient = Gradient::new_linear(vk::Point::ZERO, vk::Point::new(surface.width, surface.height))
                    .with_stops(stops.as_slice());
                ctx.set_paint(gradient);
            }
            None => ctx.set_paint(to_paint(FALLBACK_BACKGROUND)),
        }
        ctx.fill_rect(&full);
    }

    fn paint_screen(&self, ctx: &mut vello_cpu::RenderContext, screen: &VideoFrame, settings: &CompositionSettings) {
        let Some(image) = frame_image(screen) else {
            return;
        };
        let (sw, sh) = screen.dimensions();
        let source = Size::new(sw as f64, sh as f64);
        let fitted = fit_contain(source, Rect::from_origin_size(Point::ORIGIN, self.surface_size()));
        let dest = scale_about_center(fitted, settings.screen_scale);
        if dest.width() <= 0.0 || dest.height() <= 0.0 {
            return;
        }
        let framed = settings.is_framed();

        reset(ctx);
        if framed {
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, SHADOW_ALPHA));
            // Canvas shadow blur is twice the gaussian deviation.
            ctx.fill_blurred_rounded_rect(
                &to_cpu_rect(dest),
                SCREEN_CORNER_RADIUS as f32,
                (SHADOW_BLUR / 2.0) as f32,
            );
            let clip = vk::RoundedRect::from_rect(to_cpu_rect(dest), SCREEN_CORNER_RADIUS).to_path(PATH_TOLERANCE);
            ctx.push_clip_layer(&clip);
        }

        ctx.set_transform(
            vk::Affine::translate((dest.x0, dest.y0))
                * vk::Affine::scale_non_uniform(dest.width() / source.width, dest.height() / source.height),
        );
        ctx.set_paint(image);
        ctx.fill_rect(&vk::Rect::new(0.0, 0.0, source.width, source.height));

        if framed {
            ctx.pop_layer();
        }
    }

    fn paint_bubble(&self, ctx: &mut vello_cpu::RenderContext, camera: &VideoFrame, settings: &CompositionSettings) {
        let Some(image) = frame_image(camera) else {
            return;
        };
        let rect = bubble_rect(settings.webcam_position, settings.webcam_scale, self.surface_size());
        if rect.width() <= 0.0 {
            return;
        }
        let (cw, ch) = camera.dimensions();
        let crop = cover_rect(Size::new(cw as f64, ch as f64), rect.size());
        if crop.width() <= 0.0 {
            return;
        }
        let shape = bubble_path(settings.webcam_shape, rect);

        reset(ctx);
        ctx.push_clip_layer(&shape);
        // Cover: map the centered crop onto the bubble square.
        let scale = rect.width() / crop.width();
        ctx.set_transform(
            vk::Affine::translate((rect.x0 - crop.x0 * scale, rect.y0 - crop.y0 * scale)) * vk::Affine::scale(scale),
        );
        ctx.set_paint(image);
        ctx.fill_rect(&vk::Rect::new(0.0, 0.0, cw as f64, ch as f64));
        ctx.pop_layer();

        reset(ctx);
        ctx.set_stroke(vk::Stroke::new(OUTLINE_WIDTH));
        ctx.set_paint(to_paint(BUBBLE_OUTLINE));
        ctx.stroke_path(&shape);
    }

    fn publish(&mut self) {
        let (w, h) = self.size();
        if self.staging.dimensions() != (w, h) {
            self.staging = RgbaImage::new(w, h);
        }
        for (dst, src) in self.staging.chunks_exact_mut(4).zip(self.pixmap.data_as_u8_slice().chunks_exact(4)) {
            dst.copy_from_slice(&unpremultiply([src[0], src[1], src[2], src[3]]));
        }
        let finished = std::mem::replace(&mut self.staging, RgbaImage::new(0, 0));
        let previous = std::mem::replace(&mut *self.front.write(), Arc::new(finished));
        // Reuse the old front buffer when no reader still holds it.
        self.staging = match Arc::try_unwrap(previous) {
            Ok(image) if image.dimensions() == (w, h) => image,
            _ => RgbaImage::new(w, h),
        };
        self.frames_rendered += 1;
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

fn reset(ctx: &mut vello_cpu::RenderContext) {
    ctx.set_transform(vk::Affine::IDENTITY);
    ctx.set_paint_transform(vk::Affine::IDENTITY);
    ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
}

fn to_cpu_rect(r: Rect) -> vk::Rect {
    vk::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bubble_path(shape: WebcamShape, rect: Rect) -> vk::BezPath {
    let rect = to_cpu_rect(rect);
    match shape {
        WebcamShape::Circle => {
            vk::Circle::new(rect.center(), rect.width().min(rect.height()) / 2.0).to_path(PATH_TOLERANCE)
        }
        WebcamShape::RoundedRect => vk::RoundedRect::from_rect(rect, BUBBLE_CORNER_RADIUS).to_path(PATH_TOLERANCE),
        WebcamShape::Square => rect.to_path(PATH_TOLERANCE),
    }
}

/// Image paint for a straight-alpha frame. `None` when empty or beyond the
/// raster limit.
fn frame_image(frame: &VideoFrame) -> Option<vello_cpu::Image> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let w = u16::try_from(width).ok()?;
    let h = u16::try_from(height).ok()?;
    let mut may_have_opacities = false;
    let pixels: Vec<PremulRgba8> = frame
        .pixels()
        .map(|&Rgba([r, g, b, a])| {
            may_have_opacities |= a != 255;
            let premul = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
            PremulRgba8 {
                r: premul(r),
                g: premul(g),
                b: premul(b),
                a,
            }
        })
        .collect();
    let pixmap = vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, may_have_opacities);
    Some(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

fn unpremultiply([r, g, b, a]: [u8; 4]) -> [u8; 4] {
    match a {
        0 => [0, 0, 0, 0],
        255 => [r, g, b, a],
        _ => {
            let un = |c: u8| ((c as u16 * 255 + a as u16 / 2) / a as u16).min(255) as u8;
            [un(r), un(g), un(b), a]
        }
    }
}
