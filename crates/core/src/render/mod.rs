//! CPU drawing surface the scheduler composites every frame into.
//!
//! Shapes, pictures and glyph runs are rasterised by `vello_cpu` into a
//! scratch pixmap and then composited over the frame. The frame is kept
//! premultiplied; [`Canvas::pixel`] and [`Canvas::to_image`] hand back straight
//! alpha. The origin is the top-left corner and anything outside is clipped.

use std::{fmt, sync::Arc};

use image::{Rgba, RgbaImage};
use vello_cpu::{
    kurbo::{BezPath, Cap, Circle, Shape, Stroke},
    peniko::{self, color::PremulRgba8},
    Pixmap, RenderContext,
};

use crate::{LyricVideoError, Result};

mod text;

pub use text::{TextBlock, TextRenderer};
pub use vello_cpu::kurbo::{Affine, Point, Rect, Vec2};

pub type Color = Rgba<u8>;

pub const BLACK: Color = Rgba([0, 0, 0, 255]);
pub const WHITE: Color = Rgba([255, 255, 255, 255]);
pub const RED: Color = Rgba([255, 0, 0, 255]);
pub const GOLD: Color = Rgba([255, 215, 0, 255]);
pub const GRAY: Color = Rgba([128, 128, 128, 255]);
pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);

const PATH_TOLERANCE: f64 = 0.1;

pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Rgba([r, g, b, 255])
}

pub fn with_alpha(color: Color, alpha: u8) -> Color {
    Rgba([color[0], color[1], color[2], alpha])
}

/// Channel-wise product of two colours, alpha included.
pub fn multiply(a: Color, b: Color) -> Color {
    Rgba([
        mul_div255(a[0], b[0]),
        mul_div255(a[1], b[1]),
        mul_div255(a[2], b[2]),
        mul_div255(a[3], b[3]),
    ])
}

/// Converts hue/saturation/value in `[0, 1]` to an opaque colour.
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Color {
    let h = hue.rem_euclid(1.0) * 6.0;
    let sector = h.floor();
    let f = h - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));
    let (r, g, b) = match sector as u8 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0) as u8;
    rgb(to_u8(r), to_u8(g), to_u8(b))
}

/// Transform that draws a `size` item centred on `center`, scaled by `scale`
/// and rotated counter-clockwise (as seen on screen) by `degrees`.
pub fn centred(center: Point, size: (f64, f64), scale: f64, degrees: f64) -> Affine {
    Affine::translate(center.to_vec2())
        * Affine::rotate(-degrees.to_radians())
        * Affine::scale(scale)
        * Affine::translate((-size.0 / 2.0, -size.1 / 2.0))
}

pub struct Canvas {
    width: u16,
    height: u16,
    pixmap: Pixmap,
    scratch: Pixmap,
    ctx: Option<RenderContext>,
}

impl Canvas {
    /// Creates a fully transparent canvas. Each side is clamped to
    /// `1..=65535` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        let width = clamp_side(width);
        let height = clamp_side(height);
        Self {
            width,
            height,
            pixmap: Pixmap::new(width, height),
            scratch: Pixmap::new(width, height),
            ctx: None,
        }
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }

    /// Premultiplied RGBA8 bytes, row-major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let offset = (y as usize * usize::from(self.width) + x as usize) * 4;
        let px = &self.data()[offset..offset + 4];
        unpremultiply([px[0], px[1], px[2], px[3]])
    }

    pub fn to_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width(), self.height());
        for (dst, src) in image.pixels_mut().zip(self.data().chunks_exact(4)) {
            *dst = unpremultiply([src[0], src[1], src[2], src[3]]);
        }
        image
    }

    /// Overwrites every pixel, alpha included.
    pub fn fill(&mut self, color: Color) {
        let premul = premultiply(color);
        for px in self.pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&premul);
        }
    }

    /// Records one batch of drawing commands and composites the result over
    /// the frame.
    pub fn paint(&mut self, draw: impl FnOnce(&mut Painter<'_>)) {
        let mut ctx = match self.ctx.take() {
            Some(ctx) => ctx,
            None => RenderContext::new(self.width, self.height),
        };
        ctx.reset();
        draw(&mut Painter { ctx: &mut ctx });
        ctx.flush();

        self.scratch.data_as_u8_slice_mut().fill(0);
        ctx.render_to_pixmap(&mut self.scratch);
        over_in_place(
            self.pixmap.data_as_u8_slice_mut(),
            self.scratch.data_as_u8_slice(),
        );
        self.ctx = Some(ctx);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.paint(|p| p.fill_rect(rect, color));
    }

    /// Composites black with the given opacity over the whole frame.
    pub fn darken(&mut self, alpha: u8) {
        let frame = self.bounds();
        self.fill_rect(frame, with_alpha(BLACK, alpha));
    }

    /// Enlarges the current frame about its centre. Scales at or below 1.0
    /// leave the frame untouched.
    pub fn zoom(&mut self, scale: f32) {
        if scale <= 1.0 {
            return;
        }
        let snapshot = Picture::from_canvas(self);
        let center = self.center().to_vec2();
        let transform =
            Affine::translate(center) * Affine::scale(f64::from(scale)) * Affine::translate(-center);
        self.fill(TRANSPARENT);
        self.paint(|p| p.picture(&snapshot, transform));
    }
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Drawing commands for one [`Canvas::paint`] batch. Every command sets its
/// own transform and paint, so calls can come in any order.
pub struct Painter<'a> {
    ctx: &'a mut RenderContext,
}

impl Painter<'_> {
    fn solid(&mut self, transform: Affine, color: Color) {
        self.ctx.set_transform(transform);
        self.ctx.set_paint_transform(Affine::IDENTITY);
        self.ctx.set_paint(paint_color(color));
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.solid(Affine::IDENTITY, color);
        self.ctx.fill_rect(&rect);
    }

    /// Outline centred on the rectangle's edges.
    pub fn stroke_rect(&mut self, rect: Rect, width: f64, color: Color) {
        self.solid(Affine::IDENTITY, color);
        self.ctx.set_stroke(Stroke::new(width));
        self.ctx.stroke_path(&rect.to_path(PATH_TOLERANCE));
    }

    /// Straight segment with round caps.
    pub fn line(&mut self, from: Point, to: Point, width: f64, color: Color) {
        let mut path = BezPath::new();
        path.move_to(from);
        path.line_to(to);
        self.solid(Affine::IDENTITY, color);
        self.ctx.set_stroke(Stroke::new(width).with_caps(Cap::Round));
        self.ctx.stroke_path(&path);
    }

    pub fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        if radius <= 0.0 {
            return;
        }
        self.solid(Affine::IDENTITY, color);
        self.ctx
            .fill_path(&Circle::new(center, radius).to_path(PATH_TOLERANCE));
    }

    /// Draws `picture` with its top-left corner at the origin of `transform`.
    pub fn picture(&mut self, picture: &Picture, transform: Affine) {
        self.ctx.set_transform(transform);
        self.ctx.set_paint_transform(Affine::IDENTITY);
        self.ctx.set_paint(picture.paint.clone());
        self.ctx.fill_rect(&Rect::new(
            0.0,
            0.0,
            f64::from(picture.width),
            f64::from(picture.height),
        ));
    }

    /// Fills the glyphs of `block` with the top-left corner of its layout box
    /// at the origin of `transform`.
    pub fn text(&mut self, block: &TextBlock, transform: Affine) {
        block.fill(self.ctx, transform);
    }
}

/// An image ready to be drawn by a [`Painter`] under any transform.
#[derive(Clone)]
pub struct Picture {
    paint: vello_cpu::Image,
    width: u16,
    height: u16,
}

impl Picture {
    pub fn from_rgba(image: &RgbaImage) -> Result<Self> {
        let width = checked_side(image.width())?;
        let height = checked_side(image.height())?;
        let pixels = image
            .pixels()
            .map(|px| {
                let [r, g, b, a] = premultiply(*px);
                PremulRgba8 { r, g, b, a }
            })
            .collect();
        Ok(Self::from_parts(pixels, width, height))
    }

    /// Snapshot of everything drawn on `canvas` so far.
    pub fn from_canvas(canvas: &Canvas) -> Self {
        let pixels = canvas
            .data()
            .chunks_exact(4)
            .map(|px| PremulRgba8 {
                r: px[0],
                g: px[1],
                b: px[2],
                a: px[3],
            })
            .collect();
        Self::from_parts(pixels, canvas.width, canvas.height)
    }

    fn from_parts(pixels: Vec<PremulRgba8>, width: u16, height: u16) -> Self {
        let may_have_opacities = pixels.iter().any(|px| px.a != 255);
        let pixmap = Pixmap::from_parts_with_opacity(pixels, width, height, may_have_opacities);
        Self {
            paint: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: peniko::ImageSampler::default(),
            },
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    pub fn height(&self) -> u32 {
        u32::from(self.height)
    }

    pub fn size(&self) -> (f64, f64) {
        (f64::from(self.width), f64::from(self.height))
    }
}

impl fmt::Debug for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Picture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

fn clamp_side(side: u32) -> u16 {
    u16::try_from(side.max(1)).unwrap_or(u16::MAX)
}

fn checked_side(side: u32) -> Result<u16> {
    match u16::try_from(side) {
        Ok(side) if side > 0 => Ok(side),
        _ => Err(LyricVideoError::render(format!(
            "image side {side} is outside 1..=65535"
        ))),
    }
}

fn paint_color(color: Color) -> peniko::Color {
    peniko::Color::from_rgba8(color[0], color[1], color[2], color[3])
}

fn mul_div255(a: u8, b: u8) -> u8 {
    ((u16::from(a) * u16::from(b) + 127) / 255) as u8
}

fn premultiply(color: Color) -> [u8; 4] {
    let [r, g, b, a] = color.0;
    [mul_div255(r, a), mul_div255(g, a), mul_div255(b, a), a]
}

fn unpremultiply(px: [u8; 4]) -> Color {
    let [r, g, b, a] = px;
    if a == 0 {
        return TRANSPARENT;
    }
    let channel = |c: u8| ((u16::from(c) * 255 + u16::from(a) / 2) / u16::from(a)).min(255) as u8;
    Rgba([channel(r), channel(g), channel(b), a])
}

/// Premultiplied "source over destination" of `src` onto `dst`.
fn over_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        match s[3] {
            0 => {}
            255 => d.copy_from_slice(s),
            alpha => {
                let keep = 255 - alpha;
                for (dc, sc) in d.iter_mut().zip(s) {
                    *dc = sc.saturating_add(mul_div255(*dc, keep));
                }
            }
        }
    }
}

/// Channel-wise comparison allowing for anti-aliasing and resampling.
#[cfg(test)]
pub(crate) fn near(actual: Color, expected: Color) -> bool {
    actual
        .0
        .iter()
        .zip(expected.0.iter())
        .all(|(a, b)| a.abs_diff(*b) <= 3)
}
