use std::f32::consts::PI;

use super::FrameContext;
use crate::{
    render::{
        centred, hsv_to_rgb, multiply, with_alpha, Affine, Canvas, Color, TextBlock, TextRenderer,
        Vec2, RED,
    },
    timeline::{ActiveLyric, LyricEntry},
};

const LYRIC_FONT_SIZE: f32 = 74.0;
const SHAKE_PIXELS: i32 = 5;
const SPRITE_GAP: f32 = 10.0;

/// Where the lyric text landed, so sprite effects can sit underneath it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LyricLayout {
    /// Top edge of the unzoomed text block.
    pub text_top: f32,
    /// Height of the zoomed text block.
    pub text_height: f32,
    pub sprite_top: f32,
}

/// Draws the active lyric: zoomed by `1 + 0.2 sin(pi * progress)`, tinted by
/// a hue that cycles every ten seconds and shaken by a few pixels.
///
/// While a new line is coming in, its characters drop in one by one while
/// the previous line's characters fall away.
pub fn draw_lyric_text(
    canvas: &mut Canvas,
    text: &mut TextRenderer,
    ctx: &FrameContext,
    active: &ActiveLyric<'_>,
    previous: Option<&LyricEntry>,
) -> LyricLayout {
    let line = active.entry.text.as_str();
    let max_width = canvas.width() as f32 * 0.9;
    let size = text.fit_size(line, max_width, LYRIC_FONT_SIZE);

    let hue = (ctx.elapsed * 0.1).rem_euclid(1.0);
    let tint = with_alpha(multiply(RED, hsv_to_rgb(hue, 1.0, 1.0)), 128);

    let lettering = match previous {
        Some(previous) if active.progress < 1.0 => {
            Lettering::cascade(text, &previous.text, line, active.progress, size, tint)
        }
        _ => Lettering::line(text, line, size, tint),
    };

    let zoom = 1.0 + (active.progress * PI).sin() * 0.2;
    let mut rng = ctx.rng(5);
    let shake = Vec2::new(
        f64::from(rng.i32(-SHAKE_PIXELS..=SHAKE_PIXELS)),
        f64::from(rng.i32(-SHAKE_PIXELS..=SHAKE_PIXELS)),
    );

    let center = canvas.center();
    let transform = centred(center + shake, lettering.size(), f64::from(zoom), 0.0);
    lettering.draw(canvas, transform);

    let text_top = center.y as f32 - lettering.height as f32 / 2.0;
    let text_height = lettering.height as f32 * zoom;
    LyricLayout {
        text_top,
        text_height,
        sprite_top: text_top + text_height + SPRITE_GAP,
    }
}

/// Shaped pieces of a lyric, each placed relative to the block's top-left.
struct Lettering {
    pieces: Vec<(Vec2, TextBlock)>,
    width: f64,
    height: f64,
}

impl Lettering {
    fn line(text: &mut TextRenderer, line: &str, size: f32, color: Color) -> Self {
        let block = text.layout(line, size, color);
        Self {
            width: f64::from(block.width()),
            height: f64::from(block.height()),
            pieces: vec![(Vec2::ZERO, block)],
        }
    }

    /// Per-character hand-over from `old` to `new`. Character `i` of a line
    /// of `n` characters moves during `progress` in `[i/n, (i+1)/n]`.
    fn cascade(
        text: &mut TextRenderer,
        old: &str,
        new: &str,
        progress: f32,
        size: f32,
        color: Color,
    ) -> Self {
        let height = f64::from(text.layout(new, size, color).height());
        let mut pieces = Vec::new();

        let char_progress = |index: usize, len: usize| {
            let len = len as f32;
            f64::from(((progress - index as f32 / len) * len).clamp(0.0, 1.0))
        };

        let old_len = old.chars().count();
        let mut old_pen = 0.0;
        for (i, ch) in old.chars().enumerate() {
            let block = text.layout(ch.encode_utf8(&mut [0; 4]), size, color);
            let advance = f64::from(block.width());
            let p = char_progress(i, old_len);
            if p < 1.0 {
                pieces.push((Vec2::new(old_pen, p * height), block));
            }
            old_pen += advance;
        }

        let new_len = new.chars().count();
        let mut new_pen = 0.0;
        for (i, ch) in new.chars().enumerate() {
            let block = text.layout(ch.encode_utf8(&mut [0; 4]), size, color);
            let advance = f64::from(block.width());
            let p = char_progress(i, new_len);
            if p > 0.0 {
                pieces.push((Vec2::new(new_pen, (1.0 - p) * height), block));
            }
            new_pen += advance;
        }

        Self {
            pieces,
            width: f64::max(old_pen, new_pen),
            height,
        }
    }

    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn draw(&self, canvas: &mut Canvas, transform: Affine) {
        canvas.paint(|p| {
            for (offset, block) in &self.pieces {
                p.text(block, transform * Affine::translate(*offset));
            }
        });
    }
}
