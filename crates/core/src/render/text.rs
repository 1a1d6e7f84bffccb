use std::{borrow::Cow, fmt};

use parley::{
    layout::PositionedLayoutItem,
    style::{FontStack, StyleProperty},
    FontContext, Layout, LayoutContext,
};
use vello_cpu::{kurbo::Affine, peniko, RenderContext};

use super::Color;
use crate::{LyricVideoError, Result};

/// DejaVu Sans Bold, compiled in so no font files are read at runtime.
static EMBEDDED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct TextBrush {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl From<Color> for TextBrush {
    fn from(color: Color) -> Self {
        let [r, g, b, a] = color.0;
        Self { r, g, b, a }
    }
}

/// Shapes single-line text with parley against one registered font family.
pub struct TextRenderer {
    font_ctx: FontContext,
    layout_ctx: LayoutContext<TextBrush>,
    family: String,
    font: peniko::FontData,
}

impl TextRenderer {
    /// Renderer backed by the bundled DejaVu Sans Bold.
    pub fn embedded() -> Result<Self> {
        Self::from_font_bytes(EMBEDDED_FONT.to_vec())
    }

    pub fn from_font_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut font_ctx = FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes.clone()), None);
        let (family_id, _) = families
            .first()
            .ok_or_else(|| LyricVideoError::render("font data holds no font family"))?;
        let family = font_ctx
            .collection
            .family_name(*family_id)
            .ok_or_else(|| LyricVideoError::render("registered font family has no name"))?
            .to_string();
        tracing::debug!(%family, "registered font");

        Ok(Self {
            font_ctx,
            layout_ctx: LayoutContext::new(),
            family,
            font: peniko::FontData::new(peniko::Blob::from(bytes), 0),
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Lays `text` out on one line at `size_px`, filled with `color`.
    pub fn layout(&mut self, text: &str, size_px: f32, color: Color) -> TextBlock {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(StyleProperty::FontStack(FontStack::Source(Cow::Borrowed(
            self.family.as_str(),
        ))));
        builder.push_default(StyleProperty::FontSize(size_px.max(1.0)));
        builder.push_default(StyleProperty::Brush(TextBrush::from(color)));

        let mut layout: Layout<TextBrush> = builder.build(text);
        layout.break_all_lines(None);
        TextBlock::from_layout(&layout, self.font.clone())
    }

    /// Largest size up to `max_px` at which `text` fits in `max_width`.
    pub fn fit_size(&mut self, text: &str, max_width: f32, max_px: f32) -> f32 {
        let width = self.layout(text, max_px, super::WHITE).width();
        if width <= max_width || width <= 0.0 {
            max_px
        } else {
            (max_px * max_width / width).max(1.0)
        }
    }
}

impl fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextRenderer")
            .field("family", &self.family)
            .finish()
    }
}

struct ShapedRun {
    brush: TextBrush,
    font_size: f32,
    glyphs: Vec<vello_cpu::Glyph>,
}

/// Shaped glyphs with positions relative to the top-left of the line box.
pub struct TextBlock {
    runs: Vec<ShapedRun>,
    width: f32,
    height: f32,
    font: peniko::FontData,
}

impl TextBlock {
    fn from_layout(layout: &Layout<TextBrush>, font: peniko::FontData) -> Self {
        let mut runs = Vec::new();
        let mut width = 0.0_f32;
        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let mut glyphs = Vec::new();
                for glyph in run.positioned_glyphs() {
                    width = width.max(glyph.x + glyph.advance);
                    glyphs.push(vello_cpu::Glyph {
                        id: glyph.id,
                        x: glyph.x,
                        y: glyph.y,
                    });
                }
                runs.push(ShapedRun {
                    brush: run.style().brush,
                    font_size: run.run().font_size(),
                    glyphs,
                });
            }
        }

        Self {
            runs,
            width,
            height: layout.height(),
            font,
        }
    }

    /// Horizontal advance of the whole line.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Height of the line box.
    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn glyph_count(&self) -> usize {
        self.runs.iter().map(|run| run.glyphs.len()).sum()
    }

    pub(super) fn fill(&self, ctx: &mut RenderContext, transform: Affine) {
        ctx.set_transform(transform);
        ctx.set_paint_transform(Affine::IDENTITY);
        for run in &self.runs {
            let TextBrush { r, g, b, a } = run.brush;
            ctx.set_paint(peniko::Color::from_rgba8(r, g, b, a));
            let glyphs = run.glyphs.iter().map(|glyph| vello_cpu::Glyph {
                id: glyph.id,
                x: glyph.x,
                y: glyph.y,
            });
            ctx.glyph_run(&self.font)
                .font_size(run.font_size)
                .fill_glyphs(glyphs);
        }
    }
}

impl fmt::Debug for TextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBlock")
            .field("glyphs", &self.glyph_count())
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
