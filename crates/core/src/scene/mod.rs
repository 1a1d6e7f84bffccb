use serde::{Deserialize, Serialize};

use crate::{
    effects::{
        draw_bachelorettes, draw_cracks, draw_grid, draw_neon_lights, draw_pulsating_sky,
        draw_sidewalk, FrameContext,
    },
    render::{rgb, Affine, Canvas, Color, Picture, Rect},
};

const BUILDING_COUNT: usize = 50;
const BUILDING_COLOR: Color = rgb(50, 50, 50);
/// Horizontal scroll speed of the skyline, in pixels per second.
const SKYLINE_SPEED: f32 = 50.0;

/// Background painted behind the lyrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    /// Colour-drifting grid with flickering cracks.
    #[default]
    Grid,
    /// Night street: pulsing sky, scrolling skyline, sidewalk and neon.
    NeonCity,
}

/// Building silhouettes on a strip twice the frame width. Generated once
/// per session and scrolled left, wrapping every frame width.
#[derive(Debug, Clone)]
pub struct Skyline {
    strip: Picture,
    width: u32,
}

impl Skyline {
    pub fn generate(width: u32, height: u32, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let width = width.max(1);
        let half = (height / 2).max(1) as i32;
        let quarter = (height / 4) as i32;
        let mut strip = Canvas::new(width * 2, half as u32);

        strip.paint(|p| {
            for _ in 0..BUILDING_COUNT {
                let x = f64::from(rng.i32(0..=(width * 2) as i32));
                let y = rng.i32(quarter..=half);
                let w = f64::from(rng.u32(20..=100));
                let h = f64::from(rng.u32(50..=(half - y).max(51) as u32));
                let y = f64::from(y);
                p.fill_rect(Rect::new(x, y, x + w, y + h), BUILDING_COLOR);
            }
        });

        Self {
            strip: Picture::from_canvas(&strip),
            width,
        }
    }

    pub fn draw(&self, canvas: &mut Canvas, elapsed: f32) {
        let offset = (elapsed.max(0.0) * SKYLINE_SPEED) as u64 % u64::from(self.width);
        let offset = offset as f64;
        let width = f64::from(self.width);
        canvas.paint(|p| {
            p.picture(&self.strip, Affine::translate((-offset, 0.0)));
            p.picture(&self.strip, Affine::translate((width - offset, 0.0)));
        });
    }
}

/// Selected background plus whatever it precomputes.
#[derive(Debug, Clone)]
pub struct Scene {
    kind: SceneKind,
    skyline: Option<Skyline>,
}

impl Scene {
    pub fn new(kind: SceneKind, width: u32, height: u32, seed: u64) -> Self {
        let skyline = match kind {
            SceneKind::Grid => None,
            SceneKind::NeonCity => Some(Skyline::generate(width, height, seed)),
        };
        Self { kind, skyline }
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    /// Paints the full background. Overwrites every pixel of `canvas`.
    pub fn paint_background(&self, canvas: &mut Canvas, ctx: &FrameContext) {
        match self.kind {
            SceneKind::Grid => {
                draw_grid(canvas, ctx);
                draw_cracks(canvas, ctx);
            }
            SceneKind::NeonCity => {
                draw_pulsating_sky(canvas, ctx);
                if let Some(skyline) = &self.skyline {
                    skyline.draw(canvas, ctx.elapsed);
                }
                draw_sidewalk(canvas);
                draw_neon_lights(canvas, ctx);
                draw_bachelorettes(canvas, ctx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_a_function_of_time() {
        for kind in [SceneKind::Grid, SceneKind::NeonCity] {
            let scene = Scene::new(kind, 320, 180, 9);
            let ctx = FrameContext::new(3.25, 60, 9);
            let mut a = Canvas::new(320, 180);
            let mut b = Canvas::new(320, 180);
            scene.paint_background(&mut a, &ctx);
            scene.paint_background(&mut b, &ctx);
            assert_eq!(a.data(), b.data());
        }
    }

    #[test]
    fn background_is_opaque() {
        let scene = Scene::new(SceneKind::NeonCity, 320, 180, 1);
        let mut canvas = Canvas::new(320, 180);
        scene.paint_background(&mut canvas, &FrameContext::new(0.0, 60, 1));
        assert!(canvas.data().chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn skyline_wraps_every_frame_width() {
        let skyline = Skyline::generate(200, 100, 3);
        let mut a = Canvas::new(200, 100);
        let mut b = Canvas::new(200, 100);
        skyline.draw(&mut a, 1.0);
        // 50 px/s wraps after 200 px, so 4 s later it lines up again.
        skyline.draw(&mut b, 5.0);
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn skyline_scrolls_left() {
        let skyline = Skyline::generate(200, 100, 3);
        let mut a = Canvas::new(200, 100);
        let mut b = Canvas::new(200, 100);
        skyline.draw(&mut a, 0.0);
        // One second later the strip has moved 50 px to the left.
        skyline.draw(&mut b, 1.0);
        for x in 0..150 {
            for y in 0..50 {
                assert_eq!(b.pixel(x, y), a.pixel(x + 50, y), "({x}, {y})");
            }
        }
    }

    #[test]
    fn scene_kind_reads_snake_case() {
        let kind: SceneKind = serde_json::from_str("\"neon_city\"").unwrap();
        assert_eq!(kind, SceneKind::NeonCity);
        assert_eq!(SceneKind::default(), SceneKind::Grid);
    }
}
