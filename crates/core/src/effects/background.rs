use super::FrameContext;
use crate::render::{rgb, Canvas, Color, Point, Rect, BLACK, WHITE};

pub const NEON_COLORS: [Color; 6] = [
    rgb(255, 0, 0),
    rgb(0, 255, 0),
    rgb(0, 0, 255),
    rgb(255, 255, 0),
    rgb(255, 0, 255),
    rgb(0, 255, 255),
];

const GRID_CELL: u32 = 40;
const CRACKS_PER_FRAME: usize = 10;

/// Black frame with a 40 px outline grid whose colour drifts with time and
/// position.
pub fn draw_grid(canvas: &mut Canvas, ctx: &FrameContext) {
    canvas.fill(BLACK);
    let t = ctx.elapsed;
    let wave = |v: f32| ((v + 1.0) / 2.0 * 255.0) as u8;
    let blue = wave((t * 0.5).sin());
    let (w, h) = (canvas.width(), canvas.height());
    canvas.paint(|p| {
        for x in (0..w).step_by(GRID_CELL as usize) {
            for y in (0..h).step_by(GRID_CELL as usize) {
                let color = rgb(
                    wave((t + x as f32 * 0.01).sin()),
                    wave((t + y as f32 * 0.01).cos()),
                    blue,
                );
                // Half-pixel inset keeps the 1 px outline on whole pixels.
                let (x, y) = (f64::from(x), f64::from(y));
                let cell = f64::from(GRID_CELL);
                let rect = Rect::new(x + 0.5, y + 0.5, x + cell - 0.5, y + cell - 0.5);
                p.stroke_rect(rect, 1.0, color);
            }
        }
    });
}

/// Short white "crack" strokes scattered over the frame.
pub fn draw_cracks(canvas: &mut Canvas, ctx: &FrameContext) {
    let mut rng = ctx.rng(11);
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    canvas.paint(|p| {
        for _ in 0..CRACKS_PER_FRAME {
            let x1 = rng.i32(0..=w);
            let y1 = rng.i32(0..=h);
            let x2 = x1 + rng.i32(-100..=100);
            let y2 = y1 + rng.i32(-100..=100);
            p.line(
                Point::new(f64::from(x1), f64::from(y1)),
                Point::new(f64::from(x2), f64::from(y2)),
                2.0,
                WHITE,
            );
        }
    });
}

/// Dark blue fill that breathes with a two-radian-per-second sine. Louder
/// passages lift the level and brighter-sounding ones warm it towards red.
pub fn draw_pulsating_sky(canvas: &mut Canvas, ctx: &FrameContext) {
    let base = 128.0 + 127.0 * (ctx.elapsed * 2.0).sin();
    let level = base * (0.75 + 0.25 * ctx.energy);
    let level = level.clamp(0.0, 255.0) as u8;
    let warm = (f32::from(level / 8) * ctx.brightness).round() as u8;
    canvas.fill(rgb(level / 8 + warm, level / 8, level / 4));
}

pub fn draw_sidewalk(canvas: &mut Canvas) {
    let (w, h) = (f64::from(canvas.width()), f64::from(canvas.height()));
    canvas.paint(|p| {
        p.fill_rect(Rect::new(0.0, h - 100.0, w, h), rgb(100, 100, 100));
        let mut x = 0.0;
        while x < w {
            p.line(
                Point::new(x, h - 100.0),
                Point::new(x + 25.0, h),
                2.0,
                rgb(150, 150, 150),
            );
            x += 50.0;
        }
    });
}

/// Twenty neon dots in the upper half of the frame.
pub fn draw_neon_lights(canvas: &mut Canvas, ctx: &FrameContext) {
    let mut rng = ctx.rng(23);
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    canvas.paint(|p| {
        for _ in 0..20 {
            let x = rng.i32(0..=w);
            let y = rng.i32(0..=h / 2);
            let color = NEON_COLORS[rng.usize(..NEON_COLORS.len())];
            let radius = rng.i32(2..=5);
            p.fill_circle(
                Point::new(f64::from(x), f64::from(y)),
                f64::from(radius),
                color,
            );
        }
    });
}

/// Five neon stick figures walking right at 100 px/s and wrapping around.
pub fn draw_bachelorettes(canvas: &mut Canvas, ctx: &FrameContext) {
    let width = i64::from(canvas.width());
    let y = f64::from(canvas.height()) - 150.0;
    let offset = (ctx.elapsed * 100.0) as i64;
    canvas.paint(|p| {
        for i in 0..5_i64 {
            let x = (i * 200 + offset).rem_euclid(width) as f64;
            let color = NEON_COLORS[i as usize % NEON_COLORS.len()];
            let hips = Point::new(x, y);
            let chest = Point::new(x, y - 30.0);
            p.line(hips, Point::new(x, y - 50.0), 3.0, color);
            p.fill_circle(Point::new(x, y - 60.0), 10.0, color);
            p.line(chest, Point::new(x - 20.0, y + 20.0), 3.0, color);
            p.line(chest, Point::new(x + 20.0, y + 20.0), 3.0, color);
        }
    });
}
