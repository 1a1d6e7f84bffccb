use std::f64::consts::TAU;

use super::FrameContext;
use crate::render::{Affine, Canvas, Point, TextRenderer, Vec2, GOLD, WHITE};

const STARBURST_SPOKES: usize = 12;
const STARBURST_LENGTH: f64 = 100.0;
const TIMER_FONT_SIZE: f32 = 24.0;

/// Gold spokes around `center` that turn with time and pulse in length.
pub fn draw_starburst(canvas: &mut Canvas, center: Point, ctx: &FrameContext) {
    let t = f64::from(ctx.elapsed);
    let length = (t * 5.0).sin().abs() * STARBURST_LENGTH;
    if length < 0.5 {
        return;
    }
    canvas.paint(|p| {
        for i in 0..STARBURST_SPOKES {
            let angle = i as f64 * (TAU / STARBURST_SPOKES as f64) + t;
            let end = center + Vec2::from_angle(angle) * length;
            p.line(center, end, 2.0, GOLD);
        }
    });
}

/// Values shown by the debug timer readout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerReadout {
    pub elapsed: f32,
    /// Activation of the upcoming lyric, or the end of the song when the
    /// last lyric is showing.
    pub next_lyric: Option<f32>,
    pub total: Option<f32>,
    pub tempo_bpm: Option<f32>,
}

impl TimerReadout {
    pub fn lines(&self) -> Vec<String> {
        let countdown = |target: Option<f32>| match target {
            Some(target) => format!("{:.2}s", (target - self.elapsed).max(0.0)),
            None => "--".to_string(),
        };
        let mut lines = vec![
            format!("Elapsed Time: {:.2}s", self.elapsed),
            format!("Time to Next Lyric: {}", countdown(self.next_lyric)),
            format!("Time Remaining: {}", countdown(self.total)),
        ];
        if let Some(bpm) = self.tempo_bpm {
            lines.push(format!("Tempo: {bpm:.0} BPM"));
        }
        lines
    }
}

pub fn draw_timers(canvas: &mut Canvas, text: &mut TextRenderer, readout: &TimerReadout) {
    let blocks: Vec<_> = readout
        .lines()
        .iter()
        .map(|line| text.layout(line, TIMER_FONT_SIZE, WHITE))
        .collect();
    canvas.paint(|p| {
        for (row, block) in blocks.iter().enumerate() {
            p.text(block, Affine::translate((10.0, 10.0 + row as f64 * 30.0)));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::BLACK;

    #[test]
    fn readout_counts_down() {
        let readout = TimerReadout {
            elapsed: 4.0,
            next_lyric: Some(5.0),
            total: Some(30.0),
            tempo_bpm: None,
        };
        assert_eq!(
            readout.lines(),
            vec![
                "Elapsed Time: 4.00s".to_string(),
                "Time to Next Lyric: 1.00s".to_string(),
                "Time Remaining: 26.00s".to_string(),
            ]
        );
    }

    #[test]
    fn readout_never_goes_negative() {
        let readout = TimerReadout {
            elapsed: 40.0,
            next_lyric: Some(30.0),
            total: None,
            tempo_bpm: Some(121.6),
        };
        let lines = readout.lines();
        assert_eq!(lines[1], "Time to Next Lyric: 0.00s");
        assert_eq!(lines[2], "Time Remaining: --");
        assert_eq!(lines[3], "Tempo: 122 BPM");
    }

    #[test]
    fn starburst_vanishes_at_zero_length() {
        let mut canvas = Canvas::new(50, 50);
        canvas.fill(BLACK);
        draw_starburst(&mut canvas, Point::new(25.0, 25.0), &FrameContext::new(0.0, 60, 0));
        assert!(canvas.data().chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn starburst_spokes_turn_with_time() {
        let mut canvas = Canvas::new(200, 200);
        canvas.fill(BLACK);
        // t = 0.1: spokes are |sin 0.5| * 100 ~ 48 px long, the first at 0.1 rad.
        draw_starburst(&mut canvas, Point::new(100.0, 100.0), &FrameContext::new(0.1, 60, 0));
        assert_ne!(canvas.pixel(129, 102), BLACK);
        assert_eq!(canvas.pixel(160, 106), BLACK);
        assert_eq!(canvas.pixel(129, 90), BLACK);
    }

    #[test]
    fn timers_draw_in_the_corner() {
        let mut canvas = Canvas::new(400, 120);
        canvas.fill(BLACK);
        let readout = TimerReadout {
            elapsed: 1.0,
            next_lyric: None,
            total: None,
            tempo_bpm: None,
        };
        let mut text = TextRenderer::embedded().unwrap();
        draw_timers(&mut canvas, &mut text, &readout);
        let lit = (10..40).any(|y| (10..100).any(|x| canvas.pixel(x, y)[0] > 200));
        assert!(lit);
        assert_eq!(canvas.pixel(399, 119), BLACK);
    }
}
