use crate::{
    config::TransitionStyle,
    render::{Canvas, BLACK},
};

/// Normalised progress through the transition window of the lyric active
/// since `activation`, or `None` outside the window.
///
/// The window is the tail of the gap to `next_activation` that starts at
/// `start_fraction`; its progress is rescaled to `[0, 1]`.
pub fn transition_progress(
    elapsed: f32,
    activation: f32,
    next_activation: f32,
    start_fraction: f32,
) -> Option<f32> {
    let span = next_activation - activation;
    if span <= 0.0 {
        return None;
    }
    let ratio = (elapsed - activation) / span;
    if ratio <= start_fraction {
        return None;
    }
    Some(((ratio - start_fraction) / (1.0 - start_fraction)).clamp(0.0, 1.0))
}

/// Composites the transition overlay on top of the finished frame.
pub fn apply_transition(canvas: &mut Canvas, style: TransitionStyle, progress: f32) {
    let progress = progress.clamp(0.0, 1.0);
    match style {
        TransitionStyle::ZoomFade => {
            if progress < 0.5 {
                canvas.zoom(1.0 + progress * 2.0);
            } else {
                canvas.darken((255.0 * (progress - 0.5) * 2.0) as u8);
            }
        }
        TransitionStyle::ShrinkToBlack => {
            // Covers the whole frame at 0 and vanishes at 1.
            let (w, h) = (f64::from(canvas.width()), f64::from(canvas.height()));
            let radius = f64::from(1.0 - progress) * w.hypot(h);
            let center = canvas.center();
            canvas.paint(|p| p.fill_circle(center, radius, BLACK));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{near, rgb, Rect, WHITE};

    #[test]
    fn window_opens_after_eighty_percent() {
        assert_eq!(transition_progress(4.1, 1.0, 5.0, 0.8), None);
        assert_eq!(transition_progress(4.2, 1.0, 5.0, 0.8), None);
        let p = transition_progress(4.6, 1.0, 5.0, 0.8).unwrap();
        assert!((p - 0.5).abs() < 1e-4);
        let p = transition_progress(5.0, 1.0, 5.0, 0.8).unwrap();
        assert!((p - 1.0).abs() < 1e-6);
    }

    #[test]
    fn late_frames_clamp_to_one() {
        assert_eq!(transition_progress(9.0, 1.0, 5.0, 0.8), Some(1.0));
        assert_eq!(transition_progress(3.0, 5.0, 5.0, 0.8), None);
    }

    #[test]
    fn zoom_fade_ends_black() {
        let mut canvas = Canvas::new(8, 8);
        canvas.fill(WHITE);
        apply_transition(&mut canvas, TransitionStyle::ZoomFade, 1.0);
        assert!(near(canvas.pixel(4, 4), BLACK));
    }

    #[test]
    fn zoom_fade_first_half_enlarges() {
        let mut canvas = Canvas::new(20, 20);
        canvas.fill(BLACK);
        canvas.fill_rect(Rect::new(8.0, 8.0, 12.0, 12.0), WHITE);
        assert_eq!(canvas.pixel(12, 10), BLACK);
        apply_transition(&mut canvas, TransitionStyle::ZoomFade, 0.49);
        // The centred square has nearly doubled in size.
        assert!(near(canvas.pixel(10, 10), WHITE));
        assert!(near(canvas.pixel(12, 10), WHITE));
        assert!(near(canvas.pixel(17, 10), BLACK));
    }

    #[test]
    fn shrink_to_black_opens_from_the_centre() {
        let green = rgb(10, 200, 10);
        let shrink = |progress: f32| {
            let mut canvas = Canvas::new(20, 20);
            canvas.fill(green);
            apply_transition(&mut canvas, TransitionStyle::ShrinkToBlack, progress);
            canvas
        };

        let start = shrink(0.0);
        assert!(near(start.pixel(10, 10), BLACK));
        assert!(near(start.pixel(0, 0), BLACK));
        assert!(near(start.pixel(19, 19), BLACK));

        // Radius 0.3 * sqrt(800) ~ 8.5: the corners show through.
        let late = shrink(0.7);
        assert!(near(late.pixel(10, 10), BLACK));
        assert_eq!(late.pixel(0, 0), green);

        let end = shrink(1.0);
        assert_eq!(end.pixel(10, 10), green);
        assert_eq!(end.pixel(0, 0), green);
    }
}
