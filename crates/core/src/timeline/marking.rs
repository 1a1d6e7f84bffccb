use std::collections::VecDeque;

use super::{LyricEntry, LyricTimeline};
use crate::{
    audio::AudioClock,
    input::{InputSource, Signal},
    record::FrameSink,
    render::{Affine, Canvas, TextRenderer, BLACK, WHITE},
    scheduler::Pacer,
    Result,
};

const MARK_FONT_SIZE: f32 = 36.0;
/// Gap forced between two marks landing on the same clock reading.
const MIN_MARK_GAP: f32 = 0.001;

/// What an interactive marking pass produced.
#[derive(Debug, Clone, Default)]
pub struct MarkingOutcome {
    pub timeline: LyricTimeline,
    /// The user quit before every lyric was marked.
    pub interrupted: bool,
    /// Lyrics that never got a timestamp.
    pub remaining: usize,
}

impl MarkingOutcome {
    pub fn is_exhausted_early(&self) -> bool {
        self.remaining > 0
    }
}

/// Plays the audio and timestamps each lyric when a [`Signal::Mark`]
/// arrives. Ends when every lyric is marked, on [`Signal::Quit`] or when the
/// audio stops; the clock is stopped in every case.
#[allow(clippy::too_many_arguments)]
pub fn mark_lyrics<C, I, S, P>(
    lyrics: &[String],
    clock: &mut C,
    input: &mut I,
    sink: &mut S,
    pacer: &mut P,
    canvas: &mut Canvas,
    text: &mut TextRenderer,
) -> Result<MarkingOutcome>
where
    C: AudioClock + ?Sized,
    I: InputSource + ?Sized,
    S: FrameSink + ?Sized,
    P: Pacer + ?Sized,
{
    let mut queue: VecDeque<&str> = lyrics.iter().map(String::as_str).collect();
    let mut outcome = MarkingOutcome::default();

    clock.play()?;
    let result = run_marking(&mut queue, &mut outcome, clock, input, sink, pacer, canvas, text);
    clock.stop();
    result?;

    outcome.remaining = queue.len();
    if outcome.is_exhausted_early() {
        tracing::warn!(
            marked = outcome.timeline.len(),
            remaining = outcome.remaining,
            interrupted = outcome.interrupted,
            "marking ended before every lyric had a time"
        );
    } else {
        tracing::info!(marked = outcome.timeline.len(), "all lyrics marked");
    }
    Ok(outcome)
}

#[allow(clippy::too_many_arguments)]
fn run_marking<C, I, S, P>(
    queue: &mut VecDeque<&str>,
    outcome: &mut MarkingOutcome,
    clock: &mut C,
    input: &mut I,
    sink: &mut S,
    pacer: &mut P,
    canvas: &mut Canvas,
    text: &mut TextRenderer,
) -> Result<()>
where
    C: AudioClock + ?Sized,
    I: InputSource + ?Sized,
    S: FrameSink + ?Sized,
    P: Pacer + ?Sized,
{
    'frames: while !queue.is_empty() {
        for signal in input.drain() {
            match signal {
                Signal::Quit => {
                    outcome.interrupted = true;
                    break 'frames;
                }
                Signal::Mark => {
                    let Some(text) = queue.pop_front() else { break };
                    let mut time = clock.elapsed_seconds();
                    if let Some(last) = outcome.timeline.entries().last() {
                        if time <= last.activation_time {
                            time = last.activation_time + MIN_MARK_GAP;
                        }
                    }
                    tracing::debug!(time, text, "marked lyric");
                    outcome.timeline.push(LyricEntry::new(time, text));
                }
            }
        }
        if queue.is_empty() || !clock.is_playing() {
            break;
        }

        draw_marking_screen(canvas, text, clock.elapsed_seconds(), queue);
        sink.present(canvas)?;
        pacer.wait();
    }
    Ok(())
}

/// Black screen with the running time and the lyrics still to mark.
fn draw_marking_screen(
    canvas: &mut Canvas,
    text: &mut TextRenderer,
    elapsed: f32,
    queue: &VecDeque<&str>,
) {
    let visible = (canvas.height() as usize).saturating_sub(100) / 40 + 1;
    let clock_line = text.layout(&format!("Current Time: {elapsed:.2}s"), MARK_FONT_SIZE, WHITE);
    let lyrics: Vec<_> = queue
        .iter()
        .take(visible)
        .map(|lyric| text.layout(lyric, MARK_FONT_SIZE, WHITE))
        .collect();

    canvas.fill(BLACK);
    canvas.paint(|p| {
        p.text(&clock_line, Affine::translate((50.0, 50.0)));
        for (row, block) in lyrics.iter().enumerate() {
            p.text(block, Affine::translate((50.0, 100.0 + row as f64 * 40.0)));
        }
    });
}
