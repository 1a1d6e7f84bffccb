use std::time::Instant;

use serde::Serialize;

use crate::{
    config::{LyricSource, TimedLyric},
    effects::EffectTag,
    LyricVideoError, Result,
};

mod marking;

pub use marking::{mark_lyrics, MarkingOutcome};

/// Wall-clock stopwatch started when playback begins.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    started_at: Instant,
}

impl PlaybackClock {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// Seconds since the clock was started.
    pub fn elapsed(&self) -> f32 {
        self.started_at.elapsed().as_secs_f32()
    }
}

/// One lyric line and the moment it becomes active.
///
/// Only serialised, never read back: `effect` is derived from `text`, and
/// session files go through [`TimedLyric`] and [`LyricTimeline::from_timed`]
/// so the tag is always reclassified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LyricEntry {
    pub activation_time: f32,
    pub text: String,
    /// Keyword effect derived once from `text`.
    pub effect: EffectTag,
}

impl LyricEntry {
    pub fn new(activation_time: f32, text: impl Into<String>) -> Self {
        let text = text.into();
        let effect = EffectTag::classify(&text);
        Self {
            activation_time,
            text,
            effect,
        }
    }
}

/// Ordered, read-only sequence of lyric entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LyricTimeline {
    entries: Vec<LyricEntry>,
}

impl LyricTimeline {
    /// Builds a timeline from authored `(time, text)` pairs. The caller is
    /// trusted to supply them in increasing time order.
    pub fn from_static<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = (f32, S)>,
        S: Into<String>,
    {
        Self {
            entries: lines
                .into_iter()
                .map(|(time, text)| LyricEntry::new(time, text))
                .collect(),
        }
    }

    /// Builds a timeline from session-file lyrics, rejecting times that are
    /// negative, not finite or not strictly increasing.
    pub fn from_timed(lines: &[TimedLyric]) -> Result<Self> {
        let mut previous: Option<f32> = None;
        for (index, line) in lines.iter().enumerate() {
            if !line.time.is_finite() || line.time < 0.0 {
                return Err(LyricVideoError::InvalidTimeline(format!(
                    "lyric {index} has invalid time {}",
                    line.time
                )));
            }
            if let Some(prev) = previous {
                if line.time <= prev {
                    return Err(LyricVideoError::InvalidTimeline(format!(
                        "lyric {index} at {}s does not come after {prev}s",
                        line.time
                    )));
                }
            }
            previous = Some(line.time);
        }

        Ok(Self::from_static(
            lines.iter().map(|line| (line.time, line.text.clone())),
        ))
    }

    /// Returns the authored timeline, or `None` when the lyrics still need
    /// to be marked interactively.
    pub fn from_source(source: &LyricSource) -> Result<Option<Self>> {
        match source {
            LyricSource::Timed(lines) => Self::from_timed(lines).map(Some),
            LyricSource::Untimed(_) => Ok(None),
        }
    }

    /// Session-file form of the timeline, e.g. to save a marking pass.
    pub fn to_timed(&self) -> Vec<TimedLyric> {
        self.entries
            .iter()
            .map(|entry| TimedLyric {
                time: entry.activation_time,
                text: entry.text.clone(),
            })
            .collect()
    }

    pub(crate) fn push(&mut self, entry: LyricEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[LyricEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&LyricEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last entry whose activation time is at or before `elapsed`.
    pub fn resolve(&self, elapsed: f32) -> Option<(usize, &LyricEntry)> {
        let count = self
            .entries
            .partition_point(|entry| entry.activation_time <= elapsed);
        count.checked_sub(1).map(|index| (index, &self.entries[index]))
    }

    /// Activation time of the entry after `index`, if there is one.
    pub fn next_activation(&self, index: usize) -> Option<f32> {
        self.entries
            .get(index + 1)
            .map(|entry| entry.activation_time)
    }
}

/// Derived per-frame view of the lyric being shown.
#[derive(Debug, Clone, Copy)]
pub struct ActiveLyric<'a> {
    pub index: usize,
    pub entry: &'a LyricEntry,
    /// Time into the segment divided by the nominal segment length. Not
    /// clamped; periodic effects read past 1.0.
    pub progress: f32,
}

/// Monotonic playback position within a [`LyricTimeline`].
///
/// The index moves forward by at most one entry per call to
/// [`LyricCursor::advance`], so a large clock jump is caught up over several
/// frames.
#[derive(Debug, Clone, Default)]
pub struct LyricCursor {
    index: usize,
}

impl LyricCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Moves to the next entry when its activation time has been reached and
    /// reports the entry that is active at `elapsed`.
    pub fn advance<'a>(
        &mut self,
        timeline: &'a LyricTimeline,
        elapsed: f32,
        segment_seconds: f32,
    ) -> Option<ActiveLyric<'a>> {
        if let Some(next) = timeline.next_activation(self.index) {
            if elapsed >= next {
                self.index += 1;
            }
        }

        let entry = timeline.get(self.index)?;
        if elapsed < entry.activation_time {
            return None;
        }

        Some(ActiveLyric {
            index: self.index,
            entry,
            progress: (elapsed - entry.activation_time) / segment_seconds,
        })
    }
}
