//! The per-frame loop: read the clock, resolve the active lyric, paint,
//! present, pace.

use std::{
    fmt, thread,
    time::{Duration, Instant},
};

use crate::{
    analysis::EnergyEnvelope,
    assets::AssetStore,
    audio::AudioClock,
    config::AppConfig,
    effects::{
        apply_transition, draw_keyword_effect, draw_lyric_text, draw_starburst, draw_timers,
        transition_progress, FrameContext, TimerReadout,
    },
    input::{InputSource, Signal},
    particles::ParticleSystem,
    record::FrameSink,
    render::{Canvas, TextRenderer},
    scene::Scene,
    timeline::{LyricCursor, LyricTimeline},
    Result,
};

/// Blocks until the next frame boundary.
pub trait Pacer {
    fn wait(&mut self);
}

impl<P: Pacer + ?Sized> Pacer for &mut P {
    fn wait(&mut self) {
        (**self).wait()
    }
}

/// Real-time fixed-rate pacer. A late frame resets the schedule instead of
/// trying to catch up.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    next: Option<Instant>,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            next: None,
        }
    }
}

impl Pacer for FramePacer {
    fn wait(&mut self) {
        let now = Instant::now();
        let target = self.next.unwrap_or(now) + self.interval;
        if target > now {
            thread::sleep(target - now);
            self.next = Some(target);
        } else {
            self.next = Some(now);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchedulerState {
    IdleBeforeFirstLyric,
    LyricActive { index: usize },
    /// The lyric at `index` is handing over to the next one.
    Transitioning { index: usize, progress: f32 },
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    DurationReached,
    AudioStopped,
    Interrupted,
}

/// Summary of one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub elapsed: f32,
    pub state: SchedulerState,
    pub active_index: Option<usize>,
    pub particles: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOutcome {
    pub frames: u64,
    pub reason: FinishReason,
    /// Clock reading when the loop stopped.
    pub elapsed: f32,
}

/// Owns everything a playback session mutates.
pub struct FrameScheduler {
    config: AppConfig,
    timeline: LyricTimeline,
    assets: AssetStore,
    scene: Scene,
    text: TextRenderer,
    envelope: Option<EnergyEnvelope>,
    particles: ParticleSystem,
    cursor: LyricCursor,
    canvas: Canvas,
    state: SchedulerState,
    total: Option<f32>,
}

impl FrameScheduler {
    pub fn new(
        config: &AppConfig,
        timeline: LyricTimeline,
        assets: AssetStore,
        text: TextRenderer,
    ) -> Self {
        let display = &config.display;
        Self {
            scene: Scene::new(config.scene, display.width, display.height, config.seed),
            particles: ParticleSystem::new(config.seed),
            canvas: Canvas::new(display.width, display.height),
            text,
            envelope: None,
            cursor: LyricCursor::new(),
            state: SchedulerState::IdleBeforeFirstLyric,
            total: config.audio.total_duration,
            config: config.clone(),
            timeline,
            assets,
        }
    }

    /// Uses the track's loudness and brightness for the background pulse and
    /// its tempo for the readout.
    pub fn with_envelope(mut self, envelope: EnergyEnvelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Most recently rendered frame.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Renders the frame for `elapsed` into the internal canvas.
    ///
    /// Calls are expected in playback order: the lyric cursor moves at most
    /// one entry per call and particles advance by one frame interval.
    pub fn render_frame(&mut self, elapsed: f32) -> FrameReport {
        let fps = self.config.display.fps;
        let timing = &self.config.timing;
        let (energy, brightness) = self.envelope.as_ref().map_or((0.0, 0.0), |envelope| {
            (envelope.level(elapsed), envelope.brightness(elapsed))
        });
        let ctx = FrameContext::new(elapsed, fps, self.config.seed)
            .with_energy(energy)
            .with_brightness(brightness);

        self.scene.paint_background(&mut self.canvas, &ctx);

        let active = self
            .cursor
            .advance(&self.timeline, elapsed, timing.segment_seconds);
        if let Some(active) = &active {
            let previous = active
                .index
                .checked_sub(1)
                .and_then(|index| self.timeline.get(index));
            let layout = draw_lyric_text(&mut self.canvas, &mut self.text, &ctx, active, previous);
            draw_keyword_effect(
                &mut self.canvas,
                &self.assets,
                &ctx,
                active.entry.effect,
                active.progress,
                &layout,
            );
            let center = self.canvas.center();
            draw_starburst(&mut self.canvas, center, &ctx);
        }

        self.particles.emit_burst(
            self.config.particles.burst,
            self.canvas.width(),
            self.canvas.height(),
        );
        self.particles.advance(self.config.frame_interval());
        self.particles.render(&mut self.canvas);

        let active_index = active.map(|active| active.index);
        let next = active_index.and_then(|index| self.timeline.next_activation(index));
        let transition = active.zip(next).and_then(|(active, next)| {
            transition_progress(
                elapsed,
                active.entry.activation_time,
                next,
                timing.transition_start,
            )
        });
        if let Some(progress) = transition {
            apply_transition(&mut self.canvas, timing.transition, progress);
        }

        if self.config.show_timers {
            let upcoming = match active_index {
                Some(_) => next,
                None => self.timeline.get(0).map(|entry| entry.activation_time),
            };
            let readout = TimerReadout {
                elapsed,
                next_lyric: upcoming.or(self.total),
                total: self.total,
                tempo_bpm: self.envelope.as_ref().and_then(EnergyEnvelope::tempo_bpm),
            };
            draw_timers(&mut self.canvas, &mut self.text, &readout);
        }

        self.state = match (active_index, transition) {
            (None, _) => SchedulerState::IdleBeforeFirstLyric,
            (Some(index), Some(progress)) => SchedulerState::Transitioning { index, progress },
            (Some(index), None) => SchedulerState::LyricActive { index },
        };

        FrameReport {
            elapsed,
            state: self.state,
            active_index,
            particles: self.particles.len(),
        }
    }

    /// Drives the session until the song ends, the audio stops or a
    /// [`Signal::Quit`] arrives. The clock is stopped on every exit path.
    pub fn run<C, I, S, P>(
        &mut self,
        clock: &mut C,
        input: &mut I,
        sink: &mut S,
        pacer: &mut P,
    ) -> Result<SessionOutcome>
    where
        C: AudioClock + ?Sized,
        I: InputSource + ?Sized,
        S: FrameSink + ?Sized,
        P: Pacer + ?Sized,
    {
        clock.play()?;
        self.total = self.config.audio.total_duration.or_else(|| clock.duration());
        tracing::info!(
            lyrics = self.timeline.len(),
            total = self.total,
            fps = self.config.display.fps,
            "playback started"
        );

        let result = self.drive(clock, input, sink, pacer);
        clock.stop();
        self.state = SchedulerState::Finished;

        let outcome = result?;
        tracing::info!(
            frames = outcome.frames,
            reason = ?outcome.reason,
            elapsed = outcome.elapsed,
            "playback finished"
        );
        Ok(outcome)
    }

    fn drive<C, I, S, P>(
        &mut self,
        clock: &mut C,
        input: &mut I,
        sink: &mut S,
        pacer: &mut P,
    ) -> Result<SessionOutcome>
    where
        C: AudioClock + ?Sized,
        I: InputSource + ?Sized,
        S: FrameSink + ?Sized,
        P: Pacer + ?Sized,
    {
        let mut frames = 0;
        let mut shown = None;
        loop {
            let elapsed = clock.elapsed_seconds();
            let finished = if input.drain().contains(&Signal::Quit) {
                Some(FinishReason::Interrupted)
            } else if self.total.is_some_and(|total| elapsed >= total) {
                Some(FinishReason::DurationReached)
            } else if !clock.is_playing() {
                Some(FinishReason::AudioStopped)
            } else {
                None
            };
            if let Some(reason) = finished {
                return Ok(SessionOutcome {
                    frames,
                    reason,
                    elapsed,
                });
            }

            let report = self.render_frame(elapsed);
            if report.active_index != shown {
                shown = report.active_index;
                if let Some(entry) = shown.and_then(|index| self.timeline.get(index)) {
                    tracing::info!(
                        index = shown,
                        time = entry.activation_time,
                        effect = ?entry.effect,
                        text = %entry.text,
                        "lyric changed"
                    );
                }
            }

            sink.present(&self.canvas)?;
            frames += 1;
            pacer.wait();
        }
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("lyrics", &self.timeline.len())
            .field("scene", &self.scene.kind())
            .field("cursor", &self.cursor.index())
            .field("particles", &self.particles.len())
            .field("state", &self.state)
            .field("total", &self.total)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::{AudioTrack, FixedStepClock},
        input::{NoInput, ScriptedInput},
        record::NullSink,
        render::rgb,
        scene::SceneKind,
        LyricVideoError,
    };

    fn config(fps: u32, total: Option<f32>) -> AppConfig {
        let mut config = AppConfig::default();
        config.display.width = 160;
        config.display.height = 90;
        config.display.fps = fps;
        config.audio.total_duration = total;
        config
    }

    fn four_lines() -> LyricTimeline {
        LyricTimeline::from_static([(1.0, "A"), (5.0, "B"), (9.0, "C"), (13.0, "D")])
    }

    fn build(fps: u32, total: Option<f32>, timeline: LyricTimeline) -> FrameScheduler {
        let mut text = TextRenderer::embedded().unwrap();
        let assets = AssetStore::placeholders(&mut text);
        FrameScheduler::new(&config(fps, total), timeline, assets, text)
    }

    #[test]
    fn follows_the_lyric_schedule() {
        let mut scheduler = build(10, Some(30.0), four_lines());
        let mut reports = Vec::new();
        for frame in 0..300 {
            reports.push(scheduler.render_frame(frame as f32 / 10.0));
        }

        assert_eq!(reports[0].state, SchedulerState::IdleBeforeFirstLyric);
        assert_eq!(reports[0].active_index, None);
        assert_eq!(reports[49].active_index, Some(0));
        assert!(matches!(
            reports[49].state,
            SchedulerState::Transitioning { index: 0, .. }
        ));
        assert_eq!(reports[50].active_index, Some(1));
        assert_eq!(reports[290].active_index, Some(3));
        assert_eq!(reports[290].state, SchedulerState::LyricActive { index: 3 });
    }

    #[test]
    fn active_index_never_goes_back() {
        let mut scheduler = build(10, None, four_lines());
        let mut last = None;
        for frame in 0..200 {
            let report = scheduler.render_frame(frame as f32 / 10.0);
            assert!(report.active_index >= last);
            if let (Some(now), Some(before)) = (report.active_index, last) {
                assert!(now - before <= 1);
            }
            last = report.active_index;
        }
    }

    #[test]
    fn clock_jump_is_caught_up_one_entry_per_frame() {
        let mut scheduler = build(60, None, four_lines());
        assert_eq!(scheduler.render_frame(2.0).active_index, Some(0));
        assert_eq!(scheduler.render_frame(20.0).active_index, Some(1));
        assert_eq!(scheduler.render_frame(20.0).active_index, Some(2));
        assert_eq!(scheduler.render_frame(20.0).active_index, Some(3));
        assert_eq!(scheduler.render_frame(20.0).active_index, Some(3));
    }

    #[test]
    fn transition_window_starts_late_in_the_gap() {
        let mut scheduler = build(60, None, four_lines());
        assert_eq!(
            scheduler.render_frame(4.0).state,
            SchedulerState::LyricActive { index: 0 }
        );
        match scheduler.render_frame(4.6).state {
            SchedulerState::Transitioning { index, progress } => {
                assert_eq!(index, 0);
                assert!((progress - 0.5).abs() < 1e-3);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn runs_until_the_configured_duration() {
        let mut scheduler = build(10, Some(30.0), four_lines());
        let mut clock = FixedStepClock::new(10, None);
        let mut pacer = clock.pacer();
        let outcome = scheduler
            .run(&mut clock, &mut NoInput, &mut NullSink, &mut pacer)
            .unwrap();

        assert_eq!(outcome.reason, FinishReason::DurationReached);
        assert_eq!(outcome.frames, 300);
        assert_eq!(outcome.elapsed, 30.0);
        assert_eq!(scheduler.state(), SchedulerState::Finished);
        assert!(!clock.is_playing());
    }

    #[test]
    fn audio_stopping_finishes_playback() {
        let mut scheduler = build(10, Some(30.0), four_lines());
        let mut clock = FixedStepClock::new(10, Some(2.0));
        let mut pacer = clock.pacer();
        let outcome = scheduler
            .run(&mut clock, &mut NoInput, &mut NullSink, &mut pacer)
            .unwrap();

        assert_eq!(outcome.reason, FinishReason::AudioStopped);
        assert_eq!(outcome.frames, 20);
        assert_eq!(scheduler.state(), SchedulerState::Finished);
    }

    #[test]
    fn track_length_is_the_fallback_duration() {
        let mut scheduler = build(10, None, four_lines());
        let mut clock = FixedStepClock::new(10, Some(1.5));
        let mut pacer = clock.pacer();
        let outcome = scheduler
            .run(&mut clock, &mut NoInput, &mut NullSink, &mut pacer)
            .unwrap();
        assert_eq!(outcome.reason, FinishReason::DurationReached);
        assert_eq!(outcome.frames, 15);
    }

    #[test]
    fn quit_interrupts_playback() {
        let mut scheduler = build(10, Some(30.0), four_lines());
        let mut clock = FixedStepClock::new(10, None);
        let mut pacer = clock.pacer();
        let mut input = ScriptedInput::new().at(5, Signal::Quit);
        let outcome = scheduler
            .run(&mut clock, &mut input, &mut NullSink, &mut pacer)
            .unwrap();

        assert_eq!(outcome.reason, FinishReason::Interrupted);
        assert_eq!(outcome.frames, 5);
        assert!(!clock.is_playing());
    }

    #[test]
    fn two_marked_lyrics_play_through() {
        let timeline = LyricTimeline::from_static([
            (0.5, "Shut your mouth"),
            (1.2, "Where is your uncle at?"),
        ]);
        let mut scheduler = build(10, Some(3.0), timeline);
        let mut clock = FixedStepClock::new(10, None);
        let mut pacer = clock.pacer();
        let outcome = scheduler
            .run(&mut clock, &mut NoInput, &mut NullSink, &mut pacer)
            .unwrap();
        assert_eq!(outcome.reason, FinishReason::DurationReached);
        assert_eq!(outcome.frames, 30);
    }

    #[test]
    fn same_moment_same_pixels() {
        let mut a = build(60, Some(30.0), four_lines());
        let mut b = build(60, Some(30.0), four_lines());
        for frame in 0..10 {
            let t = 1.0 + frame as f32 / 60.0;
            a.render_frame(t);
            b.render_frame(t);
        }
        assert_eq!(a.canvas().data(), b.canvas().data());
    }

    #[test]
    fn particles_stay_bounded() {
        let mut scheduler = build(60, None, LyricTimeline::default());
        let mut report = scheduler.render_frame(0.0);
        for frame in 1..200 {
            report = scheduler.render_frame(frame as f32 / 60.0);
        }
        // Five per frame, none outliving 4/3 s.
        assert!(report.particles <= 5 * 80);
        assert!(report.particles > 0);
    }

    #[test]
    fn bright_tracks_warm_the_neon_sky() {
        let rate = 8_192;
        let tone = (0..rate)
            .map(|i| (2.0 * std::f32::consts::PI * 3_000.0 * i as f32 / rate as f32).sin() * 0.5)
            .collect();
        let envelope = EnergyEnvelope::from_track(&AudioTrack::from_samples(rate, 1, tone)).unwrap();

        let mut config = config(60, None);
        config.display.width = 320;
        config.display.height = 240;
        config.scene = SceneKind::NeonCity;
        config.show_timers = false;
        let mut text = TextRenderer::embedded().unwrap();
        let assets = AssetStore::placeholders(&mut text);
        let mut scheduler = FrameScheduler::new(&config, LyricTimeline::default(), assets, text)
            .with_envelope(envelope);

        // Full loudness at the top of the sine, fully bright: red is doubled.
        scheduler.render_frame(std::f32::consts::FRAC_PI_4);
        let sky = (0..320)
            .filter(|&x| scheduler.canvas().pixel(x, 1) == rgb(62, 31, 63))
            .count();
        assert!(sky > 160, "{sky}");
    }

    struct FailingSink;

    impl FrameSink for FailingSink {
        fn present(&mut self, _frame: &Canvas) -> Result<()> {
            Err(LyricVideoError::msg("disk full"))
        }
    }

    #[test]
    fn sink_errors_propagate_and_stop_the_clock() {
        let mut scheduler = build(10, Some(30.0), four_lines());
        let mut clock = FixedStepClock::new(10, None);
        let mut pacer = clock.pacer();
        let err = scheduler
            .run(&mut clock, &mut NoInput, &mut FailingSink, &mut pacer)
            .unwrap_err();
        assert_eq!(err.to_string(), "disk full");
        assert!(!clock.is_playing());
    }
}
