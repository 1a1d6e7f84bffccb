use std::{
    cell::Cell,
    path::{Path, PathBuf},
    rc::Rc,
    sync::Arc,
};

use hound::{SampleFormat, WavReader};

use crate::{scheduler::Pacer, timeline::PlaybackClock, LyricVideoError, Result};

#[cfg(feature = "playback")]
mod speaker;

#[cfg(feature = "playback")]
pub use speaker::SpeakerPlayback;

/// Authoritative source of playback time.
///
/// `elapsed_seconds` must be monotonically non-decreasing while playing and
/// is frozen once the clock stops.
pub trait AudioClock {
    fn play(&mut self) -> Result<()>;
    fn stop(&mut self);
    fn elapsed_seconds(&self) -> f32;
    fn is_playing(&self) -> bool;
    /// Length of the track, when known.
    fn duration(&self) -> Option<f32>;
}

/// Decoded PCM audio held in memory as interleaved `f32` samples.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    path: Option<PathBuf>,
    sample_rate: u32,
    channels: u16,
    samples: Arc<Vec<f32>>,
}

impl AudioTrack {
    /// Decodes a WAV file. Integer samples are scaled to `[-1, 1]`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let audio_err = |source| LyricVideoError::AudioLoad {
            path: path.to_path_buf(),
            source,
        };

        let reader = WavReader::open(path).map_err(audio_err)?;
        let spec = reader.spec();
        let samples = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
        }
        .map_err(audio_err)?;

        let track = Self {
            path: Some(path.to_path_buf()),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples: Arc::new(samples),
        };
        tracing::info!(
            path = %path.display(),
            sample_rate = track.sample_rate,
            channels = track.channels,
            seconds = track.duration(),
            "decoded audio track"
        );
        Ok(track)
    }

    pub fn from_samples(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            path: None,
            sample_rate,
            channels: channels.max(1),
            samples: Arc::new(samples),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Interleaved samples shared with any playback thread.
    pub fn samples(&self) -> &Arc<Vec<f32>> {
        &self.samples
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Length in seconds.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f32 / self.sample_rate as f32
    }

    /// Channel average of every frame.
    pub fn mono(&self) -> Vec<f32> {
        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Wall-clock playback that produces no sound. Used when no output device
/// is available or wanted; time still stops at the end of the track.
#[derive(Debug, Default)]
pub struct SilentPlayback {
    duration: Option<f32>,
    clock: Option<PlaybackClock>,
    stopped_at: Option<f32>,
}

impl SilentPlayback {
    pub fn new(duration: Option<f32>) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    pub fn for_track(track: &AudioTrack) -> Self {
        Self::new(Some(track.duration()))
    }
}

impl AudioClock for SilentPlayback {
    fn play(&mut self) -> Result<()> {
        self.clock = Some(PlaybackClock::start());
        self.stopped_at = None;
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(self.elapsed_seconds());
        }
    }

    fn elapsed_seconds(&self) -> f32 {
        if let Some(stopped) = self.stopped_at {
            return stopped;
        }
        let elapsed = self.clock.as_ref().map(PlaybackClock::elapsed).unwrap_or(0.0);
        match self.duration {
            Some(duration) => elapsed.min(duration),
            None => elapsed,
        }
    }

    fn is_playing(&self) -> bool {
        if self.clock.is_none() || self.stopped_at.is_some() {
            return false;
        }
        self.duration
            .map_or(true, |duration| self.elapsed_seconds() < duration)
    }

    fn duration(&self) -> Option<f32> {
        self.duration
    }
}

/// Deterministic clock for offline rendering. Time only moves when the
/// paired [`StepPacer`] is waited on, by exactly one frame each time.
#[derive(Debug)]
pub struct FixedStepClock {
    fps: u32,
    frame: Rc<Cell<u64>>,
    duration: Option<f32>,
    playing: bool,
}

impl FixedStepClock {
    pub fn new(fps: u32, duration: Option<f32>) -> Self {
        Self {
            fps: fps.max(1),
            frame: Rc::new(Cell::new(0)),
            duration,
            playing: false,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame.get()
    }

    /// Pacer that advances this clock.
    pub fn pacer(&self) -> StepPacer {
        StepPacer {
            frame: Rc::clone(&self.frame),
        }
    }
}

impl AudioClock for FixedStepClock {
    fn play(&mut self) -> Result<()> {
        self.frame.set(0);
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn elapsed_seconds(&self) -> f32 {
        (self.frame.get() as f64 / self.fps as f64) as f32
    }

    fn is_playing(&self) -> bool {
        self.playing
            && self
                .duration
                .map_or(true, |duration| self.elapsed_seconds() < duration)
    }

    fn duration(&self) -> Option<f32> {
        self.duration
    }
}

#[derive(Debug, Clone)]
pub struct StepPacer {
    frame: Rc<Cell<u64>>,
}

impl Pacer for StepPacer {
    fn wait(&mut self) {
        self.frame.set(self.frame.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lyric-video-audio-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn decodes_sixteen_bit_wav() {
        let path = scratch_file("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..8_000 {
            writer.write_sample(i16::MAX).unwrap();
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();

        let track = AudioTrack::load(&path).unwrap();
        assert_eq!(track.sample_rate(), 8_000);
        assert_eq!(track.channels(), 2);
        assert!((track.duration() - 1.0).abs() < 1e-6);
        assert!((track.samples()[0] - 1.0).abs() < 1e-3);
        let mono = track.mono();
        assert_eq!(mono.len(), 8_000);
        assert!((mono[0] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn missing_audio_is_fatal() {
        let err = AudioTrack::load(scratch_file("FamilyMatters.wav")).unwrap_err();
        assert!(matches!(err, LyricVideoError::AudioLoad { .. }));
        assert!(err.to_string().contains("FamilyMatters.wav"));
    }

    #[test]
    fn silent_playback_idles_until_played() {
        let mut clock = SilentPlayback::new(Some(10.0));
        assert!(!clock.is_playing());
        assert_eq!(clock.elapsed_seconds(), 0.0);
        clock.play().unwrap();
        assert!(clock.is_playing());
        clock.stop();
        assert!(!clock.is_playing());
        let frozen = clock.elapsed_seconds();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(clock.elapsed_seconds(), frozen);
    }

    #[test]
    fn silent_playback_ends_with_the_track() {
        let mut clock = SilentPlayback::new(Some(0.0));
        clock.play().unwrap();
        assert!(!clock.is_playing());
        assert_eq!(clock.elapsed_seconds(), 0.0);
    }

    #[test]
    fn step_pacer_moves_the_clock_one_frame() {
        let mut clock = FixedStepClock::new(60, Some(1.0));
        let mut pacer = clock.pacer();
        clock.play().unwrap();
        for _ in 0..30 {
            pacer.wait();
        }
        assert!((clock.elapsed_seconds() - 0.5).abs() < 1e-6);
        assert!(clock.is_playing());
        for _ in 0..30 {
            pacer.wait();
        }
        assert_eq!(clock.elapsed_seconds(), 1.0);
        assert!(!clock.is_playing());
    }
}
