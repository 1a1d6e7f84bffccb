use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{scene::SceneKind, LyricVideoError, Result};

/// Top-level configuration structure for one lyric video session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    pub audio: AudioConfig,
    pub display: DisplayConfig,
    pub timing: TimingConfig,
    pub particles: ParticleConfig,
    pub scene: SceneKind,
    /// Directory the effect sprites are looked up in.
    pub assets_dir: PathBuf,
    /// Draws the elapsed / next lyric / remaining readout in the corner.
    pub show_timers: bool,
    /// Seed for particles, skyline generation and per-frame jitter.
    pub seed: u64,
    pub lyrics: LyricSource,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Lyric Video".to_string(),
            audio: AudioConfig::default(),
            display: DisplayConfig::default(),
            timing: TimingConfig::default(),
            particles: ParticleConfig::default(),
            scene: SceneKind::default(),
            assets_dir: PathBuf::from("."),
            show_timers: true,
            seed: 7,
            lyrics: LyricSource::default(),
        }
    }
}

impl AppConfig {
    /// Reads a session file. Relative audio and asset paths are resolved
    /// against the directory that holds the file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&text)?;

        if let Some(base) = path.parent() {
            if config.audio.path.is_relative() {
                config.audio.path = base.join(&config.audio.path);
            }
            if config.assets_dir.is_relative() {
                config.assets_dir = base.join(&config.assets_dir);
            }
        }

        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(LyricVideoError::InvalidConfig(format!(
                "display size {}x{} has no pixels",
                self.display.width, self.display.height
            )));
        }
        if self.display.fps == 0 {
            return Err(LyricVideoError::InvalidConfig(
                "display.fps must be at least 1".to_string(),
            ));
        }
        if !is_positive(self.timing.segment_seconds) {
            return Err(LyricVideoError::InvalidConfig(
                "timing.segment_seconds must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.timing.transition_start) {
            return Err(LyricVideoError::InvalidConfig(
                "timing.transition_start must lie in [0, 1)".to_string(),
            ));
        }
        if let Some(total) = self.audio.total_duration {
            if !is_positive(total) {
                return Err(LyricVideoError::InvalidConfig(
                    "audio.total_duration must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Fixed particle/animation tick derived from the target frame rate.
    pub fn frame_interval(&self) -> f32 {
        1.0 / self.display.fps as f32
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// WAV file that drives the clock.
    pub path: PathBuf,
    /// Overrides the duration read from the track.
    pub total_duration: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Nominal length of a lyric segment used to normalise effect progress.
    pub segment_seconds: f32,
    /// Fraction of the gap to the next lyric after which the transition
    /// overlay starts.
    pub transition_start: f32,
    pub transition: TransitionStyle,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            segment_seconds: 4.0,
            transition_start: 0.8,
            transition: TransitionStyle::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    /// Zoom the frame out, then fade it to black.
    #[default]
    ZoomFade,
    /// Cover the frame with a black disk that shrinks to nothing about the
    /// centre.
    ShrinkToBlack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// Particles spawned per frame.
    pub burst: usize,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self { burst: 5 }
    }
}

/// Lyrics as written in the session file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LyricSource {
    /// Lyrics with authored activation times.
    Timed(Vec<TimedLyric>),
    /// Plain lines that are timed by the interactive marking pass.
    Untimed(Vec<String>),
}

impl Default for LyricSource {
    fn default() -> Self {
        Self::Untimed(Vec::new())
    }
}

impl LyricSource {
    pub fn len(&self) -> usize {
        match self {
            Self::Timed(lines) => lines.len(),
            Self::Untimed(lines) => lines.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedLyric {
    pub time: f32,
    pub text: String,
}
