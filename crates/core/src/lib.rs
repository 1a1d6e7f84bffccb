//! Core library for the lyric video renderer.
//!
//! A session is a song, a list of lyric lines with activation times and a
//! procedural look. Each module owns one subsystem: the audio clock, lyric
//! timeline and interactive marking, the effect catalog, particles, and the
//! frame scheduler that composes them at a fixed rate.

pub mod analysis;
pub mod assets;
pub mod audio;
pub mod config;
pub mod effects;
pub mod error;
pub mod input;
pub mod particles;
pub mod record;
pub mod render;
pub mod scene;
pub mod scheduler;
pub mod timeline;

pub use analysis::{AnalysisEngine, AnalysisFrame, EnergyEnvelope};
pub use assets::{AssetStore, Sprite, SpriteId};
#[cfg(feature = "playback")]
pub use audio::SpeakerPlayback;
pub use audio::{AudioClock, AudioTrack, FixedStepClock, SilentPlayback, StepPacer};
pub use config::{AppConfig, AudioConfig, LyricSource, TimedLyric, TransitionStyle};
pub use effects::{EffectTag, FrameContext};
pub use error::{LyricVideoError, Result};
pub use input::{InputSource, NoInput, ScriptedInput, Signal, StdinInput};
pub use particles::{Particle, ParticleSystem};
pub use record::{FrameSink, NullSink, Recorder, RecordingSettings};
pub use render::{Canvas, Painter, Picture, TextBlock, TextRenderer};
pub use scene::{Scene, SceneKind};
pub use scheduler::{
    FinishReason, FramePacer, FrameReport, FrameScheduler, Pacer, SchedulerState, SessionOutcome,
};
pub use timeline::{
    mark_lyrics, ActiveLyric, LyricCursor, LyricEntry, LyricTimeline, MarkingOutcome,
    PlaybackClock,
};
