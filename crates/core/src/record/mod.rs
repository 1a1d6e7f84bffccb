use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{render::Canvas, LyricVideoError, Result};

/// Destination for finished frames.
pub trait FrameSink {
    fn present(&mut self, frame: &Canvas) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn present(&mut self, frame: &Canvas) -> Result<()> {
        (**self).present(frame)
    }
}

/// Discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &Canvas) -> Result<()> {
        Ok(())
    }
}

/// Configuration options for the recording subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub output_dir: PathBuf,
    /// Keep one frame out of this many.
    pub every_nth: u32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("frames"),
            every_nth: 1,
        }
    }
}

/// Writes presented frames as a numbered PNG sequence
/// (`frame_00000.png`, `frame_00001.png`, ...).
#[derive(Debug, Default)]
pub struct Recorder {
    settings: RecordingSettings,
    is_recording: bool,
    presented: u64,
    written: u64,
}

impl Recorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            is_recording: false,
            presented: 0,
            written: 0,
        }
    }

    /// Creates the output directory and starts accepting frames.
    pub fn start(&mut self) -> Result<()> {
        if self.settings.every_nth == 0 {
            return Err(LyricVideoError::InvalidConfig(
                "recording frame step must be at least 1".into(),
            ));
        }
        std::fs::create_dir_all(&self.settings.output_dir)?;
        self.is_recording = true;
        self.presented = 0;
        self.written = 0;
        tracing::info!(dir = %self.settings.output_dir.display(), "recording frames");
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if self.is_recording {
            tracing::info!(frames = self.written, "recording finished");
        }
        self.is_recording = false;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    /// Number of PNG files written since the last start.
    pub fn frames_written(&self) -> u64 {
        self.written
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.settings.output_dir.join(format!("frame_{index:05}.png"))
    }
}

impl FrameSink for Recorder {
    fn present(&mut self, frame: &Canvas) -> Result<()> {
        if !self.is_recording {
            return Ok(());
        }
        let keep = self.presented % self.settings.every_nth as u64 == 0;
        self.presented += 1;
        if keep {
            frame.to_image().save(self.frame_path(self.written))?;
            self.written += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::WHITE;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lyric-video-record-{name}-{}", std::process::id()))
    }

    #[test]
    fn writes_numbered_pngs() {
        let dir = scratch_dir("seq");
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: dir.clone(),
            every_nth: 2,
        });
        recorder.start().unwrap();

        let mut frame = Canvas::new(4, 3);
        frame.fill(WHITE);
        for _ in 0..5 {
            recorder.present(&frame).unwrap();
        }
        recorder.stop().unwrap();

        assert_eq!(recorder.frames_written(), 3);
        assert!(dir.join("frame_00002.png").exists());
        assert!(!dir.join("frame_00003.png").exists());
        let decoded = image::open(dir.join("frame_00000.png")).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(*decoded.get_pixel(1, 1), WHITE);
    }

    #[test]
    fn ignores_frames_until_started() {
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: scratch_dir("idle"),
            every_nth: 1,
        });
        recorder.present(&Canvas::new(2, 2)).unwrap();
        assert_eq!(recorder.frames_written(), 0);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn zero_step_is_rejected() {
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: scratch_dir("zero"),
            every_nth: 0,
        });
        assert!(matches!(
            recorder.start(),
            Err(LyricVideoError::InvalidConfig(_))
        ));
    }
}
