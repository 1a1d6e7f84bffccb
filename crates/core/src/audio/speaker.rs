use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::{AudioClock, AudioTrack};
use crate::{LyricVideoError, Result};

/// Plays an [`AudioTrack`] on the default output device. Elapsed time is
/// counted from the frames the device has actually pulled.
pub struct SpeakerPlayback {
    track: AudioTrack,
    stream: Option<cpal::Stream>,
    output_rate: u32,
    played: Arc<AtomicU64>,
    finished: Arc<AtomicBool>,
}

impl SpeakerPlayback {
    pub fn new(track: AudioTrack) -> Self {
        Self {
            track,
            stream: None,
            output_rate: 0,
            played: Arc::new(AtomicU64::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl AudioClock for SpeakerPlayback {
    fn play(&mut self) -> Result<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| LyricVideoError::playback("no audio output device found"))?;
        let supported = device
            .default_output_config()
            .map_err(|e| LyricVideoError::playback(format!("failed to get output config: {e}")))?;
        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(LyricVideoError::playback(format!(
                "unsupported output sample format {:?}",
                supported.sample_format()
            )));
        }

        let config: cpal::StreamConfig = supported.into();
        let out_channels = config.channels as usize;
        let out_rate = config.sample_rate.0;
        let in_channels = self.track.channels() as usize;
        let total_frames = self.track.frame_count();
        let step = self.track.sample_rate() as f64 / out_rate as f64;

        self.played.store(0, Ordering::Relaxed);
        self.finished.store(false, Ordering::Relaxed);
        let samples = Arc::clone(self.track.samples());
        let played = Arc::clone(&self.played);
        let finished = Arc::clone(&self.finished);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut cursor = played.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(out_channels) {
                        let source = (cursor as f64 * step) as usize;
                        if source >= total_frames {
                            frame.fill(0.0);
                            finished.store(true, Ordering::Relaxed);
                            continue;
                        }
                        for (channel, out) in frame.iter_mut().enumerate() {
                            *out = samples[source * in_channels + channel.min(in_channels - 1)];
                        }
                        cursor += 1;
                    }
                    played.store(cursor, Ordering::Relaxed);
                },
                |err| tracing::error!(%err, "audio output stream error"),
                None,
            )
            .map_err(|e| LyricVideoError::playback(format!("failed to build output stream: {e}")))?;
        stream
            .play()
            .map_err(|e| LyricVideoError::playback(format!("failed to start output stream: {e}")))?;

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate = out_rate,
            "audio playback started"
        );
        self.output_rate = out_rate;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("audio playback stopped");
        }
    }

    fn elapsed_seconds(&self) -> f32 {
        if self.output_rate == 0 {
            return 0.0;
        }
        self.played.load(Ordering::Relaxed) as f32 / self.output_rate as f32
    }

    fn is_playing(&self) -> bool {
        self.stream.is_some() && !self.finished.load(Ordering::Relaxed)
    }

    fn duration(&self) -> Option<f32> {
        Some(self.track.duration())
    }
}
