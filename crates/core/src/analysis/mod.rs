use std::{cmp::Ordering, f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{audio::AudioTrack, LyricVideoError, Result};

const BEAT_GAIN: f32 = 12.0;
const BEAT_THRESHOLD: f32 = 0.6;
const MIN_BEAT_INTERVAL: f32 = 0.2;
const MAX_BEAT_HISTORY: usize = 32;
/// Samples per analysis block when scanning a whole track.
pub const ENVELOPE_BLOCK: usize = 1024;

/// Features for one analysed block, stamped with the block's centre time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisFrame {
    pub time: f32,
    pub rms: f32,
    /// Normalised [0, 1] spectral centroid where 1.0 corresponds to the
    /// Nyquist frequency of the analysed block.
    pub spectral_centroid: f32,
    pub beat_confidence: f32,
}

/// Block-by-block feature extractor over mono samples.
pub struct AnalysisEngine {
    sample_rate: u32,
    frames: Vec<AnalysisFrame>,
    processed_samples: usize,
    last_rms: f32,
    beat_timestamps: Vec<f32>,
    tempo_bpm: Option<f32>,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl AnalysisEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            frames: Vec::new(),
            processed_samples: 0,
            last_rms: 0.0,
            beat_timestamps: Vec::new(),
            tempo_bpm: None,
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    /// Average tempo over the most recent detected onsets.
    pub fn tempo_bpm(&self) -> Option<f32> {
        self.tempo_bpm
    }

    pub fn into_frames(self) -> Vec<AnalysisFrame> {
        self.frames
    }

    /// Consumes the next block of samples and records its features.
    pub fn process_block(&mut self, samples: &[f32]) -> Result<AnalysisFrame> {
        if samples.len() < 2 {
            return Err(LyricVideoError::InvalidInput(
                "analysis requires blocks with at least two samples",
            ));
        }

        let block_size = samples.len();
        let sample_rate = self.sample_rate as f32;
        let start_time = self.processed_samples as f32 / sample_rate;
        let end_time = (self.processed_samples + block_size) as f32 / sample_rate;

        let rms = compute_rms(samples);
        let time = (start_time + end_time) * 0.5;
        let beat_confidence = self.update_beats(time, rms);
        let nyquist = sample_rate * 0.5;
        let spectral_centroid = (self.compute_spectral_centroid(samples)? / nyquist).clamp(0.0, 1.0);

        self.processed_samples += block_size;
        let frame = AnalysisFrame {
            time,
            rms,
            spectral_centroid,
            beat_confidence,
        };
        self.frames.push(frame.clone());
        Ok(frame)
    }

    fn update_beats(&mut self, timestamp: f32, rms: f32) -> f32 {
        let delta = (rms - self.last_rms).max(0.0);
        self.last_rms = rms;
        let confidence = (delta * BEAT_GAIN).clamp(0.0, 1.0);

        let spaced = self
            .beat_timestamps
            .last()
            .map_or(true, |last| timestamp - last >= MIN_BEAT_INTERVAL);
        if confidence >= BEAT_THRESHOLD && spaced {
            self.beat_timestamps.push(timestamp);
            if self.beat_timestamps.len() > MAX_BEAT_HISTORY {
                let overflow = self.beat_timestamps.len() - MAX_BEAT_HISTORY;
                self.beat_timestamps.drain(0..overflow);
            }
            self.update_tempo_estimate();
        }

        confidence
    }

    fn update_tempo_estimate(&mut self) {
        let intervals: Vec<f32> = self
            .beat_timestamps
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|interval| *interval > f32::EPSILON)
            .collect();
        if intervals.is_empty() {
            return;
        }
        let average = intervals.iter().sum::<f32>() / intervals.len() as f32;
        self.tempo_bpm = Some(60.0 / average);
    }

    fn compute_spectral_centroid(&mut self, samples: &[f32]) -> Result<f32> {
        let len = samples.len();
        let bin_hz = self.sample_rate as f32 / len as f32;
        let fft = self.prepare_fft(len);

        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }
        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let (magnitude_sum, weighted_sum) = fft.spectrum.iter().enumerate().fold(
            (0.0, 0.0),
            |(total, weighted), (i, bin)| {
                let magnitude = bin.norm();
                (total + magnitude, weighted + magnitude * i as f32 * bin_hz)
            },
        );

        if magnitude_sum <= f32::EPSILON {
            Ok(0.0)
        } else {
            Ok(weighted_sum / magnitude_sum)
        }
    }

    fn prepare_fft(&mut self, size: usize) -> &mut FftResources {
        let planner = &mut self.fft_planner;
        let fft = self.fft.get_or_insert_with(|| FftResources::plan(planner, size));
        if fft.size != size {
            *fft = FftResources::plan(planner, size);
        }
        fft
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl FftResources {
    fn plan(planner: &mut RealFftPlanner<f32>, size: usize) -> Self {
        let plan = planner.plan_fft_forward(size);
        Self {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        }
    }
}

impl fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames.len())
            .field("processed_samples", &self.processed_samples)
            .field("beat_timestamps", &self.beat_timestamps.len())
            .field("tempo_bpm", &self.tempo_bpm)
            .finish()
    }
}

/// Loudness and brightness over the whole track, precomputed before playback
/// so the frame loop only does lookups.
#[derive(Debug, Clone, Default)]
pub struct EnergyEnvelope {
    frames: Vec<AnalysisFrame>,
    peak_rms: f32,
    peak_centroid: f32,
    tempo_bpm: Option<f32>,
}

impl EnergyEnvelope {
    pub fn from_track(track: &AudioTrack) -> Result<Self> {
        let mono = track.mono();
        let mut engine = AnalysisEngine::new(track.sample_rate());
        for block in mono.chunks(ENVELOPE_BLOCK).filter(|block| block.len() >= 2) {
            engine.process_block(block)?;
        }

        let tempo_bpm = engine.tempo_bpm();
        let frames = engine.into_frames();
        let peak_rms = frames.iter().map(|frame| frame.rms).fold(0.0, f32::max);
        let peak_centroid = frames
            .iter()
            .map(|frame| frame.spectral_centroid)
            .fold(0.0, f32::max);
        tracing::debug!(
            frames = frames.len(),
            peak_rms,
            peak_centroid,
            tempo_bpm,
            "energy envelope ready"
        );
        Ok(Self {
            frames,
            peak_rms,
            peak_centroid,
            tempo_bpm,
        })
    }

    pub fn tempo_bpm(&self) -> Option<f32> {
        self.tempo_bpm
    }

    /// Latest frame at or before `time`; a zeroed frame before the first.
    pub fn sample_at(&self, time: f32) -> AnalysisFrame {
        match self
            .frames
            .binary_search_by(|frame| frame.time.partial_cmp(&time).unwrap_or(Ordering::Equal))
        {
            Ok(index) => self.frames[index].clone(),
            Err(0) => AnalysisFrame {
                time,
                ..Default::default()
            },
            Err(index) => self.frames[index - 1].clone(),
        }
    }

    /// Loudness at `time` relative to the loudest block, in `[0, 1]`.
    pub fn level(&self, time: f32) -> f32 {
        if self.peak_rms <= f32::EPSILON {
            return 0.0;
        }
        (self.sample_at(time).rms / self.peak_rms).clamp(0.0, 1.0)
    }

    /// Spectral centroid at `time` relative to the brightest block, in
    /// `[0, 1]`.
    pub fn brightness(&self, time: f32) -> f32 {
        if self.peak_centroid <= f32::EPSILON {
            return 0.0;
        }
        (self.sample_at(time).spectral_centroid / self.peak_centroid).clamp(0.0, 1.0)
    }
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}
