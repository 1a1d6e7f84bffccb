use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use lyric_video_core::{
    mark_lyrics, AppConfig, AssetStore, AudioClock, AudioTrack, Canvas, EnergyEnvelope,
    FixedStepClock, FramePacer, FrameScheduler, FrameSink, InputSource, LyricSource,
    LyricTimeline, LyricVideoError, NoInput, NullSink, Pacer, Recorder, RecordingSettings,
    SessionOutcome, SilentPlayback, StdinInput, TextRenderer,
};
use tracing_subscriber::EnvFilter;

fn main() -> lyric_video_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            session,
            frames_dir,
            silent,
        } => run_play(&session, frames_dir, silent),
        Commands::Render {
            session,
            out,
            every,
        } => run_render(&session, out, every),
        Commands::Inspect { session } => run_inspect(&session),
    }
}

fn run_play(
    session: &Path,
    frames_dir: Option<PathBuf>,
    silent: bool,
) -> lyric_video_core::Result<()> {
    let config = AppConfig::from_path(session)?;
    tracing::info!(title = %config.title, session = %session.display(), "starting session");

    let track = AudioTrack::load(&config.audio.path)?;
    let envelope = EnergyEnvelope::from_track(&track)?;
    let mut clock = open_clock(&track, silent);
    let mut input = StdinInput::spawn()?;
    let mut pacer = FramePacer::new(config.display.fps);

    let mut recorder = frames_dir.map(|output_dir| {
        Recorder::new(RecordingSettings {
            output_dir,
            every_nth: 1,
        })
    });
    if let Some(recorder) = recorder.as_mut() {
        recorder.start()?;
    }
    let mut null = NullSink;
    let sink: &mut dyn FrameSink = match recorder.as_mut() {
        Some(recorder) => recorder,
        None => &mut null,
    };

    let outcome = play_session(&config, envelope, &mut *clock, &mut input, sink, &mut pacer)?;
    if let Some(outcome) = outcome {
        tracing::info!(frames = outcome.frames, reason = ?outcome.reason, "session over");
    }

    if let Some(recorder) = recorder.as_mut() {
        recorder.stop()?;
    }
    Ok(())
}

/// Marks untimed lyrics, then plays the session. Only the playback pass is
/// presented to `sink`; the marking screens are discarded. Returns `None`
/// when there is nothing to play.
fn play_session<C, I, S, P>(
    config: &AppConfig,
    envelope: EnergyEnvelope,
    clock: &mut C,
    input: &mut I,
    sink: &mut S,
    pacer: &mut P,
) -> lyric_video_core::Result<Option<SessionOutcome>>
where
    C: AudioClock + ?Sized,
    I: InputSource + ?Sized,
    S: FrameSink + ?Sized,
    P: Pacer + ?Sized,
{
    let mut text = TextRenderer::embedded()?;
    let assets = AssetStore::load_dir(&config.assets_dir, &mut text);

    let timeline = match &config.lyrics {
        LyricSource::Timed(lines) => LyricTimeline::from_timed(lines)?,
        LyricSource::Untimed(lines) => {
            tracing::info!(lines = lines.len(), "press Enter to mark each lyric, `q` to stop");
            let mut canvas = Canvas::new(config.display.width, config.display.height);
            let outcome = mark_lyrics(
                lines,
                clock,
                input,
                &mut NullSink,
                pacer,
                &mut canvas,
                &mut text,
            )?;
            println!("{}", serde_json_pretty(&outcome.timeline)?);
            outcome.timeline
        }
    };
    if timeline.is_empty() {
        tracing::warn!("no lyrics to play");
        return Ok(None);
    }

    let mut scheduler =
        FrameScheduler::new(config, timeline, assets, text).with_envelope(envelope);
    scheduler.run(clock, input, sink, pacer).map(Some)
}

fn run_render(session: &Path, out: PathBuf, every: u32) -> lyric_video_core::Result<()> {
    let config = AppConfig::from_path(session)?;
    let timeline = LyricTimeline::from_source(&config.lyrics)?.ok_or_else(|| {
        LyricVideoError::InvalidConfig(
            "render needs timed lyrics; mark them with `play` first".to_string(),
        )
    })?;
    tracing::info!(?session, ?out, lyrics = timeline.len(), "rendering offline");

    let track = AudioTrack::load(&config.audio.path)?;
    let envelope = EnergyEnvelope::from_track(&track)?;
    let mut text = TextRenderer::embedded()?;
    let assets = AssetStore::load_dir(&config.assets_dir, &mut text);

    let mut clock = FixedStepClock::new(config.display.fps, Some(track.duration()));
    let mut pacer = clock.pacer();
    let mut recorder = Recorder::new(RecordingSettings {
        output_dir: out,
        every_nth: every,
    });
    recorder.start()?;

    let mut scheduler =
        FrameScheduler::new(&config, timeline, assets, text).with_envelope(envelope);
    let outcome = scheduler.run(&mut clock, &mut NoInput, &mut recorder, &mut pacer)?;
    recorder.stop()?;
    tracing::info!(
        frames = outcome.frames,
        written = recorder.frames_written(),
        "render complete"
    );
    Ok(())
}

fn run_inspect(session: &Path) -> lyric_video_core::Result<()> {
    let config = AppConfig::from_path(session)?;
    println!("{}", config.title);

    match AudioTrack::load(&config.audio.path) {
        Ok(track) => println!(
            "audio: {} ({:.2}s, {} Hz, {} ch)",
            config.audio.path.display(),
            track.duration(),
            track.sample_rate(),
            track.channels()
        ),
        Err(err) => println!("audio: {err}"),
    }
    if let Some(total) = config.audio.total_duration {
        println!("total duration override: {total:.2}s");
    }

    match LyricTimeline::from_source(&config.lyrics)? {
        Some(timeline) => {
            for (index, entry) in timeline.entries().iter().enumerate() {
                println!(
                    "{index:>3} {:>8.2}s  {:<18} {}",
                    entry.activation_time,
                    format!("{:?}", entry.effect),
                    entry.text
                );
            }
        }
        None => println!("{} untimed lyrics, run `play` to mark them", config.lyrics.len()),
    }
    Ok(())
}

#[cfg(feature = "playback")]
fn open_clock(track: &AudioTrack, silent: bool) -> Box<dyn AudioClock> {
    if silent {
        Box::new(SilentPlayback::for_track(track))
    } else {
        Box::new(lyric_video_core::SpeakerPlayback::new(track.clone()))
    }
}

#[cfg(not(feature = "playback"))]
fn open_clock(track: &AudioTrack, _silent: bool) -> Box<dyn AudioClock> {
    tracing::info!("built without the `playback` feature, running silently");
    Box::new(SilentPlayback::for_track(track))
}

fn serde_json_pretty(timeline: &LyricTimeline) -> lyric_video_core::Result<String> {
    Ok(serde_json::to_string_pretty(&timeline.to_timed())?)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Music-synchronized lyric video renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a session in real time. Untimed lyrics are marked first.
    Play {
        /// Session file (JSON).
        session: PathBuf,
        /// Also write every presented frame as a PNG into this directory.
        #[arg(long)]
        frames_dir: Option<PathBuf>,
        /// Keep the clock running without opening an audio device.
        #[arg(long)]
        silent: bool,
    },
    /// Render a timed session to a PNG sequence on a fixed-step clock.
    Render {
        /// Session file (JSON).
        session: PathBuf,
        /// Output directory for the frames.
        #[arg(short, long)]
        out: PathBuf,
        /// Keep one frame out of this many.
        #[arg(long, default_value_t = 1)]
        every: u32,
    },
    /// Print the timeline with the effect chosen for each line.
    Inspect {
        /// Session file (JSON).
        session: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use lyric_video_core::{FinishReason, ScriptedInput, Signal};

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lyric-video-app-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn untimed_config(assets_dir: PathBuf) -> AppConfig {
        let mut config = AppConfig::default();
        config.display.width = 64;
        config.display.height = 36;
        config.display.fps = 10;
        config.audio.total_duration = Some(0.5);
        config.assets_dir = assets_dir;
        config.lyrics = LyricSource::Untimed(vec![
            "Shut your mouth".to_string(),
            "Where is your uncle at?".to_string(),
        ]);
        config
    }

    #[test]
    fn recorded_frames_start_after_marking() {
        let dir = scratch_dir("marked");
        let frames = dir.join("frames");
        let config = untimed_config(dir.clone());

        let mut clock = FixedStepClock::new(10, None);
        let mut pacer = clock.pacer();
        let mut input = ScriptedInput::new()
            .at(2, Signal::Mark)
            .at(4, Signal::Mark);
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: frames.clone(),
            every_nth: 1,
        });
        recorder.start().unwrap();

        let outcome = play_session(
            &config,
            EnergyEnvelope::default(),
            &mut clock,
            &mut input,
            &mut recorder,
            &mut pacer,
        )
        .unwrap()
        .unwrap();
        recorder.stop().unwrap();

        // Four marking screens went by before the second mark; none of them
        // were written.
        assert_eq!(outcome.reason, FinishReason::DurationReached);
        assert_eq!(outcome.frames, 5);
        assert_eq!(recorder.frames_written(), 5);
        assert_eq!(std::fs::read_dir(&frames).unwrap().count(), 5);
    }

    #[test]
    fn quitting_before_any_mark_plays_nothing() {
        let dir = scratch_dir("quit");
        let config = untimed_config(dir.clone());

        let mut clock = FixedStepClock::new(10, None);
        let mut pacer = clock.pacer();
        let mut input = ScriptedInput::new().at(1, Signal::Quit);
        let mut recorder = Recorder::new(RecordingSettings {
            output_dir: dir.join("frames"),
            every_nth: 1,
        });
        recorder.start().unwrap();

        let outcome = play_session(
            &config,
            EnergyEnvelope::default(),
            &mut clock,
            &mut input,
            &mut recorder,
            &mut pacer,
        )
        .unwrap();
        assert!(outcome.is_none());
        assert_eq!(recorder.frames_written(), 0);
    }
}
