use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dialoguer::{FuzzySelect, Input};
use std::path::PathBuf;
use termreel::source::parse_timestamp;
use termreel::{
    clean_input_path, load_config, parse_width, AsciiPlayer, CancelToken, GlyphRamp, PlayError, StopReason,
};
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "m4v", "gif"];

#[derive(Parser, Debug)]
#[command(version, about = "Play a video as ASCII art in the terminal.")]
struct Args {
    /// Video file to play
    input: Option<PathBuf>,

    /// Output width in characters (default 80)
    #[arg(long, short)]
    width: Option<String>,

    /// Frames per second, overriding the rate reported by the video
    #[arg(long)]
    fps: Option<f64>,

    /// Glyphs from darkest to lightest (e.g. " .:-=+*#%@")
    #[arg(long)]
    ramp: Option<String>,

    /// Start time (e.g., 00:01:23.456 or 83.456)
    #[arg(long)]
    start: Option<String>,

    /// Config file (defaults to termreel.json in the data dir or current dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never prompt; fail if the input is missing
    #[arg(long, default_value_t = false)]
    no_prompt: bool,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let mut args = Args::parse();
    let is_interactive = !args.no_prompt;

    // stderr, so log lines stay out of the frames
    env_logger::Builder::new()
        .filter_level(args.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    let cfg = load_config(args.config.as_deref())?;
    let player = AsciiPlayer::with_config(cfg)?;
    let mut options = player.options();

    // --- Interactive Prompts ---
    if args.input.is_none() {
        if !is_interactive {
            return Err(anyhow!("Input file must be provided when using --no-prompt."));
        }
        println!("--- Terminal ASCII Video Player ---");
        args.input = Some(prompt_for_input()?);
    }
    let input_path = args.input.take().ok_or_else(|| anyhow!("no input file"))?;

    if !input_path.exists() {
        println!("Error: The file '{}' does not exist.", input_path.display());
        return Ok(());
    }

    let default_width = player.config().default_width;
    let width = match args.width.as_deref() {
        Some(w) => parse_width(w, default_width),
        None if is_interactive => {
            let answer: String = Input::new()
                .with_prompt("Enter preferred terminal width")
                .default(default_width.to_string())
                .interact()?;
            parse_width(&answer, default_width)
        }
        None => default_width,
    };
    options = options.with_width(width).with_fps(args.fps);

    if let Some(ramp) = &args.ramp {
        options = options.with_ramp(GlyphRamp::new(ramp)?);
    }
    if let Some(start) = args.start.as_deref().filter(|s| !s.trim().is_empty()) {
        let secs = parse_timestamp(start).ok_or_else(|| anyhow!("invalid start time '{}'", start))?;
        options = options.with_start_secs(Some(secs));
    }

    let cancel = CancelToken::new();
    cancel.install_ctrlc_handler().context("installing Ctrl+C handler")?;

    // --- Execution ---
    match player.play(&input_path, &options, &cancel) {
        Ok(report) => {
            if report.stop == StopReason::UserCancelled {
                println!("Playback stopped by user.");
            }
            log::info!(
                "{} frames in {:.1}s, {} over budget",
                report.frames,
                report.elapsed.as_secs_f64(),
                report.late_frames
            );
            println!("Video resources released.");
            Ok(())
        }
        Err(PlayError::InvalidPath { path }) => {
            println!("Error: The file '{}' does not exist.", path.display());
            Ok(())
        }
        Err(e) if e.before_open() => Err(e.into()),
        Err(e) => {
            println!("Video resources released.");
            Err(anyhow::Error::new(e).context("playback failed"))
        }
    }
}

fn prompt_for_input() -> Result<PathBuf> {
    const TYPE_PATH: &str = "Type a path...";

    let files = find_video_files();
    if !files.is_empty() {
        let mut items = vec![TYPE_PATH.to_string()];
        items.extend(files);
        let selection = FuzzySelect::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt("Choose a video")
            .default(0)
            .items(&items)
            .interact()?;
        if selection > 0 {
            return Ok(PathBuf::from(&items[selection]));
        }
    }

    let typed: String = Input::new()
        .with_prompt("Enter the path to the video file")
        .interact()?;
    Ok(PathBuf::from(clean_input_path(&typed)))
}

fn find_video_files() -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(".")
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .filter_map(|e| e.path().to_str().map(str::to_string))
        .collect();
    files.sort();
    files
}
