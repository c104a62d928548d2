use anyhow::{Context, Result};
use clap::Parser;
use punchcam::{
    spawn_signal_handlers, DisplaySink, FrameSource, ImageDirectorySink, ImageSequenceSource,
    LogDisplaySink, PunchcamApp, PunchcamConfig, RunSummary,
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "punchcam")]
#[command(about = "Camera-based punch counter fitness game")]
#[command(version)]
#[command(long_about = "Counts punches in front of a camera by detecting a large foreground \
blob against a calibrated background. Each round draws a random goal and a countdown; reach \
the goal before the timer runs out to win the round.")]
struct Args {
    /// Directory of frames to play back, in file name order
    #[arg(short, long, value_name = "DIR", help = "Directory of input frames (png, jpg, bmp)")]
    input: Option<PathBuf>,

    /// Directory for annotated frames
    #[arg(short, long, value_name = "DIR", help = "Write annotated frames as PNG files here instead of logging them")]
    output: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "punchcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Seed for goal selection
    #[arg(long, help = "Seed the goal generator for a reproducible session")]
    seed: Option<u64>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting punchcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = match PunchcamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(seed) = args.seed {
        config.round.seed = Some(seed);
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        if args.validate_config {
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Err(e.into());
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let input = args
        .input
        .clone()
        .context("--input is required to start a session")?;

    let source = ImageSequenceSource::open(&input, &config.source)
        .with_context(|| format!("Failed to open input sequence {}", input.display()))?;

    let outcome = match &args.output {
        Some(output) => {
            let sink = ImageDirectorySink::new(output).await?;
            run_session(config, source, sink).await
        }
        None => run_session(config, source, LogDisplaySink::new()).await,
    };

    match outcome {
        Ok(summary) => {
            report(&summary);
            Ok(())
        }
        Err(e) if e.is_end_of_stream() => {
            info!("Input sequence finished");
            Ok(())
        }
        Err(e) => {
            error!("Session ended with error: {}", e);
            Err(e.into())
        }
    }
}

async fn run_session<S, D>(
    config: PunchcamConfig,
    source: S,
    sink: D,
) -> punchcam::Result<RunSummary>
where
    S: FrameSource,
    D: DisplaySink,
{
    let mut app = PunchcamApp::new(config, source, sink);
    spawn_signal_handlers(app.shutdown_handle());

    let outcome = app.run().await;
    if outcome.is_err() {
        report(app.summary());
    }
    outcome
}

fn report(summary: &RunSummary) {
    info!(
        "Session summary: {} frames ({} skipped), {} punches, {} rounds ({} won, {} failed)",
        summary.frames_processed,
        summary.frames_skipped,
        summary.punches,
        summary.rounds_started,
        summary.rounds_won,
        summary.rounds_failed
    );
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("punchcam={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .context("Failed to initialise logging")?;

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    let rendered = toml::to_string_pretty(&PunchcamConfig::default())?;
    println!("# Punchcam configuration file");
    println!("# Default values for every option; environment overrides use PUNCHCAM__SECTION__KEY");
    println!();
    println!("{}", rendered);
    Ok(())
}
