use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use vidbrief::{
    args::{Cli, Command, ProcessArgs, ServeArgs},
    format::{format_duration, format_summary_readable},
    server::{AppState, start_server},
};
use vidbrief_core::{
    Pipeline, Provider,
    storage::{allowed_file, secure_filename},
    whisper::silence_whisper_logs,
};

fn create_spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    silence_whisper_logs();

    match cli.command {
        Command::Serve(args) => {
            init_tracing("vidbrief=info,vidbrief_core=info,tower_http=info");
            serve(args).await
        }
        Command::Process(args) => {
            init_tracing("warn");
            process(args).await
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let settings = args.pipeline.settings();

    if let Err(e) = settings.provider.api_key() {
        warn!(error = %e, "summaries will fail until the API key is set");
    }

    fs::create_dir_all(&settings.upload_dir)
        .await
        .with_context(|| format!("creating {}", settings.upload_dir.display()))?;

    let state = AppState::new(Pipeline::from_settings(&settings), settings.upload_dir.clone());
    let addr = format!("{}:{}", args.host, args.port);
    info!(provider = settings.provider.label(), "models load on first use");

    start_server(&addr, state)
        .await
        .with_context(|| format!("serving on {addr}"))
}

async fn process(args: ProcessArgs) -> Result<()> {
    let settings = args.pipeline.settings();
    let provider: Provider = settings.provider;

    // Validate API key early
    if let Err(e) = provider.api_key() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    let original = args
        .video
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !allowed_file(&original) {
        bail!("File type not allowed: {}", args.video.display());
    }
    let filename = secure_filename(&original);
    if filename.is_empty() {
        bail!("Unusable file name: {}", args.video.display());
    }

    fs::create_dir_all(&settings.upload_dir)
        .await
        .with_context(|| format!("creating {}", settings.upload_dir.display()))?;

    // The pipeline deletes its input, so it works on a copy
    let working_copy = settings.upload_dir.join(&filename);
    fs::copy(&args.video, &working_copy)
        .await
        .with_context(|| format!("copying {}", args.video.display()))?;

    if !args.json {
        println!(
            "\n{}  {}\n",
            style("vidbrief").cyan().bold(),
            style("Video Summarizer").dim()
        );
        println!("{}", style("─".repeat(60)).dim());
    }

    let start = Instant::now();
    let spinner = create_spinner(&format!(
        "Processing {} with {}...",
        filename,
        provider.label()
    ))?;
    let pipeline = Pipeline::from_settings(&settings);
    let result = pipeline.process(&working_copy, &filename).await;
    spinner.finish_and_clear();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} Processed: {} {}",
        style("✓").green().bold(),
        style(&filename).dim(),
        style(format!("[{}]", format_duration(start.elapsed()))).dim()
    );
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_summary_readable(&result, &settings.upload_dir));

    Ok(())
}
