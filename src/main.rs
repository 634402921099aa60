use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;

use stepshot::platform::ScriptedPlatform;
use stepshot::recorder::{ScriptedCaptureSource, ScriptedMedia};
use stepshot::{util, CaptureCore, Command, Config};

/// Drive the capture stack end to end against a simulated browser:
/// detect, arm, screenshot, record, stop.
#[derive(Parser)]
#[command(name = "stepshot", about = "Evidence-capture coordination demo")]
struct Cli {
    /// Custom data directory (default ~/.stepshot)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Tab id of the simulated page
    #[arg(long, default_value_t = 7)]
    tab: u64,

    /// Origin of the simulated page window
    #[arg(long, default_value = "https://app.example.test")]
    origin: String,

    /// Test execution id to arm the tab with
    #[arg(long, default_value = "exec-local")]
    execution_id: String,

    /// Test case id to arm the tab with
    #[arg(long, default_value = "case-demo")]
    test_case_id: String,

    /// Step number to arm the tab with
    #[arg(long, default_value_t = 1)]
    step_number: u32,

    /// How long to record before stopping, in milliseconds
    #[arg(long, default_value_t = 1500)]
    record_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    util::paths::init_data_dir(cli.data_dir.clone());

    // Logging to file (~/.stepshot/logs/stepshot.log)
    fs::create_dir_all(util::logs_dir())?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let config = Config::load();
    let platform = ScriptedPlatform::with_active_tab(cli.tab);
    let source = ScriptedCaptureSource::new(ScriptedMedia::default());

    let mut core = CaptureCore::launch(Arc::new(platform), Arc::new(source), config);
    let mut captures = core.router().subscribe_captures();
    let (_bus, bridge) = core.attach_tab(cli.tab, &cli.origin);

    if !bridge.detect_extension_installed().await {
        anyhow::bail!("extension did not answer the installation probe");
    }
    println!("extension detected");

    bridge
        .call(Command::ArmTabContext {
            execution_id: cli.execution_id.clone(),
            test_case_id: cli.test_case_id.clone(),
            step_number: cli.step_number,
        })
        .await
        .context("arming the tab")?;
    let context = bridge.call(Command::GetActiveTabContext {}).await?;
    println!(
        "armed tab {} with {} / {} step {}",
        cli.tab, cli.execution_id, cli.test_case_id, cli.step_number
    );
    tracing::debug!(%context, "armed context");

    bridge
        .call(Command::CaptureScreenshotActiveTab {})
        .await
        .context("capturing screenshot")?;
    let shot = captures.recv().await?;
    println!("screenshot: {} ({})", shot.file_name, shot.mime_type);

    bridge
        .call(Command::StartRecordingActiveTab {})
        .await
        .context("starting recording")?;
    let status = bridge
        .call(Command::GetRecordingStatus { tab_id: None })
        .await?;
    println!("recording: {}", status["isRecording"]);

    tokio::time::sleep(Duration::from_millis(cli.record_ms)).await;
    bridge
        .call(Command::StopRecordingCurrent {})
        .await
        .context("stopping recording")?;
    let video = captures.recv().await?;
    println!(
        "video: {} ({}, {} base64 chars)",
        video.file_name,
        video.mime_type,
        video.artifact.len()
    );

    core.shutdown();
    Ok(())
}
