//! clipwatch: watch the Windows clipboard and archive every genuine change.

mod bootstrap;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use cw_core::MonitorConfig;
use cw_infra::ConfigStore;

#[derive(Parser, Debug)]
#[command(name = "clipwatch", version, about = "Clipboard monitor that saves text, images and file lists as they are copied")]
struct Cli {
    /// Path to the JSON config file; created with defaults when missing.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Override the configured output directory.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = ConfigStore::new(&cli.config).load_or_create()?;
    let mut config = loaded.config;
    if let Some(output) = cli.output {
        config.output_directory = output;
    }

    let _log_guard = bootstrap::init_tracing(&config.log_file)?;

    // Anything worth saying about config loading is deferred to here so
    // it lands in the subscriber just installed.
    if loaded.created {
        tracing::info!(path = %cli.config.display(), "created default config");
    }
    config.validate();

    run(config).await
}

#[cfg(windows)]
async fn run(config: MonitorConfig) -> Result<()> {
    use cw_core::ports::SnapshotSink;
    use cw_infra::FsSnapshotStore;
    use cw_platform::windows::ClipboardListener;

    tracing::info!(
        output = %config.output_directory.display(),
        max_text_length = config.max_text_length,
        save_images = config.save_images,
        save_files = config.save_files,
        "starting clipboard monitor"
    );

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let listener = ClipboardListener::start(config.clone(), tx)?;

    let store = FsSnapshotStore::new(&config.output_directory);
    let writer = tokio::spawn(async move {
        while let Some(change) = rx.recv().await {
            // Persistence failures are logged and swallowed; the monitor
            // keeps running.
            match store.persist(&change) {
                Ok(path) => tracing::info!(
                    kind = ?change.snapshot.kind(),
                    path = %path.display(),
                    "snapshot saved"
                ),
                Err(err) => tracing::warn!(error = %err, "failed to persist snapshot"),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    listener.stop();
    // The listener thread owned the sender; once it exits the channel
    // drains and the writer task finishes.
    writer.await?;

    tracing::info!("clipboard monitor stopped");
    Ok(())
}

#[cfg(not(windows))]
async fn run(_config: MonitorConfig) -> Result<()> {
    anyhow::bail!("clipboard monitoring requires the Windows clipboard API")
}
