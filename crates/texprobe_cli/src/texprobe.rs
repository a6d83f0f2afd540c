use std::path::Path;

use texprobe::{run_probe, Gpu};
use texprobe_cli::Args;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("texprobe=info,texprobe_cli=info"))
}

/// Console logging, plus a daily log file when `logdir` is set. The returned
/// guard flushes the file writer and has to outlive every log call.
fn setup_logging(logdir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let Some(logdir) = logdir else {
        tracing_subscriber::registry()
            .with(console_layer)
            .with(default_filter())
            .init();
        return None;
    };

    use tracing_appender::{
        non_blocking,
        rolling::{RollingFileAppender, Rotation},
    };

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        logdir,
        format!("texprobe-{}.log", env!("CARGO_PKG_VERSION")),
    );
    let (non_blocking_writer, guard) = non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_writer);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(default_filter())
        .init();

    Some(guard)
}

#[tokio::main]
async fn main() -> Result<(), texprobe::Error> {
    let args: Vec<String> = std::env::args().collect();

    // logging first, parse errors are logged
    let _guard = setup_logging(Args::logdir(&args).as_deref());
    let (args, unrecognized) = Args::parse(&args);

    for arg in &unrecognized {
        warn!("ignoring unrecognized argument '{arg}'");
    }

    let res = probe(&args).await;
    if let Err(err) = &res {
        error!("probe failed: {err}");
    }
    res
}

async fn probe(args: &Args) -> Result<(), texprobe::Error> {
    let source = args.image_source()?;
    let options = args.texture_options();
    let preview = args.preview_surface();

    let gpu = Gpu::new().await?;
    info!("probing {source} with {} run(s)", args.runs);

    let report = run_probe(
        &gpu,
        &source,
        &options,
        preview.as_ref(),
        args.pixels,
        args.runs,
    )
    .await?;

    if report.blank_runs() > 0 {
        warn!("{}", report.summary());
    }

    Ok(())
}
