//! Shared plumbing for the rscp tools: tokio runtime setup, logging, configuration types and
//! transfer progress reporting.
//!
//! Binaries hand their async entry point to [`run`], which initializes logging according to
//! [`OutputConfig`], builds a runtime according to [`RuntimeConfig`], and reports the outcome.

pub mod config;
pub mod progress;

pub use config::{OutputConfig, RuntimeConfig};
pub use progress::{ProgressReader, ProgressSettings, ProgressType, TransferProgress};

fn init_logging(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::new(output.log_level());
    // logs go to stdout so that progress on stderr can be viewed while piping logs
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {error}");
    }
}

fn build_runtime(runtime: &RuntimeConfig) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    builder.build()
}

/// Run `func` to completion on a freshly built runtime.
///
/// Returns `None` when the runtime could not be created or `func` failed; the error chain has
/// already been printed to stderr at that point (unless quiet).
pub fn run<Summary, Fut, Func>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    func: Func,
) -> Option<Summary>
where
    Summary: std::fmt::Display,
    Fut: std::future::Future<Output = anyhow::Result<Summary>>,
    Func: FnOnce() -> Fut,
{
    init_logging(&output);
    tracing::debug!("runtime settings: {runtime:?}");
    let runtime = match build_runtime(&runtime) {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("Failed to create tokio runtime: {error}");
            return None;
        }
    };
    match runtime.block_on(func()) {
        Ok(summary) => {
            if output.print_summary || output.verbose > 0 {
                println!("{summary}");
            }
            Some(summary)
        }
        Err(error) => {
            if !output.quiet {
                eprintln!("{error:#}");
            }
            None
        }
    }
}
