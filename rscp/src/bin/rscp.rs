use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::instrument;

use rscp_tools_rscp::path;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rscp",
    version,
    about = "Push and pull single files over SSH",
    long_about = "`rscp` copies one file to or from a remote host over an SSH connection.

Pushing runs `scp -t` on the remote host and feeds it the file using the SCP sink protocol, so
only an `scp` binary is needed remotely. Pulling streams the file with `cat`.

Remote paths use the `[user@]host[:port]:path` syntax. Relative remote paths resolve against
the remote login directory.

EXAMPLES:
    # Send a file into a remote directory
    rscp push ./report.pdf user@host:/srv/reports

    # Fetch a remote file into a local directory, with progress
    rscp pull host:/var/log/big.log ./logs/ --progress

    # Fetch through a non-standard port, printing a summary
    rscp pull user@[2001:db8::1]:2222:/etc/motd motd --summary"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    // Progress & output
    /// Show progress
    #[arg(long, global = true, help_heading = "Progress & output")]
    progress: bool,

    /// Set the type of progress display
    ///
    /// If specified, --progress flag is implied.
    #[arg(long, value_name = "TYPE", global = true, help_heading = "Progress & output")]
    progress_type: Option<common::ProgressType>,

    /// Set delay between progress updates
    ///
    /// Default is 200ms for interactive mode (`ProgressBar`) and 10s for non-interactive mode (`TextUpdates`). If specified, --progress flag is implied. Accepts human-readable durations like "200ms", "10s", "5min".
    #[arg(long, value_name = "DELAY", global = true, help_heading = "Progress & output")]
    progress_delay: Option<String>,

    /// Print summary at the end
    #[arg(long, global = true, help_heading = "Progress & output")]
    summary: bool,

    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, don't report errors
    #[arg(short = 'q', long = "quiet", global = true, help_heading = "Progress & output")]
    quiet: bool,

    // Advanced settings
    /// Size of the buffer used when copying file contents
    #[arg(
        long,
        default_value = "128KiB",
        value_name = "SIZE",
        global = true,
        help_heading = "Advanced settings"
    )]
    buffer_size: bytesize::ByteSize,

    /// Number of worker threads (0 = number of CPU cores)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        global = true,
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads (0 = Tokio default of 512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        global = true,
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Copy a local file into a remote directory
    Push {
        /// Local file to send
        source: std::path::PathBuf,

        /// Remote destination directory: `[user@]host[:port]:path`
        destination: String,
    },
    /// Copy a remote file to a local path
    Pull {
        /// Remote file to fetch: `[user@]host[:port]:path`
        source: String,

        /// Local file, or directory (existing or ending with '/') to place the file in
        destination: String,

        /// Expected size of the remote file, used for progress reporting
        ///
        /// When omitted the size is queried from the remote host before the transfer.
        #[arg(long, value_name = "SIZE")]
        size: Option<bytesize::ByteSize>,
    },
}

impl Args {
    fn transfer_settings(&self) -> anyhow::Result<scp::Settings> {
        let progress =
            if self.progress || self.progress_type.is_some() || self.progress_delay.is_some() {
                Some(common::ProgressSettings::from_args(
                    self.progress_type,
                    self.progress_delay.as_deref(),
                )?)
            } else {
                None
            };
        let buffer_size = usize::try_from(self.buffer_size.0)
            .with_context(|| format!("Buffer size {} is too large", self.buffer_size))?;
        if buffer_size == 0 {
            bail!("Buffer size must be greater than zero");
        }
        Ok(scp::Settings {
            buffer_size,
            progress,
        })
    }
}

#[instrument(skip(settings))]
async fn push(
    source: &std::path::Path,
    destination: &str,
    settings: &scp::Settings,
) -> anyhow::Result<scp::Summary> {
    let metadata = tokio::fs::metadata(source)
        .await
        .with_context(|| format!("Failed reading {source:?}"))?;
    if !metadata.is_file() {
        bail!("{source:?} is not a regular file");
    }
    let remote_path = match path::parse_path(destination)? {
        path::PathType::Remote(remote_path) => remote_path,
        path::PathType::Local(_) => {
            bail!("Push destination must be a remote path: [user@]host[:port]:path")
        }
    };
    let session = remote::OpensshSession::connect(remote_path.session()).await?;
    let summary = scp::push_path(session, source, remote_path.path(), settings)
        .await
        .with_context(|| format!("Failed pushing {source:?} to {destination}"))?;
    Ok(summary)
}

#[instrument(skip(settings))]
async fn pull(
    source: &str,
    destination: &str,
    size: Option<u64>,
    settings: &scp::Settings,
) -> anyhow::Result<scp::Summary> {
    let remote_path = match path::parse_path(source)? {
        path::PathType::Remote(remote_path) => remote_path,
        path::PathType::Local(_) => {
            bail!("Pull source must be a remote path: [user@]host[:port]:path")
        }
    };
    if let path::PathType::Remote(_) = path::parse_path(destination)? {
        bail!("Pull destination must be a local path");
    }
    let local_path = path::resolve_local_destination(&remote_path, destination)?;
    let ssh = remote_path.session().connect().await?;
    let expected_size = match size {
        Some(size) => size,
        None => remote::remote_file_size(&ssh, remote_path.path()).await?,
    };
    tracing::info!("pulling {source} ({expected_size} bytes) into {local_path:?}");
    let request = scp::PullRequest {
        expected_size,
        remote_path: remote_path.path().to_string(),
        local_path,
    };
    let summary = scp::pull(remote::OpensshSession::new(ssh), &request, settings)
        .await
        .with_context(|| format!("Failed pulling {source} to {:?}", request.local_path))?;
    Ok(summary)
}

async fn async_main(args: Args) -> anyhow::Result<scp::Summary> {
    let settings = args.transfer_settings()?;
    match &args.command {
        Command::Push {
            source,
            destination,
        } => push(source, destination, &settings).await,
        Command::Pull {
            source,
            destination,
            size,
        } => pull(source, destination, size.map(|size| size.0), &settings).await,
    }
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    let res = common::run(output, runtime, func);
    if res.is_none() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_type_parses_before_and_after_subcommand() {
        let args =
            Args::try_parse_from(["rscp", "--progress-type", "text-updates", "pull", "h:/x", "y"])
                .unwrap();
        assert_eq!(args.progress_type, Some(common::ProgressType::TextUpdates));
        let args =
            Args::try_parse_from(["rscp", "push", "x", "h:/y", "--progress-type", "progress-bar"])
                .unwrap();
        assert_eq!(args.progress_type, Some(common::ProgressType::ProgressBar));
    }

    #[test]
    fn unknown_progress_type_is_rejected() {
        let error =
            Args::try_parse_from(["rscp", "--progress-type", "sparkles", "pull", "h:/x", "y"])
                .unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn progress_flags_enable_progress() {
        let args = Args::try_parse_from(["rscp", "pull", "h:/x", "y"]).unwrap();
        assert!(args.transfer_settings().unwrap().progress.is_none());
        let args = Args::try_parse_from(["rscp", "pull", "h:/x", "y", "--progress-delay", "1s"])
            .unwrap();
        let progress = args.transfer_settings().unwrap().progress.unwrap();
        assert_eq!(
            progress.progress_delay,
            Some(std::time::Duration::from_secs(1))
        );
    }
}
