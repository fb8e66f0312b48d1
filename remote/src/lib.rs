//! OpenSSH plumbing for rscp: connecting to hosts and running single commands as
//! [`scp::Session`]s.

use anyhow::{Context, anyhow};
use tracing::instrument;

pub mod session;

pub use session::OpensshSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSession {
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
}

impl SshSession {
    /// Destination in the `ssh://` form understood by openssh
    #[must_use]
    pub fn destination(&self) -> String {
        let host = self.host.as_str();
        match (self.user.as_deref(), self.port) {
            (Some(user), Some(port)) => format!("ssh://{user}@{host}:{port}"),
            (None, Some(port)) => format!("ssh://{host}:{port}"),
            (Some(user), None) => format!("ssh://{user}@{host}"),
            (None, None) => format!("ssh://{host}"),
        }
    }

    /// Open a multiplexed connection to this host
    #[instrument]
    pub async fn connect(&self) -> anyhow::Result<std::sync::Arc<openssh::Session>> {
        let destination = self.destination();
        tracing::debug!("Connecting to SSH destination: {}", destination);
        let session = openssh::Session::connect(destination, openssh::KnownHosts::Accept)
            .await
            .with_context(|| format!("Failed to establish SSH connection to {}", self.host))?;
        Ok(std::sync::Arc::new(session))
    }
}

/// Size in bytes of a remote file, as reported by `wc -c`.
///
/// Used to size the progress display of a pull when the caller didn't provide a size.
#[instrument(skip(session))]
pub async fn remote_file_size(session: &openssh::Session, path: &str) -> anyhow::Result<u64> {
    let command = format!("wc -c < {}", scp::command::quote(path));
    let output = session
        .raw_command(&command)
        .output()
        .await
        .with_context(|| format!("Failed to run `{command}`"))?;
    if !output.status.success() {
        return Err(anyhow!(
            "`{}` failed on remote host, status code: {:?}\nstderr:\n{}",
            command,
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim_end(),
        ));
    }
    parse_size(&String::from_utf8_lossy(&output.stdout))
}

fn parse_size(output: &str) -> anyhow::Result<u64> {
    output
        .trim()
        .parse::<u64>()
        .with_context(|| format!("Unexpected `wc -c` output: {output:?}"))
}
