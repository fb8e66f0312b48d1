//! Pieces shared by push and pull: settings, summary and the outcome join.

use crate::error::Error;
use crate::session::SessionError;

/// Default size of the copy buffer
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Size of the buffer used when copying between local and remote streams
    pub buffer_size: usize,
    /// Progress display for pulls, `None` disables it
    pub progress: Option<common::ProgressSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            progress: None,
        }
    }
}

/// Outcome of a successful transfer
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub bytes_copied: u64,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "bytes copied: {}", bytesize::ByteSize(self.bytes_copied))
    }
}

/// Join the remote exit status with the result of the streaming side.
///
/// A local failure takes precedence, then a failed remote command, then any error on the
/// remote streams.
pub(crate) fn settle(
    command: &str,
    status: Result<(), SessionError>,
    streamed: Result<u64, Error>,
) -> Result<u64, Error> {
    match (status, streamed) {
        (Ok(()), streamed) => streamed,
        (Err(source), Err(local @ Error::LocalIo { .. })) => {
            tracing::warn!("remote command `{command}` failed as well: {source}");
            Err(local)
        }
        (Err(source), streamed) => {
            if let Err(error) = streamed {
                tracing::debug!("streaming error superseded by remote failure: {error}");
            }
            Err(Error::RemoteCommand {
                command: command.to_string(),
                source,
            })
        }
    }
}
