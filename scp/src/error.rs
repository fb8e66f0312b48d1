use crate::session::SessionError;

/// Error returned by push and pull transfers.
///
/// Exactly one error is reported per transfer. When both the local side and the remote command
/// fail, `LocalIo` wins since it is what made the remote side fail; otherwise a failed remote
/// command wins over errors on the remote streams.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid file name {0:?}: expected a non-empty base name without '/' or newlines")]
    InvalidFileName(String),
    #[error("failed to obtain remote {stream}")]
    Stream {
        stream: &'static str,
        #[source]
        source: SessionError,
    },
    #[error("failed to start remote command `{command}`")]
    Start {
        command: String,
        #[source]
        source: SessionError,
    },
    #[error("remote command `{command}` failed")]
    RemoteCommand {
        command: String,
        #[source]
        source: SessionError,
    },
    #[error("{context}")]
    LocalIo {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}")]
    RemoteIo {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn local_io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::LocalIo {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn remote_io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::RemoteIo {
            context: context.into(),
            source,
        }
    }
}
