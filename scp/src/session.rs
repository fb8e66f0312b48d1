//! The remote command execution channel transfers run on.

/// Writable end connected to the remote command's standard input
pub type RemoteWriter = Box<dyn tokio::io::AsyncWrite + Send + Unpin>;

/// Readable end connected to the remote command's standard output
pub type RemoteReader = Box<dyn tokio::io::AsyncRead + Send + Unpin>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("remote {0} is not available")]
    StreamUnavailable(&'static str),
    #[error("remote command was already started")]
    AlreadyStarted,
    #[error("remote command was not started")]
    NotStarted,
    #[error("remote command exited with status {0}")]
    ExitStatus(i32),
    #[error("remote command was terminated by a signal")]
    Killed,
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// One authenticated remote-command execution context.
///
/// A session runs exactly one command: streams are requested first, then the command is
/// started, waited on and finally the session is closed. Transfers take the session by value
/// and call [`Session::close`] exactly once, whatever the outcome.
#[async_trait::async_trait]
pub trait Session: Send + Sized {
    /// Take the writer connected to the remote command's stdin; must be called before `start`
    fn stdin(&mut self) -> Result<RemoteWriter, SessionError>;

    /// Take the reader connected to the remote command's stdout; must be called before `start`
    fn stdout(&mut self) -> Result<RemoteReader, SessionError>;

    /// Start `command`, interpreted by the remote user's shell
    async fn start(&mut self, command: &str) -> Result<(), SessionError>;

    /// Block until the remote command exits; non-zero exit or signal is an error
    async fn wait(&mut self) -> Result<(), SessionError>;

    async fn close(self);
}
