//! [`scp::Session`] backed by a command executed over an OpenSSH connection.
//!
//! openssh only hands out the child's stdio once the command is spawned, while transfers ask
//! for their streams before starting it. The streams handed out are therefore in-memory pipes,
//! spliced onto the child's stdio by small pump tasks as soon as the command starts.

use std::sync::Arc;

use anyhow::Context;
use scp::{RemoteReader, RemoteWriter, SessionError};
use tokio::io::{AsyncWriteExt, DuplexStream};

const PIPE_CAPACITY: usize = 64 * 1024;

type RemoteChild = openssh::Child<Arc<openssh::Session>>;

#[derive(Debug)]
pub struct OpensshSession {
    session: Arc<openssh::Session>,
    stdin: Option<DuplexStream>,
    stdout: Option<DuplexStream>,
    stdin_requested: bool,
    stdout_requested: bool,
    child: Option<RemoteChild>,
    started: bool,
    pumps: Vec<tokio::task::JoinHandle<()>>,
}

impl OpensshSession {
    #[must_use]
    pub fn new(session: Arc<openssh::Session>) -> Self {
        Self {
            session,
            stdin: None,
            stdout: None,
            stdin_requested: false,
            stdout_requested: false,
            child: None,
            started: false,
            pumps: Vec::new(),
        }
    }

    pub async fn connect(host: &crate::SshSession) -> anyhow::Result<Self> {
        Ok(Self::new(host.connect().await?))
    }

    fn check_stream_request(
        &self,
        requested: bool,
        stream: &'static str,
    ) -> Result<(), SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        if requested {
            return Err(SessionError::StreamUnavailable(stream));
        }
        Ok(())
    }
}

fn stdio_for(pipe: Option<&DuplexStream>) -> openssh::Stdio {
    if pipe.is_some() {
        openssh::Stdio::piped()
    } else {
        openssh::Stdio::null()
    }
}

#[async_trait::async_trait]
impl scp::Session for OpensshSession {
    fn stdin(&mut self) -> Result<RemoteWriter, SessionError> {
        self.check_stream_request(self.stdin_requested, "stdin")?;
        let (writer, pipe) = tokio::io::duplex(PIPE_CAPACITY);
        self.stdin = Some(pipe);
        self.stdin_requested = true;
        Ok(Box::new(writer))
    }

    fn stdout(&mut self) -> Result<RemoteReader, SessionError> {
        self.check_stream_request(self.stdout_requested, "stdout")?;
        let (reader, pipe) = tokio::io::duplex(PIPE_CAPACITY);
        self.stdout = Some(pipe);
        self.stdout_requested = true;
        Ok(Box::new(reader))
    }

    async fn start(&mut self, command: &str) -> Result<(), SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        self.started = true;
        let mut cmd = self.session.clone().arc_raw_command(command);
        cmd.stdin(stdio_for(self.stdin.as_ref()))
            .stdout(stdio_for(self.stdout.as_ref()))
            .stderr(openssh::Stdio::inherit());
        let mut child = cmd
            .spawn()
            .await
            .with_context(|| format!("Failed to spawn `{command}` on remote host"))?;
        if let Some(mut pipe) = self.stdin.take() {
            let mut remote = child
                .stdin()
                .take()
                .ok_or(SessionError::StreamUnavailable("stdin"))?;
            self.pumps.push(tokio::spawn(async move {
                match tokio::io::copy(&mut pipe, &mut remote).await {
                    Ok(bytes) => tracing::trace!("forwarded {bytes} bytes to remote stdin"),
                    Err(error) => tracing::debug!("remote stdin pump stopped: {error}"),
                }
                if let Err(error) = remote.shutdown().await {
                    tracing::debug!("failed closing remote stdin: {error}");
                }
            }));
        }
        if let Some(mut pipe) = self.stdout.take() {
            let mut remote = child
                .stdout()
                .take()
                .ok_or(SessionError::StreamUnavailable("stdout"))?;
            self.pumps.push(tokio::spawn(async move {
                match tokio::io::copy(&mut remote, &mut pipe).await {
                    Ok(bytes) => tracing::trace!("forwarded {bytes} bytes from remote stdout"),
                    Err(error) => tracing::debug!("remote stdout pump stopped: {error}"),
                }
            }));
        }
        self.child = Some(child);
        Ok(())
    }

    async fn wait(&mut self) -> Result<(), SessionError> {
        let child = self.child.take().ok_or(SessionError::NotStarted)?;
        let status = child
            .wait()
            .await
            .context("Failed waiting for remote command")?;
        tracing::debug!("remote command finished: {status}");
        if status.success() {
            return Ok(());
        }
        match status.code() {
            Some(code) => Err(SessionError::ExitStatus(code)),
            None => Err(SessionError::Killed),
        }
    }

    async fn close(self) {
        for pump in &self.pumps {
            pump.abort();
        }
        drop(self.child);
        match Arc::try_unwrap(self.session) {
            Ok(session) => {
                if let Err(error) = session.close().await {
                    tracing::warn!("failed closing SSH session: {error}");
                }
            }
            Err(_) => tracing::debug!("SSH session still shared, leaving it open"),
        }
    }
}
