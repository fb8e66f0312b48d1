//! In-memory stand-in for a remote exec session.
//!
//! The "remote command" is a task spawned on `start`: it writes the configured stdout bytes,
//! drains stdin into the shared [`Record`] and then exits with the configured status.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use scp::{RemoteReader, RemoteWriter, Session, SessionError};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

const PIPE_CAPACITY: usize = 4096;

#[derive(Debug, Default)]
pub struct Record {
    pub command: Option<String>,
    pub stdin: Vec<u8>,
    pub waits: usize,
    pub closes: usize,
}

#[derive(Clone, Copy, Debug)]
pub enum Exit {
    Success,
    Status(i32),
    Killed,
}

pub struct FakeSession {
    record: Arc<Mutex<Record>>,
    stdout_data: Vec<u8>,
    exit: Exit,
    fail_start: bool,
    fail_stdin: bool,
    fail_stdout: bool,
    remote_stdin: Option<DuplexStream>,
    remote_stdout: Option<DuplexStream>,
    remote: Option<tokio::task::JoinHandle<bool>>,
}

impl FakeSession {
    pub fn new() -> (Self, Arc<Mutex<Record>>) {
        let record = Arc::new(Mutex::new(Record::default()));
        let session = Self {
            record: record.clone(),
            stdout_data: Vec::new(),
            exit: Exit::Success,
            fail_start: false,
            fail_stdin: false,
            fail_stdout: false,
            remote_stdin: None,
            remote_stdout: None,
            remote: None,
        };
        (session, record)
    }

    pub fn with_exit(mut self, exit: Exit) -> Self {
        self.exit = exit;
        self
    }

    pub fn with_stdout(mut self, data: Vec<u8>) -> Self {
        self.stdout_data = data;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn without_stdin(mut self) -> Self {
        self.fail_stdin = true;
        self
    }

    pub fn without_stdout(mut self) -> Self {
        self.fail_stdout = true;
        self
    }
}

#[async_trait::async_trait]
impl Session for FakeSession {
    fn stdin(&mut self) -> Result<RemoteWriter, SessionError> {
        if self.fail_stdin || self.remote_stdin.is_some() {
            return Err(SessionError::StreamUnavailable("stdin"));
        }
        let (local, remote) = tokio::io::duplex(PIPE_CAPACITY);
        self.remote_stdin = Some(remote);
        Ok(Box::new(local))
    }

    fn stdout(&mut self) -> Result<RemoteReader, SessionError> {
        if self.fail_stdout || self.remote_stdout.is_some() {
            return Err(SessionError::StreamUnavailable("stdout"));
        }
        let (local, remote) = tokio::io::duplex(PIPE_CAPACITY);
        self.remote_stdout = Some(remote);
        Ok(Box::new(local))
    }

    async fn start(&mut self, command: &str) -> Result<(), SessionError> {
        self.record.lock().unwrap().command = Some(command.to_string());
        if self.fail_start {
            return Err(anyhow::anyhow!("channel request rejected").into());
        }
        let stdin = self.remote_stdin.take();
        let stdout = self.remote_stdout.take();
        let data = self.stdout_data.clone();
        let record = self.record.clone();
        self.remote = Some(tokio::spawn(async move {
            let mut broken_pipe = false;
            if let Some(mut stdout) = stdout {
                broken_pipe = stdout.write_all(&data).await.is_err();
            }
            if let Some(mut stdin) = stdin {
                let mut received = Vec::new();
                let _ = stdin.read_to_end(&mut received).await;
                record.lock().unwrap().stdin = received;
            }
            broken_pipe
        }));
        Ok(())
    }

    async fn wait(&mut self) -> Result<(), SessionError> {
        self.record.lock().unwrap().waits += 1;
        let remote = self.remote.take().ok_or(SessionError::NotStarted)?;
        let broken_pipe = remote
            .await
            .map_err(|err| SessionError::from(anyhow::Error::from(err)))?;
        if broken_pipe {
            return Err(SessionError::ExitStatus(1));
        }
        match self.exit {
            Exit::Success => Ok(()),
            Exit::Status(code) => Err(SessionError::ExitStatus(code)),
            Exit::Killed => Err(SessionError::Killed),
        }
    }

    async fn close(self) {
        self.record.lock().unwrap().closes += 1;
    }
}

/// Reader that yields `prefix` and then fails
pub struct FailingReader {
    prefix: Vec<u8>,
}

impl FailingReader {
    pub fn new(prefix: &[u8]) -> Self {
        Self {
            prefix: prefix.to_vec(),
        }
    }
}

impl tokio::io::AsyncRead for FailingReader {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        if self.prefix.is_empty() {
            return std::task::Poll::Ready(Err(std::io::Error::other("source vanished")));
        }
        let n = self.prefix.len().min(buf.remaining());
        buf.put_slice(&self.prefix[..n]);
        self.prefix.drain(..n);
        std::task::Poll::Ready(Ok(()))
    }
}

/// Split `command` into words with a real shell
pub fn shell_words(command: &str) -> Vec<String> {
    let script = format!("for arg in {command}; do printf '%s\\0' \"$arg\"; done");
    let output = std::process::Command::new("sh")
        .arg("-c")
        .arg(&script)
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout)
        .unwrap()
        .split_terminator('\0')
        .map(str::to_string)
        .collect()
}
