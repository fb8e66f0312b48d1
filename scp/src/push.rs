//! Push: send one file to a remote SCP sink.

use std::os::unix::fs::PermissionsExt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::instrument;

use crate::command;
use crate::copy::{self, CopyError};
use crate::error::Error;
use crate::header::{ControlLine, MODE_MASK};
use crate::session::Session;
use crate::transfer::{self, Settings, Summary};

/// A file to send, as described to the remote sink
pub struct PushRequest<R> {
    /// Number of bytes `contents` yields
    pub size: u64,
    /// POSIX permission bits
    pub mode: u32,
    /// Base name of the file created inside `destination`
    pub file_name: String,
    pub contents: R,
    /// Remote path handed to `scp -t`
    pub destination: String,
}

impl<R> std::fmt::Debug for PushRequest<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushRequest")
            .field("size", &self.size)
            .field("mode", &format_args!("{:o}", self.mode))
            .field("file_name", &self.file_name)
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}

/// Copy `request.contents` to `destination/file_name` on the remote side.
///
/// Starts `scp -t <destination>`, writes the control line, the file bytes and the terminating
/// NUL onto the remote stdin and closes it. Remote acknowledgements are not read: a rejected
/// transfer shows up as the remote command's exit status, which is awaited concurrently with
/// the streaming. The session is closed before returning.
#[instrument(skip_all, fields(destination = %request.destination, file_name = %request.file_name, size = request.size))]
pub async fn push<S, R>(
    mut session: S,
    request: PushRequest<R>,
    settings: &Settings,
) -> Result<Summary, Error>
where
    S: Session,
    R: AsyncRead + Unpin + Send,
{
    let result = push_on(&mut session, request, settings).await;
    session.close().await;
    result
}

/// Push a local file, taking size, permission bits and base name from the file itself
#[instrument(skip(session, settings))]
pub async fn push_path<S: Session>(
    session: S,
    local_path: &std::path::Path,
    destination: &str,
    settings: &Settings,
) -> Result<Summary, Error> {
    let request = match open_local(local_path, destination).await {
        Ok(request) => request,
        Err(error) => {
            session.close().await;
            return Err(error);
        }
    };
    push(session, request, settings).await
}

async fn open_local(
    local_path: &std::path::Path,
    destination: &str,
) -> Result<PushRequest<tokio::fs::File>, Error> {
    let file_name = local_path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::InvalidFileName(local_path.to_string_lossy().into_owned()))?
        .to_string();
    let file = tokio::fs::File::open(local_path)
        .await
        .map_err(|err| Error::local_io(format!("failed opening {local_path:?}"), err))?;
    let metadata = file
        .metadata()
        .await
        .map_err(|err| Error::local_io(format!("failed reading metadata of {local_path:?}"), err))?;
    if !metadata.is_file() {
        return Err(Error::local_io(
            format!("cannot push {local_path:?}"),
            std::io::Error::other("not a regular file"),
        ));
    }
    Ok(PushRequest {
        size: metadata.len(),
        mode: metadata.permissions().mode() & MODE_MASK,
        file_name,
        contents: file,
        destination: destination.to_string(),
    })
}

async fn push_on<S, R>(
    session: &mut S,
    request: PushRequest<R>,
    settings: &Settings,
) -> Result<Summary, Error>
where
    S: Session,
    R: AsyncRead + Unpin + Send,
{
    let header = ControlLine::new(request.mode, request.size, &request.file_name)?;
    let mut stdin = session.stdin().map_err(|source| Error::Stream {
        stream: "stdin",
        source,
    })?;
    let command = command::sink(&request.destination);
    tracing::debug!("starting remote command: {command}");
    if let Err(source) = session.start(&command).await {
        if let Err(error) = stdin.shutdown().await {
            tracing::debug!("failed closing remote stdin: {error}");
        }
        return Err(Error::Start { command, source });
    }
    let (status, streamed) = tokio::join!(
        session.wait(),
        send(stdin, &header, request.contents, settings.buffer_size),
    );
    let bytes_copied = transfer::settle(&command, status, streamed)?;
    if bytes_copied != request.size {
        tracing::warn!(
            "announced {} bytes for {:?} but the source yielded {}",
            request.size,
            request.file_name,
            bytes_copied
        );
    }
    tracing::info!("pushed {bytes_copied} bytes to {}", request.destination);
    Ok(Summary { bytes_copied })
}

/// Control line, at most `header.size()` bytes of `contents`, NUL, end of stream
async fn send<W, R>(
    mut stdin: W,
    header: &ControlLine<'_>,
    contents: R,
    buffer_size: usize,
) -> Result<u64, Error>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let to_remote = |err| Error::remote_io("failed writing to remote stdin", err);
    stdin
        .write_all(header.to_string().as_bytes())
        .await
        .map_err(to_remote)?;
    let mut contents = contents.take(header.size());
    let copied = copy::copy_bytes(&mut contents, &mut stdin, buffer_size)
        .await
        .map_err(|err| match err {
            CopyError::Read(err) => Error::local_io("failed reading file contents", err),
            CopyError::Write(err) => to_remote(err),
        })?;
    stdin.write_all(&[0]).await.map_err(to_remote)?;
    stdin.shutdown().await.map_err(to_remote)?;
    Ok(copied)
}
