//! Pull: stream one remote file into a local file.

use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::instrument;

use crate::command;
use crate::copy::{self, CopyError};
use crate::error::Error;
use crate::session::Session;
use crate::transfer::{self, Settings, Summary};

#[derive(Debug, Clone)]
pub struct PullRequest {
    /// Only used to size the progress display
    pub expected_size: u64,
    pub remote_path: String,
    /// Created or truncated; parent directories must exist
    pub local_path: std::path::PathBuf,
}

/// Copy `remote_path` to `local_path`.
///
/// Runs `cat <remote_path>` rather than the SCP source protocol and copies its output through a
/// progress-reporting reader into the local file. The remote exit status is awaited
/// concurrently with the copy. The session is closed before returning.
#[instrument(skip(session, settings))]
pub async fn pull<S: Session>(
    mut session: S,
    request: &PullRequest,
    settings: &Settings,
) -> Result<Summary, Error> {
    let result = pull_on(&mut session, request, settings).await;
    session.close().await;
    result
}

async fn pull_on<S: Session>(
    session: &mut S,
    request: &PullRequest,
    settings: &Settings,
) -> Result<Summary, Error> {
    let stdout = session.stdout().map_err(|source| Error::Stream {
        stream: "stdout",
        source,
    })?;
    let progress = common::TransferProgress::new(request.expected_size, settings.progress.as_ref());
    let command = command::cat(&request.remote_path);
    tracing::debug!("starting remote command: {command}");
    session
        .start(&command)
        .await
        .map_err(|source| Error::Start {
            command: command.clone(),
            source,
        })?;
    progress.start();
    let (status, streamed) = tokio::join!(
        session.wait(),
        receive(
            progress.wrap(stdout),
            &request.local_path,
            settings.buffer_size
        ),
    );
    progress.finish();
    let bytes_copied = transfer::settle(&command, status, streamed)?;
    if bytes_copied != request.expected_size {
        tracing::warn!(
            "expected {} bytes from {:?} but received {}",
            request.expected_size,
            request.remote_path,
            bytes_copied
        );
    }
    tracing::info!(
        "pulled {bytes_copied} bytes into {:?}",
        request.local_path
    );
    Ok(Summary { bytes_copied })
}

async fn receive<R>(
    mut reader: R,
    local_path: &std::path::Path,
    buffer_size: usize,
) -> Result<u64, Error>
where
    R: AsyncRead + Unpin,
{
    let file = tokio::fs::File::create(local_path)
        .await
        .map_err(|err| Error::local_io(format!("failed creating {local_path:?}"), err))?;
    let mut writer = tokio::io::BufWriter::with_capacity(buffer_size.max(1), file);
    let copied = copy::copy_bytes(&mut reader, &mut writer, buffer_size)
        .await
        .map_err(|err| match err {
            CopyError::Read(err) => Error::remote_io("failed reading remote stdout", err),
            CopyError::Write(err) => Error::local_io(format!("failed writing {local_path:?}"), err),
        })?;
    writer
        .flush()
        .await
        .map_err(|err| Error::local_io(format!("failed flushing {local_path:?}"), err))?;
    Ok(copied)
}
