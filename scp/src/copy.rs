use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Which end of a copy failed
#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("read failed")]
    Read(#[source] std::io::Error),
    #[error("write failed")]
    Write(#[source] std::io::Error),
}

/// Copy `reader` into `writer` until end of stream, returning the number of bytes copied.
///
/// Unlike `tokio::io::copy` the failing side is reported, so that transfers can tell local
/// failures apart from remote ones.
pub async fn copy_bytes<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
) -> Result<u64, CopyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut copied = 0u64;
    loop {
        let read = match reader.read(&mut buffer).await {
            Ok(read) => read,
            Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(CopyError::Read(error)),
        };
        if read == 0 {
            return Ok(copied);
        }
        writer
            .write_all(&buffer[..read])
            .await
            .map_err(CopyError::Write)?;
        copied += read as u64;
    }
}
