//! Remote command lines used by the transfers.

use std::borrow::Cow;

/// Escape `arg` so that a POSIX shell parses it back as a single literal word
#[must_use]
pub fn quote(arg: &str) -> Cow<'_, str> {
    shell_escape::unix::escape(Cow::Borrowed(arg))
}

/// `scp -t <destination>`: run SCP in sink (receive) mode targeting `destination`
#[must_use]
pub fn sink(destination: &str) -> String {
    format!("scp -t {}", quote(destination))
}

/// `cat <source>`: stream a remote file to stdout
#[must_use]
pub fn cat(source: &str) -> String {
    format!("cat {}", quote(source))
}
