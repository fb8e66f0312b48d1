//! SCP file transfers over an already established remote exec session.
//!
//! Two operations are provided, both driving a single-use [`Session`]:
//!
//! - [`push`] / [`push_path`]: start `scp -t <destination>` remotely and feed it one file using
//!   the sink side of the SCP protocol:
//!
//!   ```text
//!   C0644 1024 report.txt\n<1024 bytes>\0
//!   ```
//!
//!   followed by closing the remote stdin. Acknowledgement bytes from the sink are not read.
//!
//! - [`pull`]: start `cat <source>` remotely and copy its output into a local file, reporting
//!   progress as bytes arrive.
//!
//! In both cases the remote exit status is awaited concurrently with the byte copy, remote paths
//! are escaped for a POSIX shell, and the session is closed exactly once before the call
//! returns. See [`Error`] for how local and remote failures are reported.

pub mod command;
pub mod copy;
pub mod error;
pub mod header;
pub mod pull;
pub mod push;
pub mod session;
pub mod transfer;

pub use error::Error;
pub use pull::{PullRequest, pull};
pub use push::{PushRequest, push, push_path};
pub use session::{RemoteReader, RemoteWriter, Session, SessionError};
pub use transfer::{Settings, Summary};
