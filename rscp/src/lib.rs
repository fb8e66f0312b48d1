//! `rscp` - push and pull single files over SSH.
//!
//! ```bash
//! # Send a file into a remote directory
//! rscp push ./report.pdf user@host:/srv/reports
//!
//! # Fetch a remote file, showing progress
//! rscp pull host:2222:/var/log/big.log ./logs/ --progress
//! ```
//!
//! Pushing runs `scp -t` on the remote host and speaks the sink side of the SCP protocol to it;
//! pulling streams `cat` output. Both use a single OpenSSH connection per transfer, so
//! authentication, host keys and `~/.ssh/config` are handled by the system `ssh`.

pub mod path;
