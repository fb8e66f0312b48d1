//! The `C<mode> <size> <name>` control line announcing a file to an SCP sink.

use crate::error::Error;

/// Permission bits (including setuid, setgid and sticky) carried in a control line
pub const MODE_MASK: u32 = 0o7777;

/// Render `mode` as unsigned octal with a leading zero (`0644`); zero renders as `0`
#[must_use]
pub fn octal_mode(mode: u32) -> String {
    match mode & MODE_MASK {
        0 => "0".to_string(),
        bits => format!("0{bits:o}"),
    }
}

fn validate_file_name(file_name: &str) -> Result<(), Error> {
    if file_name.is_empty() || file_name.contains(['/', '\n']) {
        return Err(Error::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlLine<'a> {
    mode: u32,
    size: u64,
    file_name: &'a str,
}

impl<'a> ControlLine<'a> {
    /// `file_name` is interpreted by the sink as a single entry in its target directory, so
    /// it must be a bare base name.
    pub fn new(mode: u32, size: u64, file_name: &'a str) -> Result<Self, Error> {
        validate_file_name(file_name)?;
        Ok(Self {
            mode,
            size,
            file_name,
        })
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl std::fmt::Display for ControlLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "C{} {} {}",
            octal_mode(self.mode),
            self.size,
            self.file_name
        )
    }
}
