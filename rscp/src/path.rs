use anyhow::Context;

const REMOTE_PATH_PATTERN: &str =
    r"^(?:(?P<user>[^@/]+)@)?(?P<host>(?:\[[^\]]+\]|[^:/\[\]]+))(?::(?P<port>\d+))?:(?P<path>.+)$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    session: remote::SshSession,
    path: String,
}

impl RemotePath {
    /// Relative paths are kept as-is and resolve against the remote login directory
    pub fn new(session: remote::SshSession, path: String) -> anyhow::Result<Self> {
        if path.is_empty() {
            return Err(anyhow::anyhow!(
                "Remote path on {} must not be empty",
                session.host
            ));
        }
        Ok(Self { session, path })
    }

    pub fn session(&self) -> &remote::SshSession {
        &self.session
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last component of the path, if there is one
    pub fn file_name(&self) -> Option<&str> {
        std::path::Path::new(&self.path)
            .file_name()
            .and_then(|name| name.to_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathType {
    Local(std::path::PathBuf),
    Remote(RemotePath),
}

/// Classify a command line path as local or `[user@]host[:port]:path`.
///
/// A `/` before the first `:` makes the argument local, so `./a:b` names a local file.
pub fn parse_path(path: &str) -> anyhow::Result<PathType> {
    let re = regex::Regex::new(REMOTE_PATH_PATTERN).context("Invalid remote path pattern")?;
    let Some(captures) = re.captures(path) else {
        return Ok(PathType::Local(path.into()));
    };
    let user = captures.name("user").map(|m| m.as_str().to_string());
    let host = captures
        .name("host")
        .map(|m| m.as_str().to_string())
        .with_context(|| format!("Unable to extract host from {path:?}"))?;
    let port = captures
        .name("port")
        .map(|m| m.as_str().parse::<u16>())
        .transpose()
        .with_context(|| format!("Invalid port in {path:?}"))?;
    let remote_path = captures
        .name("path")
        .map(|m| m.as_str().to_string())
        .with_context(|| format!("Unable to extract file system path from {path:?}"))?;
    Ok(PathType::Remote(RemotePath::new(
        remote::SshSession { user, host, port },
        remote_path,
    )?))
}

/// Validates that a destination doesn't end with `.` or `..`, which have no file name to create
pub fn validate_destination_path(dst_path_str: &str) -> anyhow::Result<()> {
    if dst_path_str == "." || dst_path_str.ends_with("/.") {
        return Err(anyhow::anyhow!(
            "Destination path cannot end with '.' (current directory).\n\
            If you want to copy into the current directory, use './' instead."
        ));
    }
    if dst_path_str == ".." || dst_path_str.ends_with("/..") {
        return Err(anyhow::anyhow!(
            "Destination path cannot end with '..' (parent directory).\n\
            If you want to copy into the parent directory, use '../' instead."
        ));
    }
    Ok(())
}

/// Local file a pull of `source` writes into.
///
/// A destination ending with '/' or naming an existing directory receives the file under the
/// source's base name: "host:/var/log/syslog -> logs/" becomes "logs/syslog".
pub fn resolve_local_destination(
    source: &RemotePath,
    dst_path_str: &str,
) -> anyhow::Result<std::path::PathBuf> {
    validate_destination_path(dst_path_str)?;
    let dst_path = std::path::Path::new(dst_path_str);
    if dst_path_str.ends_with('/') || dst_path.is_dir() {
        let file_name = source.file_name().ok_or_else(|| {
            anyhow::anyhow!("Source path {:?} does not have a basename", source.path())
        })?;
        return Ok(dst_path.join(file_name));
    }
    Ok(dst_path.to_path_buf())
}
