//! Per-port log files for instance stdout/stderr
//!
//! Files are opened in append mode on every (re)start, so one file holds
//! every life of the instance on that port.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{HarnessError, HarnessResult};

pub fn log_path(dir: &Path, port: u16) -> PathBuf {
    dir.join(format!("server_{port}.log"))
}

/// Open (creating if needed) the sink for `port`
pub fn open(dir: &Path, port: u16) -> HarnessResult<(PathBuf, File)> {
    let path = log_path(dir, port);
    let sink_error = |source: std::io::Error| HarnessError::LogSinkError {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(sink_error)?;
    let file = OpenOptions::new().create(true).append(true).open(&path).map_err(sink_error)?;
    Ok((path, file))
}

/// Route the child's stdout and stderr into `file`; stdin is closed
pub fn attach(cmd: &mut Command, file: &File, path: &Path) -> HarnessResult<()> {
    let sink_error = |source: std::io::Error| HarnessError::LogSinkError {
        path: path.to_path_buf(),
        source,
    };
    let stdout = file.try_clone().map_err(sink_error)?;
    let stderr = file.try_clone().map_err(sink_error)?;

    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_log_path_naming() {
        assert_eq!(log_path(Path::new("/tmp/run"), 8002), PathBuf::from("/tmp/run/server_8002.log"));
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();

        let (path, mut first) = open(dir.path(), 8001).unwrap();
        writeln!(first, "first life").unwrap();
        drop(first);

        let (_, mut second) = open(dir.path(), 8001).unwrap();
        writeln!(second, "second life").unwrap();
        drop(second);

        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents, "first life\nsecond life\n");
    }

    #[test]
    fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("run-1");

        let (path, _) = open(&nested, 8003).unwrap();
        assert!(path.exists());
    }
}
