//! Command line reading from `/proc/<pid>/cmdline`.

use std::fs;
use std::path::Path;

use crate::error::CollectError;
use crate::process::DataSource;

pub const CMDLINE_FILE: &str = "cmdline";

/// Reads the argv block of a process as one space-separated string.
pub fn read_cmdline(proc_root: &Path, pid: u32) -> Result<String, CollectError> {
    let path = proc_root.join(pid.to_string()).join(CMDLINE_FILE);
    let raw = fs::read(&path).map_err(|e| CollectError::from_io(pid, path, e))?;
    decode_cmdline(pid, &raw)
}

/// Strips NUL padding at both ends and joins the remaining arguments with
/// spaces. An empty result is indistinguishable from an unreadable one.
pub fn decode_cmdline(pid: u32, raw: &[u8]) -> Result<String, CollectError> {
    let start = raw.iter().position(|&b| b != 0).unwrap_or(raw.len());
    let end = raw.iter().rposition(|&b| b != 0).map_or(start, |i| i + 1);
    let trimmed = &raw[start..end];

    if trimmed.is_empty() {
        return Err(CollectError::EmptyResult {
            pid,
            source_name: DataSource::CommandLine,
        });
    }

    let joined: Vec<u8> = trimmed
        .iter()
        .map(|&b| if b == 0 { b' ' } else { b })
        .collect();
    Ok(String::from_utf8_lossy(&joined).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_decode_cmdline_joins_arguments() {
        let raw = b"/usr/bin/python3\0-m\0http.server\08080\0";
        assert_eq!(
            decode_cmdline(1, raw).unwrap(),
            "/usr/bin/python3 -m http.server 8080"
        );
    }

    #[test]
    fn test_decode_cmdline_strips_padding_on_both_ends() {
        assert_eq!(decode_cmdline(1, b"\0\0sshd\0\0").unwrap(), "sshd");
        // Interior empty arguments keep one space each
        assert_eq!(decode_cmdline(1, b"a\0\0b").unwrap(), "a  b");
    }

    #[test]
    fn test_decode_cmdline_empty_is_error() {
        assert!(matches!(
            decode_cmdline(5, b""),
            Err(CollectError::EmptyResult { pid: 5, .. })
        ));
        assert!(matches!(
            decode_cmdline(5, b"\0\0\0"),
            Err(CollectError::EmptyResult { pid: 5, .. })
        ));
    }

    #[test]
    fn test_read_cmdline() {
        let dir = tempdir().expect("Failed to create temp dir");
        let pid_dir = dir.path().join("12");
        fs::create_dir(&pid_dir).unwrap();
        fs::write(pid_dir.join(CMDLINE_FILE), b"nginx: worker process\0").unwrap();

        assert_eq!(read_cmdline(dir.path(), 12).unwrap(), "nginx: worker process");
        assert!(matches!(
            read_cmdline(dir.path(), 13),
            Err(CollectError::NotAccessible { pid: 13 })
        ));
    }
}
