//! Process discovery: enumerating pids under the proc root and parsing
//! pids given on the command line.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

/// Scans the proc root for numeric directory names, ascending.
pub fn collect_pids(proc_root: &Path) -> Result<Vec<u32>, io::Error> {
    let mut out = Vec::new();
    for entry in fs::read_dir(proc_root)?.flatten() {
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(v) => v,
            None => continue,
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        match name.parse::<u32>() {
            Ok(pid) if pid > 0 => out.push(pid),
            _ => continue,
        }
    }
    out.sort_unstable();
    debug!("Found {} pids under {}", out.len(), proc_root.display());
    Ok(out)
}

/// Keeps positive integer arguments, silently dropping anything else.
pub fn parse_pid_args<S: AsRef<str>>(args: &[S]) -> Vec<u32> {
    args.iter()
        .filter_map(|arg| match arg.as_ref().trim().parse::<u32>() {
            Ok(pid) if pid > 0 => Some(pid),
            _ => {
                debug!("Ignoring pid argument {:?}", arg.as_ref());
                None
            }
        })
        .collect()
}
