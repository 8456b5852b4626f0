//! Table output for collected rows.
//!
//! Rows are built by joining the sorted rollups with the owner and command
//! line maps on pid. Rendering pads each column to its widest cell and cuts
//! the command column to what is left of the terminal width.

use std::fs::File;
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;

use ahash::AHashMap as HashMap;

use crate::process::{MemoryRollup, ProcessOwner};

const HEADERS: [&str; 6] = ["PID", "User", "USS", "PSS", "RSS", "Command"];
const DEFAULT_TERMINAL_WIDTH: usize = 80;
const MIN_COMMAND_WIDTH: usize = 7;

/// One output line. Sizes are in KiB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub pid: u32,
    pub user: String,
    pub uss: u64,
    pub pss: u64,
    pub rss: u64,
    pub command: String,
}

#[derive(Debug, Clone, Copy)]
pub struct TableOptions {
    pub wide: bool,
    pub human_readable: bool,
    pub width: usize,
}

/// Joins sorted rollups with their owner and command line.
///
/// A pid whose owner could not be read shows its own number in the user
/// column; an unresolved user name shows the numeric uid.
pub fn merge_rows(
    rollups: &[MemoryRollup],
    owners: &HashMap<u32, ProcessOwner>,
    cmdlines: &HashMap<u32, String>,
) -> Vec<Row> {
    rollups
        .iter()
        .map(|rollup| Row {
            pid: rollup.pid,
            user: owners
                .get(&rollup.pid)
                .map(ProcessOwner::display_name)
                .unwrap_or_else(|| rollup.pid.to_string()),
            uss: rollup.uss(),
            pss: rollup.pss(),
            rss: rollup.rss(),
            command: cmdlines.get(&rollup.pid).cloned().unwrap_or_default(),
        })
        .collect()
}

/// Formats a KiB value, optionally with IEC units (`8.2 MiB`, `82 MiB`).
pub fn format_kib(kib: u64, human_readable: bool) -> String {
    if !human_readable {
        return kib.to_string();
    }

    const UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];
    let bytes = kib.saturating_mul(1024);
    if bytes < 10 {
        return format!("{} B", bytes);
    }

    let mut exp = 0;
    let mut scaled = bytes as f64;
    while scaled >= 1024.0 && exp < UNITS.len() - 1 {
        scaled /= 1024.0;
        exp += 1;
    }

    let rounded = (scaled * 10.0 + 0.5).floor() / 10.0;
    if rounded < 10.0 {
        format!("{:.1} {}", rounded, UNITS[exp])
    } else {
        format!("{:.0} {}", rounded, UNITS[exp])
    }
}

fn fd_width(fd: libc::c_int) -> Option<usize> {
    // SAFETY: winsize is plain old data and TIOCGWINSZ only writes into it.
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };
    (rc == 0 && ws.ws_col > 0).then_some(ws.ws_col as usize)
}

/// Best guess at the terminal width: stdout, stderr, stdin, the
/// controlling tty, `$COLUMNS`, then 80.
pub fn terminal_width() -> usize {
    [libc::STDOUT_FILENO, libc::STDERR_FILENO, libc::STDIN_FILENO]
        .into_iter()
        .find_map(fd_width)
        .or_else(|| {
            File::open("/dev/tty")
                .ok()
                .and_then(|tty| fd_width(tty.as_raw_fd()))
        })
        .or_else(|| {
            std::env::var("COLUMNS")
                .ok()
                .and_then(|c| c.trim().parse().ok())
                .filter(|&c: &usize| c > 0)
        })
        .unwrap_or(DEFAULT_TERMINAL_WIDTH)
}

/// Writes the header and rows as an aligned, borderless table.
pub fn render_table<W: Write>(out: &mut W, rows: &[Row], opts: &TableOptions) -> io::Result<()> {
    let cells: Vec<[String; 5]> = rows
        .iter()
        .map(|row| {
            [
                row.pid.to_string(),
                row.user.clone(),
                format_kib(row.uss, opts.human_readable),
                format_kib(row.pss, opts.human_readable),
                format_kib(row.rss, opts.human_readable),
            ]
        })
        .collect();

    let mut widths: [usize; 5] = std::array::from_fn(|i| HEADERS[i].len());
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    // One space of padding on both sides of each column, none after the last.
    let spacing = HEADERS.len() * 2 - 1;
    let others: usize = spacing + widths.iter().sum::<usize>();
    let mut wide = opts.wide;
    let mut command_width = opts.width.saturating_sub(others);
    if command_width < MIN_COMMAND_WIDTH {
        command_width = MIN_COMMAND_WIDTH;
        wide = true;
    }

    let commands: Vec<String> = rows
        .iter()
        .map(|row| {
            if !wide && row.command.chars().count() > command_width {
                row.command.chars().take(command_width).collect()
            } else {
                row.command.clone()
            }
        })
        .collect();

    let header: [String; 5] = std::array::from_fn(|i| HEADERS[i].to_string());
    write_line(out, &header, HEADERS[5], &widths)?;
    for (line, command) in cells.iter().zip(commands.iter()) {
        write_line(out, line, command, &widths)?;
    }
    Ok(())
}

fn write_line<W: Write>(
    out: &mut W,
    cells: &[String; 5],
    command: &str,
    widths: &[usize; 5],
) -> io::Result<()> {
    let [pid, user, uss, pss, rss] = cells;
    let line = format!(
        " {:>pw$}  {:<uw$}  {:>sw$}  {:>ps$}  {:>rw$}  {}",
        pid,
        user,
        uss,
        pss,
        rss,
        command,
        pw = widths[0],
        uw = widths[1],
        sw = widths[2],
        ps = widths[3],
        rw = widths[4],
    );
    writeln!(out, "{}", line.trim_end())
}
