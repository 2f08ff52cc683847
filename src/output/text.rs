//! Plain text output: one path per line, a blank line after each group.
//!
//! This is the format `xargs`-style pipelines expect, so nothing else is
//! written to stdout.

use std::io::{self, Write};

use crate::duplicates::CandidateGroup;

/// Write one group followed by a blank line.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_group<W: Write>(writer: &mut W, group: &CandidateGroup) -> io::Result<()> {
    for path in &group.paths {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;
            writer.write_all(path.as_os_str().as_bytes())?;
            writer.write_all(b"\n")?;
        }
        #[cfg(not(unix))]
        writeln!(writer, "{}", path.display())?;
    }
    writeln!(writer)
}

/// Write every group in order.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_groups<W: Write>(writer: &mut W, groups: &[CandidateGroup]) -> io::Result<()> {
    for group in groups {
        write_group(writer, group)?;
    }
    writer.flush()
}
