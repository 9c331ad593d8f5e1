//! Process table lookup via procfs.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs;
use std::path::Path;

/// The kernel truncates `comm` to `TASK_COMM_LEN - 1` bytes.
const COMM_MAX_LEN: usize = 15;

/// Whether any process under `proc_root` has the command name `name`.
///
/// Processes can exit while the table is being walked, so entries that
/// disappear or can't be read are ignored.
pub(crate) fn is_running(proc_root: &Path, name: &str) -> Result<bool> {
    let wanted = &name.as_bytes()[..name.len().min(COMM_MAX_LEN)];
    let entries = fs::read_dir(proc_root).or_raise(|| ErrorKind::Io)?;
    for entry in entries.flatten() {
        let file_name = entry.file_name();
        if !file_name.as_encoded_bytes().iter().all(u8::is_ascii_digit) {
            continue;
        }
        let Ok(comm) = fs::read(entry.path().join("comm")) else {
            continue;
        };
        if comm.strip_suffix(b"\n").unwrap_or(&comm) == wanted {
            tracing::trace!(pid = %file_name.to_string_lossy(), name, "Found running process");
            return Ok(true);
        }
    }
    Ok(false)
}
