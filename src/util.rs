// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::{Context, Result};
use std::io::BufRead;

/// Block until a line is read from `input`.
pub fn wait_for_line<R: BufRead>(input: R) -> Result<()> {
    let _ = input
        .lines()
        .next()
        .context("Stdin closed before a line was read")?
        .context("Failed to get a line from Stdin")?;

    Ok(())
}

/// Startup hook for attaching a debugger: report our pid and wait for the
/// user to press enter once the debugger is attached.
pub fn wait_for_debugger() -> Result<()> {
    eprintln!(
        "Waiting for debugger to attach to pid {}, press enter to continue",
        std::process::id()
    );
    wait_for_line(std::io::stdin().lock())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_wait_for_line() -> Result<()> {
        wait_for_line(Cursor::new("\n"))
    }

    #[test]
    fn test_wait_for_line_eof() {
        assert!(wait_for_line(Cursor::new("")).is_err());
    }
}
