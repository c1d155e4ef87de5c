// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::error::{Error, Step};
use crate::key_role::KeyRole;
use command_run::Command;
use log::debug;
use std::ffi::OsStr;

/// Run one external tool to completion.
///
/// Stdout and stderr are captured together so that a failure can be
/// reported with everything the tool printed. Success is judged by the
/// exit status only.
pub fn run_step<I, S>(role: Option<KeyRole>, step: Step, program: &str, args: I) -> Result<(), Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::with_args(program, args);
    cmd.enable_capture().combine_output().disable_check();

    let output = cmd.run().map_err(|source| Error::ToolNotRun {
        role,
        step,
        program: program.to_owned(),
        source,
    })?;

    let combined = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        return Err(Error::ToolFailed {
            role,
            step,
            program: program.to_owned(),
            status: output.status,
            output: combined,
        });
    }

    if !combined.trim().is_empty() {
        debug!("{program}: {}", combined.trim_end());
    }
    Ok(())
}
