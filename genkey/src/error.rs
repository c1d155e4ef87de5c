// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::key_role::KeyRole;
use camino::Utf8PathBuf;
use std::process::ExitStatus;
use std::{fmt, io};

/// One external-tool invocation in the key generation sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
    GenerateCert,
    ConvertToDer,
    BuildSigList,
    SignVar,
    GeneratePolicyKey,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Step::GenerateCert => "certificate generation",
            Step::ConvertToDer => "DER conversion",
            Step::BuildSigList => "signature list construction",
            Step::SignVar => "variable signing",
            Step::GeneratePolicyKey => "policy key generation",
        };
        f.write_str(s)
    }
}

/// Failures that abort key generation. None of these are retried.
#[derive(Debug)]
pub enum Error {
    CreateOutputDir {
        dir: Utf8PathBuf,
        source: io::Error,
    },

    /// The tool could not be started at all, e.g. it is not installed.
    ToolNotRun {
        role: Option<KeyRole>,
        step: Step,
        program: String,
        source: command_run::Error,
    },

    /// The tool ran and exited unsuccessfully.
    ToolFailed {
        role: Option<KeyRole>,
        step: Step,
        program: String,
        status: ExitStatus,
        /// Combined stdout and stderr of the tool.
        output: String,
    },
}

impl Error {
    /// Role being generated when the error occurred, if any.
    pub fn role(&self) -> Option<KeyRole> {
        match self {
            Error::CreateOutputDir { .. } => None,
            Error::ToolNotRun { role, .. } | Error::ToolFailed { role, .. } => *role,
        }
    }

    /// Step that failed. `None` if no tool was run.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::CreateOutputDir { .. } => None,
            Error::ToolNotRun { step, .. } | Error::ToolFailed { step, .. } => Some(*step),
        }
    }
}

fn write_context(f: &mut fmt::Formatter, role: Option<KeyRole>, step: Step) -> fmt::Result {
    match role {
        Some(role) => write!(f, "{role} {step} failed"),
        None => write!(f, "{step} failed"),
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::CreateOutputDir { dir, .. } => {
                write!(f, "failed to create output directory {dir}")
            }
            Error::ToolNotRun {
                role,
                step,
                program,
                ..
            } => {
                write_context(f, *role, *step)?;
                write!(f, ": could not run {program}")
            }
            Error::ToolFailed {
                role,
                step,
                program,
                status,
                output,
            } => {
                write_context(f, *role, *step)?;
                write!(f, ": {program} exited with {status}")?;
                let output = output.trim_end();
                if !output.is_empty() {
                    write!(f, ":\n{output}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::CreateOutputDir { source, .. } => Some(source),
            Error::ToolNotRun { source, .. } => Some(source),
            Error::ToolFailed { .. } => None,
        }
    }
}
