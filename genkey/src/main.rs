// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod config;
mod error;
mod key_paths;
mod key_role;
mod owner;
mod secure_boot;
mod tool;

use anyhow::Result;
use argh::FromArgs;
use camino::Utf8PathBuf;
use config::{Config, Expiration, Overrides};
use error::Error;
use log::{debug, error, info, LevelFilter};
use simple_logger::SimpleLogger;
use std::process;

/// Generate secure boot keys under the UUID generated by NAME.
#[derive(FromArgs, PartialEq, Debug)]
struct Opt {
    /// name used as the certificate subject and to derive the
    /// signature owner GUID
    #[argh(positional)]
    name: String,

    /// output directory for the keys (default: keys/)
    #[argh(option, short = 'o')]
    output: Option<Utf8PathBuf>,

    /// in how many days from today should the certificates expire
    /// (default: 365, or empty to use the openssl default)
    #[argh(option, short = 'e')]
    expiration_in_days: Option<Expiration>,

    /// directory containing an optional genkey.toml config file
    #[argh(option, default = "Utf8PathBuf::from(\".\")")]
    config_dir: Utf8PathBuf,

    /// enable debug logging
    #[argh(switch)]
    debug: bool,
}

impl Opt {
    fn overrides(&self) -> Overrides {
        Overrides {
            output: self.output.clone(),
            expiration: self.expiration_in_days,
        }
    }

    fn log_level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

fn run(opt: &Opt) -> Result<()> {
    let conf = Config::load(&opt.config_dir, opt.overrides())?;

    let paths = secure_boot::generate_keys(&opt.name, &conf)?;
    for file in paths.all_files() {
        debug!("wrote {file}");
    }
    info!("all keys written to {}", paths.dir());

    Ok(())
}

/// Lines to report for a failed run. Tool failures also say where the
/// run stopped, since files from earlier steps are left in place.
fn failure_report(err: &anyhow::Error) -> Vec<String> {
    let mut lines = vec![format!("{err:#}")];
    if let Some(err) = err.downcast_ref::<Error>() {
        if let Some(step) = err.step() {
            let at = match err.role() {
                Some(role) => format!("{role} {step}"),
                None => step.to_string(),
            };
            lines.push(format!(
                "stopped at {at}; files from earlier steps were left in place"
            ));
        }
    }
    lines
}

fn main() {
    // Argument errors print usage and exit here. Anything after this
    // point is an operational error.
    let opt: Opt = argh::from_env();

    // If no logger could be installed, errors still go to stderr.
    let have_logger = SimpleLogger::new()
        .with_level(opt.log_level())
        .init()
        .is_ok();

    if let Err(err) = run(&opt) {
        for line in failure_report(&err) {
            if have_logger {
                error!("{line}");
            } else {
                eprintln!("{line}");
            }
        }
        process::exit(1);
    }
}
