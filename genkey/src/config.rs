// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use std::io;
use std::str::FromStr;

const DEFAULT_OUTPUT: &str = "keys/";
const DEFAULT_EXPIRATION_DAYS: u32 = 365;

/// Certificate validity window.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Expiration {
    /// Certificates expire this many days after generation.
    Days(u32),

    /// Don't pass a validity period; openssl's own default applies.
    ToolDefault,
}

impl Default for Expiration {
    fn default() -> Self {
        Expiration::Days(DEFAULT_EXPIRATION_DAYS)
    }
}

impl FromStr for Expiration {
    type Err = String;

    /// An empty string selects [`Expiration::ToolDefault`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Expiration::ToolDefault);
        }
        s.parse()
            .map(Expiration::Days)
            .map_err(|_| format!("invalid number of days: {s:?}"))
    }
}

/// Programs used for each external step.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Tools {
    /// Certificate, DER and RSA key generation.
    pub openssl: String,
    /// EFI signature list builder, from sbsigntools.
    pub sbsiglist: String,
    /// Authenticated variable signer, from sbsigntools.
    pub sbvarsign: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            openssl: "openssl".to_owned(),
            sbsiglist: "sbsiglist".to_owned(),
            sbvarsign: "sbvarsign".to_owned(),
        }
    }
}

/// `expiration_in_days` may be written as a number or as a string, so
/// that `""` can select the tool default.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
enum FileExpiration {
    Days(u32),
    Text(String),
}

/// Contents of `genkey.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    output: Option<Utf8PathBuf>,
    expiration_in_days: Option<FileExpiration>,
    #[serde(default)]
    tools: Tools,
}

/// Values given on the command line. These take precedence over the
/// config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub output: Option<Utf8PathBuf>,
    pub expiration: Option<Expiration>,
}

/// Settings for one key generation run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Directory that receives every generated file.
    pub output: Utf8PathBuf,
    pub expiration: Expiration,
    pub tools: Tools,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output: DEFAULT_OUTPUT.into(),
            expiration: Expiration::default(),
            tools: Tools::default(),
        }
    }
}

/// Path of the config file within the config directory.
pub fn config_path(config_dir: &Utf8Path) -> Utf8PathBuf {
    config_dir.join("genkey.toml")
}

impl Config {
    /// Load `genkey.toml` from `config_dir` and apply `overrides`. A
    /// missing file is the same as an empty one.
    pub fn load(config_dir: &Utf8Path, overrides: Overrides) -> Result<Config> {
        let path = config_path(config_dir);
        let src = match fs::read_to_string(&path) {
            Ok(src) => src,
            Err(err) if err.kind() == io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        Config::parse(&src, overrides).with_context(|| format!("invalid config file {path}"))
    }

    fn parse(src: &str, overrides: Overrides) -> Result<Config> {
        let file: FileConfig = toml::de::from_str(src)?;

        let file_expiration = match file.expiration_in_days {
            Some(FileExpiration::Days(days)) => Some(Expiration::Days(days)),
            Some(FileExpiration::Text(text)) => {
                Some(text.parse().map_err(anyhow::Error::msg)?)
            }
            None => None,
        };

        let defaults = Config::default();
        Ok(Config {
            output: overrides.output.or(file.output).unwrap_or(defaults.output),
            expiration: overrides
                .expiration
                .or(file_expiration)
                .unwrap_or(defaults.expiration),
            tools: file.tools,
        })
    }
}
