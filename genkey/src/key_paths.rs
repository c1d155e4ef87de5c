// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::error::Error;
use crate::key_role::KeyRole;
use camino::{Utf8Path, Utf8PathBuf};

/// Paths of all the files written into the output directory.
///
/// The names follow the `<ROLE>.<ext>` convention expected by
/// provisioning tools, so they must not change.
#[derive(Debug)]
pub struct KeyPaths {
    dir: Utf8PathBuf,
}

impl KeyPaths {
    pub fn new(dir: Utf8PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Create the directory and any missing parents. New directories
    /// are only accessible by the owner.
    pub fn create_dir(&self) -> Result<(), Error> {
        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(&self.dir)
            .map_err(|source| Error::CreateOutputDir {
                dir: self.dir.clone(),
                source,
            })
    }

    fn role_file(&self, role: KeyRole, ext: &str) -> Utf8PathBuf {
        self.dir.join(format!("{}.{ext}", role.name()))
    }

    /// PEM private key.
    pub fn key(&self, role: KeyRole) -> Utf8PathBuf {
        self.role_file(role, "key")
    }

    /// PEM self-signed certificate.
    pub fn pem(&self, role: KeyRole) -> Utf8PathBuf {
        self.role_file(role, "pem")
    }

    /// DER certificate.
    pub fn der(&self, role: KeyRole) -> Utf8PathBuf {
        self.role_file(role, "der")
    }

    /// EFI signature list.
    pub fn esl(&self, role: KeyRole) -> Utf8PathBuf {
        self.role_file(role, "esl")
    }

    /// Signed authenticated variable update.
    pub fn auth(&self, role: KeyRole) -> Utf8PathBuf {
        self.role_file(role, "auth")
    }

    /// RSA key used for TPM PCR policy encryption. Not part of the
    /// signing chain.
    pub fn tpm_policy_key(&self) -> Utf8PathBuf {
        self.dir.join("tpm2-pcr-private.pem")
    }

    /// Every file a successful run produces.
    pub fn all_files(&self) -> Vec<Utf8PathBuf> {
        let mut files = Vec::new();
        for role in KeyRole::all() {
            files.push(self.key(role));
            files.push(self.pem(role));
            files.push(self.der(role));
            files.push(self.esl(role));
            files.push(self.auth(role));
        }
        files.push(self.tpm_policy_key());
        files
    }
}
