// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;

/// Secure Boot key roles, in the order they must be generated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyRole {
    /// Platform Key, the root of trust.
    Pk,
    /// Key Exchange Key.
    Kek,
    /// Signature Database key.
    Db,
}

impl KeyRole {
    /// Get all roles in generation order. A role's signer always comes
    /// before it.
    pub fn all() -> [KeyRole; 3] {
        [KeyRole::Pk, KeyRole::Kek, KeyRole::Db]
    }

    /// Name used both as the file stem and as the UEFI variable name
    /// passed to the signer.
    pub fn name(&self) -> &'static str {
        match self {
            KeyRole::Pk => "PK",
            KeyRole::Kek => "KEK",
            KeyRole::Db => "DB",
        }
    }

    /// Role whose key and certificate sign this role's variable
    /// update. The PK is self-signed and also signs the KEK.
    pub fn signer(&self) -> KeyRole {
        match self {
            KeyRole::Pk | KeyRole::Kek => KeyRole::Pk,
            KeyRole::Db => KeyRole::Kek,
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
