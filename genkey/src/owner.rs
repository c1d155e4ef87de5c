// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use uuid::Uuid;

/// Get the signature owner GUID for `name`.
///
/// This is a version 5 UUID in the DNS namespace, so the same name
/// always produces the same owner on every platform.
pub fn owner_guid(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}
