// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::config::{Config, Expiration, Tools};
use crate::error::{Error, Step};
use crate::key_paths::KeyPaths;
use crate::key_role::KeyRole;
use crate::owner::owner_guid;
use crate::tool::run_step;
use log::info;
use uuid::Uuid;

/// Attributes of the authenticated Secure Boot variables.
const VAR_ATTRS: &str =
    "NON_VOLATILE,RUNTIME_ACCESS,BOOTSERVICE_ACCESS,TIME_BASED_AUTHENTICATED_WRITE_ACCESS";

/// Generate the PK, KEK and DB keys for `name` along with their signed
/// variable updates, then the TPM policy key.
///
/// Steps run strictly in order and the first failure aborts the run.
/// Files written before the failure are left in place.
pub fn generate_keys(name: &str, conf: &Config) -> Result<KeyPaths, Error> {
    let paths = KeyPaths::new(conf.output.clone());
    paths.create_dir()?;

    let owner = owner_guid(name);
    info!("using owner GUID {owner} for {name}");

    for role in KeyRole::all() {
        generate_role(&paths, &conf.tools, role, name, conf.expiration, owner)?;
    }

    info!("Generating policy encryption key");
    generate_policy_key(&paths, &conf.tools)?;
    info!("policy encryption key generated at {}", paths.tpm_policy_key());

    Ok(paths)
}

fn generate_role(
    paths: &KeyPaths,
    tools: &Tools,
    role: KeyRole,
    name: &str,
    expiration: Expiration,
    owner: Uuid,
) -> Result<(), Error> {
    info!("Generating {role}");
    generate_cert(paths, tools, role, name, expiration)?;
    info!("{role} generated at {} and {}", paths.key(role), paths.pem(role));

    info!("Converting {role}.pem to DER");
    convert_pem_to_der(paths, tools, role)?;
    info!("{role} generated at {}", paths.der(role));

    info!("Generating {role}.esl");
    generate_sig_list(paths, tools, role, owner)?;
    info!("{role} generated at {}", paths.esl(role));

    info!("Signing {role} with {}", role.signer());
    sign_var(paths, tools, role)?;
    info!("{role} generated at {}", paths.auth(role));

    Ok(())
}

fn generate_cert(
    paths: &KeyPaths,
    tools: &Tools,
    role: KeyRole,
    name: &str,
    expiration: Expiration,
) -> Result<(), Error> {
    let subject = format!("/CN={name}/");
    let key = paths.key(role);
    let pem = paths.pem(role);

    #[rustfmt::skip]
    let mut args = vec![
        "req",
        // Don't encrypt the key. This avoids needing to set a password.
        "-nodes",
        "-x509",
        "-subj", subject.as_str(),
        "-keyout", key.as_str(),
        "-out", pem.as_str(),
    ];
    // Without `-days`, openssl picks its own validity period.
    let days = match expiration {
        Expiration::Days(n) => Some(n.to_string()),
        Expiration::ToolDefault => None,
    };
    if let Some(days) = &days {
        args.extend(["-days", days.as_str()]);
    }

    run_step(Some(role), Step::GenerateCert, &tools.openssl, args)
}

fn convert_pem_to_der(paths: &KeyPaths, tools: &Tools, role: KeyRole) -> Result<(), Error> {
    #[rustfmt::skip]
    run_step(Some(role), Step::ConvertToDer, &tools.openssl, [
        "x509",
        "-outform", "DER",
        "-in", paths.pem(role).as_str(),
        "-out", paths.der(role).as_str(),
    ])?;

    Ok(())
}

fn generate_sig_list(
    paths: &KeyPaths,
    tools: &Tools,
    role: KeyRole,
    owner: Uuid,
) -> Result<(), Error> {
    #[rustfmt::skip]
    run_step(Some(role), Step::BuildSigList, &tools.sbsiglist, [
        "--owner", owner.to_string().as_str(),
        "--type", "x509",
        "--output", paths.esl(role).as_str(),
        paths.der(role).as_str(),
    ])?;

    Ok(())
}

/// Sign the role's signature list with its signer's key, producing a
/// time-based authenticated variable update.
fn sign_var(paths: &KeyPaths, tools: &Tools, role: KeyRole) -> Result<(), Error> {
    let signer = role.signer();

    #[rustfmt::skip]
    run_step(Some(role), Step::SignVar, &tools.sbvarsign, [
        "--attr", VAR_ATTRS,
        "--key", paths.key(signer).as_str(),
        "--cert", paths.pem(signer).as_str(),
        "--output", paths.auth(role).as_str(),
        // The var name is used to pick the vendor GUID
        // (EFI_GLOBAL_VARIABLE for PK/KEK, or
        // EFI_IMAGE_SECURITY_DATABASE_GUID for db).
        role.name(),
        paths.esl(role).as_str(),
    ])?;

    Ok(())
}

fn generate_policy_key(paths: &KeyPaths, tools: &Tools) -> Result<(), Error> {
    run_step(
        None,
        Step::GeneratePolicyKey,
        &tools.openssl,
        ["genrsa", "-out", paths.tpm_policy_key().as_str(), "2048"],
    )
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use camino::{Utf8Path, Utf8PathBuf};
    use fs_err as fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Temporary directory holding fake tools, their shared call log,
    /// and the key output directory.
    struct FakeEnv {
        _tmp_dir: TempDir,
        root: Utf8PathBuf,
    }

    impl FakeEnv {
        fn new() -> Self {
            let tmp_dir = TempDir::new().unwrap();
            let root = Utf8Path::from_path(tmp_dir.path()).unwrap().to_path_buf();
            Self {
                _tmp_dir: tmp_dir,
                root,
            }
        }

        fn log_path(&self) -> Utf8PathBuf {
            self.root.join("calls.log")
        }

        fn output(&self) -> Utf8PathBuf {
            self.root.join("keys")
        }

        fn write_script(&self, name: &str, body: &str) -> String {
            let path = self.root.join(name);
            let script = format!(
                "#!/bin/sh\necho \"{name} $*\" >> '{}'\n{body}",
                self.log_path()
            );
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.into_string()
        }

        /// A tool that succeeds and creates every file named after
        /// `-out`, `-keyout` or `--output`.
        fn ok_tool(&self, name: &str) -> String {
            self.write_script(
                name,
                r#"prev=
for arg in "$@"; do
    case "$prev" in
        -out|-keyout|--output) echo fake > "$arg" ;;
    esac
    prev=$arg
done
"#,
            )
        }

        fn failing_tool(&self, name: &str) -> String {
            self.write_script(name, "echo \"simulated failure\" >&2\nexit 1\n")
        }

        fn config(&self, tools: Tools) -> Config {
            Config {
                output: self.output(),
                expiration: Expiration::Days(30),
                tools,
            }
        }

        fn fake_tools(&self) -> Tools {
            Tools {
                openssl: self.ok_tool("openssl"),
                sbsiglist: self.ok_tool("sbsiglist"),
                sbvarsign: self.ok_tool("sbvarsign"),
            }
        }

        fn calls(&self) -> Vec<String> {
            match fs::read_to_string(self.log_path()) {
                Ok(log) => log.lines().map(|s| s.to_owned()).collect(),
                Err(_) => Vec::new(),
            }
        }

        fn output_files(&self) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(self.output())
                .unwrap()
                .map(|entry| entry.unwrap().file_name().into_string().unwrap())
                .collect();
            names.sort();
            names
        }
    }

    #[test]
    fn test_generate_keys() {
        let env = FakeEnv::new();
        let conf = env.config(env.fake_tools());

        let paths = generate_keys("acme-corp", &conf).unwrap();
        assert_eq!(paths.dir(), env.output().as_path());

        let mut expected: Vec<String> = paths
            .all_files()
            .iter()
            .map(|p| p.file_name().unwrap().to_owned())
            .collect();
        expected.sort();
        assert_eq!(env.output_files(), expected);
        assert_eq!(expected.len(), 16);

        let out = env.output();
        let owner = owner_guid("acme-corp");
        let attrs = VAR_ATTRS;
        let mut expected_calls = Vec::new();
        for (role, signer) in [("PK", "PK"), ("KEK", "PK"), ("DB", "KEK")] {
            expected_calls.extend([
                format!(
                    "openssl req -nodes -x509 -subj /CN=acme-corp/ \
                     -keyout {out}/{role}.key -out {out}/{role}.pem -days 30"
                ),
                format!("openssl x509 -outform DER -in {out}/{role}.pem -out {out}/{role}.der"),
                format!(
                    "sbsiglist --owner {owner} --type x509 \
                     --output {out}/{role}.esl {out}/{role}.der"
                ),
                format!(
                    "sbvarsign --attr {attrs} --key {out}/{signer}.key \
                     --cert {out}/{signer}.pem --output {out}/{role}.auth \
                     {role} {out}/{role}.esl"
                ),
            ]);
        }
        expected_calls.push(format!("openssl genrsa -out {out}/tpm2-pcr-private.pem 2048"));
        assert_eq!(env.calls(), expected_calls);
    }

    #[test]
    fn test_tool_default_expiration() {
        let env = FakeEnv::new();
        let mut conf = env.config(env.fake_tools());
        conf.expiration = Expiration::ToolDefault;

        generate_keys("acme-corp", &conf).unwrap();

        let calls = env.calls();
        let cert_calls: Vec<_> = calls.iter().filter(|c| c.contains(" req ")).collect();
        assert_eq!(cert_calls.len(), 3);
        assert!(cert_calls.iter().all(|c| !c.contains("-days")));
    }

    #[test]
    fn test_rerun_same_owner() {
        let env = FakeEnv::new();
        let conf = env.config(env.fake_tools());

        generate_keys("acme-corp", &conf).unwrap();
        generate_keys("acme-corp", &conf).unwrap();

        let owner_args: Vec<_> = env
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("sbsiglist"))
            .map(|c| c.split(' ').nth(2).unwrap().to_owned())
            .collect();
        assert_eq!(owner_args.len(), 6);
        assert!(owner_args.iter().all(|o| *o == owner_guid("acme-corp").to_string()));
    }

    #[test]
    fn test_cert_failure_stops_run() {
        let env = FakeEnv::new();
        let mut tools = env.fake_tools();
        tools.openssl = env.failing_tool("openssl");
        let conf = env.config(tools);

        let err = generate_keys("acme-corp", &conf).unwrap_err();
        assert_eq!(err.role(), Some(KeyRole::Pk));
        assert_eq!(err.step(), Some(Step::GenerateCert));
        assert!(err.to_string().contains("simulated failure"));

        // Only the first step ran, and no later role was attempted.
        assert_eq!(env.calls().len(), 1);
        assert!(env.output_files().is_empty());
    }

    #[test]
    fn test_sign_failure_stops_run() {
        let env = FakeEnv::new();
        let mut tools = env.fake_tools();
        tools.sbvarsign = env.failing_tool("sbvarsign");
        let conf = env.config(tools);

        let err = generate_keys("acme-corp", &conf).unwrap_err();
        assert_eq!(err.role(), Some(KeyRole::Pk));
        assert_eq!(err.step(), Some(Step::SignVar));

        // Partial output is left in place.
        assert_eq!(
            env.output_files(),
            ["PK.der", "PK.esl", "PK.key", "PK.pem"]
        );
    }

    #[test]
    fn test_missing_tool() {
        let env = FakeEnv::new();
        let mut tools = env.fake_tools();
        tools.sbsiglist = env.root.join("does-not-exist").into_string();
        let conf = env.config(tools);

        let err = generate_keys("acme-corp", &conf).unwrap_err();
        assert!(matches!(err, Error::ToolNotRun { .. }));
        assert_eq!(err.role(), Some(KeyRole::Pk));
        assert_eq!(err.step(), Some(Step::BuildSigList));
        assert_eq!(env.output_files(), ["PK.der", "PK.key", "PK.pem"]);
    }

    #[test]
    fn test_output_dir_failure_runs_no_tools() {
        let env = FakeEnv::new();
        let mut conf = env.config(env.fake_tools());
        conf.output = env.root.join("not-a-dir");
        fs::write(&conf.output, "").unwrap();

        let err = generate_keys("acme-corp", &conf).unwrap_err();
        assert!(matches!(err, Error::CreateOutputDir { .. }));
        assert!(env.calls().is_empty());
    }
}
