//! Global-flag overrides layered on top of `dms-config` profiles.
//!
//! Precedence: command-line flag, then `DMS_*` environment, then the
//! profile, then `[defaults]`.

use secrecy::SecretString;

use dms_config::{Config, Profile};
use dms_core::{Credentials, DmsConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use dms_config::{config_path, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Copy of `profile` with the connection-related global flags applied.
fn with_overrides(profile: &Profile, global: &GlobalOpts) -> Profile {
    let mut merged = profile.clone();
    if let Some(ref url) = global.url {
        merged.url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        merged.username = Some(username.clone());
    }
    if global.insecure {
        merged.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        merged.timeout = Some(timeout);
    }
    merged
}

/// Build the `DmsConfig` for this invocation.
///
/// With no matching profile, `--url` alone is enough for an anonymous
/// or flag-authenticated session.
pub fn build_dms_config(global: &GlobalOpts) -> Result<DmsConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let base = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.url.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    resolve(&with_overrides(&base, global), &profile_name, &cfg, global)
}

fn resolve(
    profile: &Profile,
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<DmsConfig, CliError> {
    // An explicit --password skips the env/keyring chain entirely.
    if let (Some(username), Some(password)) = (&profile.username, &global.password) {
        let mut anonymous = profile.clone();
        anonymous.username = None;
        let mut config = dms_config::profile_to_dms_config(&anonymous, profile_name, &cfg.defaults)?;
        config.credentials = Some(Credentials {
            username: username.clone(),
            password: SecretString::from(password.clone()),
        });
        return Ok(config);
    }

    Ok(dms_config::profile_to_dms_config(
        profile,
        profile_name,
        &cfg.defaults,
    )?)
}

/// Comma-separated profile names, or `(none)`.
pub fn available_profiles(cfg: &Config) -> String {
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["dms"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["agents", "list"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    fn lab() -> Profile {
        Profile {
            url: "https://dms.lab".into(),
            ..Profile::default()
        }
    }

    #[test]
    fn flags_override_profile_fields() {
        let merged = with_overrides(
            &lab(),
            &global(&["--url", "https://other.lab", "--timeout", "7", "-k"]),
        );
        assert_eq!(merged.url, "https://other.lab");
        assert_eq!(merged.timeout, Some(7));
        assert_eq!(merged.insecure, Some(true));
    }

    #[test]
    fn explicit_password_builds_credentials_directly() {
        let opts = global(&["--username", "ops", "--password", "s3cret"]);
        let profile = with_overrides(&lab(), &opts);
        let config = resolve(&profile, "lab", &Config::default(), &opts).unwrap();
        let creds = config.credentials.unwrap();
        assert_eq!(creds.username, "ops");
        assert_eq!(creds.password.expose_secret(), "s3cret");
    }

    #[test]
    fn available_profiles_are_sorted() {
        let mut cfg = Config::default();
        assert_eq!(available_profiles(&cfg), "(none)");
        cfg.profiles.insert("prod".into(), lab());
        cfg.profiles.insert("lab".into(), lab());
        assert_eq!(available_profiles(&cfg), "lab, prod");
    }
}
