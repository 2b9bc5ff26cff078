use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

const ENV_PREFIX: &str = "COSTLINE_PROPAGATION__";

/// Fan-out and timeout knobs for a propagation call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationPolicy {
    pub max_concurrent_lock_checks: usize,
    /// Zero disables the timeout.
    pub lock_check_timeout_ms: u64,
    pub max_concurrent_track_writes: usize,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            max_concurrent_lock_checks: 16,
            lock_check_timeout_ms: 5_000,
            max_concurrent_track_writes: 8,
        }
    }
}

impl PropagationPolicy {
    pub fn lock_check_timeout(&self) -> Option<Duration> {
        if self.lock_check_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.lock_check_timeout_ms))
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_lock_checks == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrent_lock_checks".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.max_concurrent_track_writes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrent_track_writes".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Defaults, then the YAML file if it exists, then `COSTLINE_PROPAGATION__*` env vars.
pub fn load_policy(path: Option<&Path>) -> Result<PropagationPolicy, ConfigError> {
    let mut policy = match path {
        Some(p) if p.exists() => policy_from_file(p)?,
        _ => PropagationPolicy::default(),
    };
    apply_env_overrides(&mut policy)?;
    policy.validate()?;
    Ok(policy)
}

fn policy_from_file(path: &Path) -> Result<PropagationPolicy, ConfigError> {
    let content = fs::read_to_string(path).map_err(|err| ConfigError::Io(format!("{}", err)))?;
    if content.trim().is_empty() {
        return Ok(PropagationPolicy::default());
    }
    serde_yaml::from_str(&content).map_err(|err| ConfigError::Invalid(format!("{}", err)))
}

/// Applies `COSTLINE_PROPAGATION__<FIELD>` variables on top of `policy`.
pub fn apply_env_overrides(policy: &mut PropagationPolicy) -> Result<(), ConfigError> {
    for (key, raw) in env::vars() {
        if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
            let field = stripped.to_ascii_lowercase();
            if field.is_empty() {
                continue;
            }
            apply_override(policy, &field, raw.trim())?;
        }
    }
    Ok(())
}

pub(crate) fn apply_override(
    policy: &mut PropagationPolicy,
    field: &str,
    raw: &str,
) -> Result<(), ConfigError> {
    match field {
        "max_concurrent_lock_checks" => {
            policy.max_concurrent_lock_checks = parse_number(field, raw)? as usize;
        }
        "lock_check_timeout_ms" => {
            policy.lock_check_timeout_ms = parse_number(field, raw)?;
        }
        "max_concurrent_track_writes" => {
            policy.max_concurrent_track_writes = parse_number(field, raw)? as usize;
        }
        other => {
            return Err(ConfigError::Invalid(format!(
                "unsupported propagation setting: {other}"
            )))
        }
    }
    Ok(())
}

fn parse_number(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("expected integer, got {raw:?}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_when_no_file() {
        let policy = load_policy(None).unwrap();
        assert_eq!(policy, PropagationPolicy::default());
        assert_eq!(policy.lock_check_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    #[serial]
    fn file_values_are_layered_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("propagation.yaml");
        std::fs::write(&file_path, "max_concurrent_lock_checks: 4\nlock_check_timeout_ms: 0\n")
            .unwrap();

        let policy = load_policy(Some(&file_path)).unwrap();
        assert_eq!(policy.max_concurrent_lock_checks, 4);
        assert_eq!(policy.lock_check_timeout(), None);
        assert_eq!(policy.max_concurrent_track_writes, 8);
    }

    #[test]
    #[serial]
    fn env_overrides_win_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("propagation.yaml");
        std::fs::write(&file_path, "max_concurrent_track_writes: 2\n").unwrap();

        env::set_var("COSTLINE_PROPAGATION__MAX_CONCURRENT_TRACK_WRITES", "3");
        let policy = load_policy(Some(&file_path));
        env::remove_var("COSTLINE_PROPAGATION__MAX_CONCURRENT_TRACK_WRITES");

        assert_eq!(policy.unwrap().max_concurrent_track_writes, 3);
    }

    #[test]
    #[serial]
    fn zero_concurrency_is_rejected() {
        env::set_var("COSTLINE_PROPAGATION__MAX_CONCURRENT_LOCK_CHECKS", "0");
        let result = load_policy(None);
        env::remove_var("COSTLINE_PROPAGATION__MAX_CONCURRENT_LOCK_CHECKS");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "max_concurrent_lock_checks"
        ));
    }

    #[test]
    fn unknown_override_is_reported() {
        let mut policy = PropagationPolicy::default();
        let err = apply_override(&mut policy, "retry_budget", "3").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = apply_override(&mut policy, "lock_check_timeout_ms", "soon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
