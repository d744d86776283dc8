// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::error::{ConstructionError, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::env;

pub const INITIAL_PRECISION_VAR: &str = "EXACTREAL_INITIAL_PRECISION";
pub const PRECISION_CEILING_VAR: &str = "EXACTREAL_PRECISION_CEILING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionPolicy {
    /// working precision of the first attempt, in bits
    pub initial: u64,
    /// largest working precision tried before giving up, in bits
    pub ceiling: u64,
}

impl Default for PrecisionPolicy {
    fn default() -> Self {
        Self {
            initial: 64,
            ceiling: 16384,
        }
    }
}

lazy_static! {
    static ref ENV_POLICY: PrecisionPolicy = env_policy();
}

fn env_policy() -> PrecisionPolicy {
    let mut policy = PrecisionPolicy::default();
    policy.apply_env_overrides();
    if policy.validate().is_err() {
        tracing::debug!(?policy, "ignoring invalid precision policy from environment");
        return PrecisionPolicy::default();
    }
    policy
}

impl PrecisionPolicy {
    pub fn new(initial: u64, ceiling: u64) -> Result<Self> {
        let policy = Self { initial, ceiling };
        policy.validate()?;
        Ok(policy)
    }
    /// the default policy with environment overrides applied, computed once
    pub fn from_env() -> Self {
        *ENV_POLICY
    }
    pub fn from_json(text: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(text)?;
        policy.validate()?;
        Ok(policy)
    }
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var(INITIAL_PRECISION_VAR) {
            if let Ok(initial) = val.parse::<u64>() {
                self.initial = initial;
            }
        }
        if let Ok(val) = env::var(PRECISION_CEILING_VAR) {
            if let Ok(ceiling) = val.parse::<u64>() {
                self.ceiling = ceiling;
            }
        }
    }
    pub fn validate(&self) -> Result<(), ConstructionError> {
        if self.initial < 2 {
            return Err(ConstructionError::InvalidPrecisionPolicy(format!(
                "initial precision must be at least 2 bits, got {}",
                self.initial
            )));
        }
        if self.ceiling < self.initial {
            return Err(ConstructionError::InvalidPrecisionPolicy(format!(
                "ceiling {} is below the initial precision {}",
                self.ceiling, self.initial
            )));
        }
        Ok(())
    }
    /// the working precisions of an escalation loop: `initial`, doubling, ending at `ceiling`
    pub fn escalation(&self) -> Escalation {
        Escalation {
            next: Some(self.initial),
            ceiling: self.ceiling,
            escalated: false,
        }
    }
    /// working precisions starting at `start` (clamped into the policy)
    pub fn escalation_from(&self, start: u64) -> Escalation {
        Escalation {
            next: Some(start.max(self.initial).min(self.ceiling)),
            ceiling: self.ceiling,
            escalated: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Escalation {
    next: Option<u64>,
    ceiling: u64,
    escalated: bool,
}

impl Iterator for Escalation {
    type Item = u64;
    fn next(&mut self) -> Option<u64> {
        let current = self.next?;
        self.next = if current >= self.ceiling {
            None
        } else {
            Some(current.saturating_mul(2).min(self.ceiling))
        };
        if self.escalated {
            tracing::trace!(precision = current, "escalating working precision");
        }
        self.escalated = true;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let policy = PrecisionPolicy::default();
        assert_eq!(policy.initial, 64);
        assert_eq!(policy.ceiling, 16384);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_escalation() {
        let policy = PrecisionPolicy::new(64, 1000).unwrap();
        assert_eq!(
            policy.escalation().collect::<Vec<_>>(),
            vec![64, 128, 256, 512, 1000]
        );
        let policy = PrecisionPolicy::new(64, 64).unwrap();
        assert_eq!(policy.escalation().collect::<Vec<_>>(), vec![64]);
        let policy = PrecisionPolicy::new(16, 256).unwrap();
        assert_eq!(
            policy.escalation_from(100).collect::<Vec<_>>(),
            vec![100, 200, 256]
        );
    }

    #[test]
    fn test_validate() {
        assert!(PrecisionPolicy::new(1, 64).is_err());
        assert!(PrecisionPolicy::new(128, 64).is_err());
        assert!(PrecisionPolicy::new(2, 2).is_ok());
    }

    #[test]
    fn test_from_json() {
        let policy = PrecisionPolicy::from_json(r#"{"ceiling": 4096}"#).unwrap();
        assert_eq!(policy, PrecisionPolicy::new(64, 4096).unwrap());
        assert!(PrecisionPolicy::from_json(r#"{"initial": 128, "ceiling": 64}"#).is_err());
        assert!(PrecisionPolicy::from_json("[").is_err());
        let text = serde_json::to_string(&policy).unwrap();
        assert_eq!(text, r#"{"initial":64,"ceiling":4096}"#);
    }

    #[test]
    fn test_env_overrides() {
        env::set_var(INITIAL_PRECISION_VAR, "32");
        env::set_var(PRECISION_CEILING_VAR, "512");
        let mut policy = PrecisionPolicy::default();
        policy.apply_env_overrides();
        assert_eq!(policy, PrecisionPolicy::new(32, 512).unwrap());
        assert_eq!(env_policy(), policy);

        env::set_var(INITIAL_PRECISION_VAR, "many");
        env::set_var(PRECISION_CEILING_VAR, "-1");
        let mut policy = PrecisionPolicy::new(128, 1024).unwrap();
        policy.apply_env_overrides();
        assert_eq!(policy, PrecisionPolicy::new(128, 1024).unwrap());
        assert_eq!(env_policy(), PrecisionPolicy::default());

        env::set_var(INITIAL_PRECISION_VAR, "1000");
        env::set_var(PRECISION_CEILING_VAR, "100");
        assert_eq!(env_policy(), PrecisionPolicy::default());

        env::remove_var(INITIAL_PRECISION_VAR);
        env::remove_var(PRECISION_CEILING_VAR);
        assert_eq!(env_policy(), PrecisionPolicy::default());
    }
}
