//! The configuration surface the core consumes (spec §9).
//!
//! Loading these values from a file, environment, or CLI flags is the
//! surrounding system's job (out of scope, spec §1); this struct is just the
//! typed destination such loading would fill in. `Default` gives every field
//! a platform-agnostic starting point suitable for tests and the scenarios
//! in spec §8.

use serde::{Deserialize, Serialize};

/// Options the balancing core consumes, per spec §9.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Multiple of `measurement_window` used as the stability/target tolerance band.
    pub stability_factor: f64,
    /// Control loop cadence, in seconds (spec §5, "fixed wait period").
    pub wait_interval_sec: f64,
    /// Minimum ring occupancy before stability or target-met can be declared.
    pub min_num_samples: usize,
    /// `alpha` in the limit-reduction rule `limit <- limit - alpha * (limit - floor)`.
    pub reduction_step_fraction: f64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        BalancerConfig {
            stability_factor: 2.0,
            wait_interval_sec: 0.005,
            min_num_samples: 5,
            reduction_step_fraction: 0.2,
        }
    }
}

#[cfg(feature = "file-config")]
impl BalancerConfig {
    /// Loads configuration from a file (TOML/YAML/JSON, inferred from extension) layered over
    /// `POWERCAP_*` environment overrides, falling back to [`Default::default`] for any field
    /// neither source sets.
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("POWERCAP"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let cfg = BalancerConfig::default();
        assert_eq!(cfg.min_num_samples, 5);
        assert!(cfg.stability_factor >= 1.0);
    }
}
