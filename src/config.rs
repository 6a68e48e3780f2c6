use serde_derive::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{ensure_finite, ensure_positive, ConfigSnafu, EngineError};
use crate::orbital::propagator::PropagatorSettings;
use crate::physics::forces::ForceFlags;

/// Engine-wide settings. Every field has a default, so a YAML document only
/// needs the keys it overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub propagator: PropagatorSettings,
    pub forces: ForceFlags,
    pub ground_track_samples: usize, // used when a query passes 0 points
    pub pass_sample_step: f64,       // s, ground-track spacing for pass searches
    pub node_time_tolerance: f64,    // s
    pub min_elevation: f64,          // deg, pass search mask
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            propagator: PropagatorSettings::default(),
            forces: ForceFlags::default(),
            ground_track_samples: 200,
            pass_sample_step: 30.0,
            node_time_tolerance: 1e-6,
            min_elevation: 0.0,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(data: &str) -> Result<Self, EngineError> {
        let config: Self = serde_yaml::from_str(data).context(ConfigSnafu)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.propagator.validate()?;
        if self.ground_track_samples < 2 {
            return Err(EngineError::InvalidInput {
                reason: format!("ground_track_samples must be at least 2, got {}", self.ground_track_samples),
            });
        }
        ensure_positive(self.pass_sample_step, "pass sample step")?;
        ensure_finite(self.node_time_tolerance, "node time tolerance")?;
        ensure_finite(self.min_elevation, "minimum elevation")?;
        if self.node_time_tolerance < 0.0 || !(0.0..90.0).contains(&self.min_elevation) {
            return Err(EngineError::InvalidInput {
                reason: "node_time_tolerance must be >= 0 and min_elevation within [0, 90)".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbital::propagator::StepMode;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = EngineConfig::from_yaml(
            "
forces:
  include_drag: false
  include_third_body: true
pass_sample_step: 15.0
",
        )
        .unwrap();
        assert!(cfg.forces.include_j2);
        assert!(!cfg.forces.include_drag);
        assert!(cfg.forces.include_third_body);
        assert_eq!(cfg.pass_sample_step, 15.0);
        assert_eq!(cfg.ground_track_samples, 200);
        assert_eq!(cfg.propagator.step_mode, StepMode::Fixed);
    }

    #[test]
    fn adaptive_step_mode() {
        let cfg = EngineConfig::from_yaml(
            "
propagator:
  max_substep: 60.0
  step_mode: !Adaptive
    tolerance: 1.0e-6
    min_step: 0.5
",
        )
        .unwrap();
        assert_eq!(cfg.propagator.max_substep, 60.0);
        assert_eq!(
            cfg.propagator.step_mode,
            StepMode::Adaptive { tolerance: 1e-6, min_step: 0.5 }
        );
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            EngineConfig::from_yaml("pass_sample_step: -1.0"),
            Err(EngineError::InvalidInput { .. })
        ));
        assert!(matches!(
            EngineConfig::from_yaml("ground_track_samples: 1"),
            Err(EngineError::InvalidInput { .. })
        ));
        assert!(matches!(
            EngineConfig::from_yaml("forces: [1, 2"),
            Err(EngineError::Config { .. })
        ));
    }
}
