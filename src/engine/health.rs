use crate::engine::history::{self, SharedHistory};
use crate::models::{HealthStatus, HealthSummary};

/// Samples needed before the sensors are reported as healthy
const BASELINE_SAMPLES: usize = 3;

/// Read-only view over the validator's rolling history
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    history: SharedHistory,
}

impl HealthMonitor {
    pub fn new(history: SharedHistory) -> Self {
        HealthMonitor { history }
    }

    pub fn sensor_health(&self) -> HealthSummary {
        let samples = history::lock(&self.history).len();

        if samples < BASELINE_SAMPLES {
            HealthSummary {
                status: HealthStatus::Initializing,
                message: "Collecting baseline data...".to_string(),
            }
        } else {
            HealthSummary {
                status: HealthStatus::Healthy,
                message: "All sensors responding normally".to_string(),
            }
        }
    }
}
