//! Backend reliability tracking
//!
//! A simplified circuit: every failure bumps the error counter, every success
//! decays it by one, and a backend whose counter reaches
//! [`AUTO_DISABLE_ERROR_COUNT`] is disabled. There is no half-open state and no
//! automatic re-enable; a disabled backend stays disabled for the life of the
//! catalog.

use serde::{Deserialize, Serialize};

/// Net failures after which a backend is taken out of rotation.
pub const AUTO_DISABLE_ERROR_COUNT: u32 = 5;

/// Outcome of recording one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReliabilityTransition {
    /// Counters updated, availability unchanged
    Recorded,
    /// This failure crossed the threshold and disabled the backend
    Disabled,
}

/// Live reliability state of one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityState {
    pub is_available: bool,
    /// Lifetime `successful_requests / total_requests`; 1.0 before any request
    pub success_rate: f64,
    /// Net failures (successes decay it)
    pub error_count: u32,
    pub last_error: Option<String>,
    pub total_requests: u64,
    pub successful_requests: u64,
}

impl Default for ReliabilityState {
    fn default() -> Self {
        Self {
            is_available: true,
            success_rate: 1.0,
            error_count: 0,
            last_error: None,
            total_requests: 0,
            successful_requests: 0,
        }
    }
}

impl ReliabilityState {
    /// Fold one request outcome into the state.
    pub fn record(&mut self, success: bool, error: Option<&str>) -> ReliabilityTransition {
        if success {
            self.error_count = self.error_count.saturating_sub(1);
            self.last_error = None;
        } else {
            self.error_count += 1;
            self.last_error = error.map(str::to_string);
        }

        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        }
        self.success_rate = self.successful_requests as f64 / self.total_requests as f64;

        // Only ever flips available -> disabled.
        if self.is_available && self.error_count >= AUTO_DISABLE_ERROR_COUNT {
            self.is_available = false;
            return ReliabilityTransition::Disabled;
        }
        ReliabilityTransition::Recorded
    }
}
