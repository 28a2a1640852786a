//! Quota limit configuration.

use serde::{Deserialize, Serialize};

/// Ceilings for one metered action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    /// Global switch. When off every check is allowed.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Calls allowed per rolling hour.
    #[serde(default = "default_hourly_limit")]
    pub hourly_limit: u32,
    /// Calls allowed per local calendar day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
}

fn default_true() -> bool { true }
fn default_hourly_limit() -> u32 { 20 }
fn default_daily_limit() -> u32 { 100 }

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            enabled: true,
            hourly_limit: 20,
            daily_limit: 100,
        }
    }
}

impl QuotaLimits {
    pub fn new(hourly_limit: u32, daily_limit: u32) -> Self {
        Self {
            enabled: true,
            hourly_limit,
            daily_limit,
        }
    }

    /// Same limits with the switch turned off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
