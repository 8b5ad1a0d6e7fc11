/*!
 * Monitor Configuration
 * Cadence and scheduling hints for the background poll task
 */

use std::time::Duration;

/// Default sleep between poll ticks.
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_millis(10);

/// Advisory scheduling priority for the monitor task.
///
/// The shared runtime schedules tasks without priorities; the hint is
/// recorded and logged at spawn so deployments can see what was asked
/// for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// Monitor task configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sleep between poll ticks (nanosecond granularity)
    pub monitor_interval: Duration,
    /// Scheduling hint for the monitor task
    pub monitor_priority: MonitorPriority,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            monitor_priority: MonitorPriority::Normal,
        }
    }
}

impl MonitorConfig {
    /// Configuration for latency-sensitive workloads.
    pub const fn low_latency() -> Self {
        Self {
            monitor_interval: Duration::from_millis(1),
            monitor_priority: MonitorPriority::High,
        }
    }

    /// Configuration for workloads that tolerate slower wakeups.
    pub const fn background() -> Self {
        Self {
            monitor_interval: Duration::from_millis(50),
            monitor_priority: MonitorPriority::Low,
        }
    }
}
