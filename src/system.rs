//! Host metrics for the status endpoint

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Instant;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};
use utoipa::ToSchema;

/// Point-in-time host metrics
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SystemStatus {
    /// Seconds since the monitor was created (process start, in practice)
    pub uptime_secs: u64,
    /// Global CPU usage percentage (0.0 to 100.0)
    pub cpu_usage: f32,
    /// Memory usage
    pub memory: UsageStats,
    /// Disk usage summed across mounted disks
    pub disk: UsageStats,
}

/// Total/used/free triple with a percentage, in bytes
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UsageStats {
    /// Total bytes
    pub total: u64,
    /// Used bytes
    pub used: u64,
    /// Free bytes
    pub free: u64,
    /// used / total as a percentage, 0.0 when total is 0
    pub percent: f32,
}

impl UsageStats {
    fn from_total_used(total: u64, used: u64) -> Self {
        let percent = if total > 0 {
            (used as f64 / total as f64 * 100.0) as f32
        } else {
            0.0
        };
        Self {
            total,
            used,
            free: total.saturating_sub(used),
            percent,
        }
    }
}

/// Samples CPU and memory through a persistent sysinfo handle.
///
/// CPU usage is measured against the previous refresh, so the first
/// snapshot after startup reads 0.0 and later ones reflect the interval
/// since the preceding call.
#[derive(Debug)]
pub struct SystemMonitor {
    started: Instant,
    system: Mutex<System>,
}

impl SystemMonitor {
    /// Create a monitor; records the start instant for uptime
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        Self {
            started: Instant::now(),
            system: Mutex::new(system),
        }
    }

    /// Refresh and report current host metrics
    pub fn snapshot(&self) -> SystemStatus {
        let (cpu_usage, mem_total, mem_used) = {
            let mut system = self
                .system
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            system.refresh_cpu_all();
            system.refresh_memory();
            (
                system.global_cpu_usage(),
                system.total_memory(),
                system.used_memory(),
            )
        };

        let disks = Disks::new_with_refreshed_list();
        let mut disk_total = 0u64;
        let mut disk_free = 0u64;
        for disk in disks.list() {
            disk_total += disk.total_space();
            disk_free += disk.available_space();
        }

        SystemStatus {
            uptime_secs: self.started.elapsed().as_secs(),
            cpu_usage,
            memory: UsageStats::from_total_used(mem_total, mem_used),
            disk: UsageStats::from_total_used(disk_total, disk_total.saturating_sub(disk_free)),
        }
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}
