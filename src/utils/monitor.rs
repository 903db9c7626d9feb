use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

/// One checkpoint of a report run.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSample {
    pub phase: String,
    /// 與上一個檢查點之間的時間
    pub duration: Duration,
    pub cpu_usage: f32,
    pub memory_mb: u64,
}

/// Records how long each phase of a report run took and what the process
/// used at that point. Disabled monitors record nothing.
pub struct SystemMonitor {
    enabled: bool,
    started: Instant,
    samples: Mutex<Vec<PhaseSample>>,
    last: Mutex<Instant>,
    #[cfg(feature = "cli")]
    probe: Option<(Mutex<System>, Pid)>,
}

impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            enabled,
            started: now,
            samples: Mutex::new(Vec::new()),
            last: Mutex::new(now),
            #[cfg(feature = "cli")]
            probe: if enabled { Self::probe() } else { None },
        }
    }

    #[cfg(feature = "cli")]
    fn probe() -> Option<(Mutex<System>, Pid)> {
        match sysinfo::get_current_pid() {
            Ok(pid) => Some((Mutex::new(System::new_with_specifics(RefreshKind::nothing())), pid)),
            Err(e) => {
                tracing::warn!(
                    "⚠️ Could not determine current PID, resource sampling off: {}",
                    e
                );
                None
            }
        }
    }

    #[cfg(feature = "cli")]
    fn usage(&self) -> (f32, u64) {
        let Some((system, pid)) = &self.probe else {
            return (0.0, 0);
        };
        let Ok(mut system) = system.lock() else {
            return (0.0, 0);
        };
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[*pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        system
            .process(*pid)
            .map(|p| (p.cpu_usage(), p.memory() / 1024 / 1024))
            .unwrap_or((0.0, 0))
    }

    #[cfg(not(feature = "cli"))]
    fn usage(&self) -> (f32, u64) {
        (0.0, 0)
    }

    /// Closes the current phase and logs it.
    pub fn checkpoint(&self, phase: &str) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        let duration = match self.last.lock() {
            Ok(mut last) => {
                let d = now.duration_since(*last);
                *last = now;
                d
            }
            Err(_) => Duration::ZERO,
        };
        let (cpu_usage, memory_mb) = self.usage();

        tracing::info!(
            "📊 {} - {:?}, CPU: {:.1}%, Memory: {}MB",
            phase,
            duration,
            cpu_usage,
            memory_mb
        );

        if let Ok(mut samples) = self.samples.lock() {
            samples.push(PhaseSample {
                phase: phase.to_string(),
                duration,
                cpu_usage,
                memory_mb,
            });
        }
    }

    pub fn samples(&self) -> Vec<PhaseSample> {
        self.samples.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn peak_memory_mb(&self) -> u64 {
        self.samples().iter().map(|s| s.memory_mb).max().unwrap_or(0)
    }

    /// Logs total time, peak memory and the slowest phase.
    pub fn log_summary(&self) {
        if !self.enabled {
            return;
        }
        let samples = self.samples();
        let slowest = samples
            .iter()
            .max_by_key(|s| s.duration)
            .map(|s| format!("{} ({:?})", s.phase, s.duration))
            .unwrap_or_else(|| "-".to_string());

        tracing::info!(
            "📊 Run finished in {:?}, peak memory {}MB, slowest phase {}",
            self.started.elapsed(),
            self.peak_memory_mb(),
            slowest
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_records_nothing() {
        let monitor = SystemMonitor::new(false);
        monitor.checkpoint("Extract");
        assert!(!monitor.is_enabled());
        assert!(monitor.samples().is_empty());
        assert_eq!(monitor.peak_memory_mb(), 0);
    }

    #[test]
    fn test_checkpoints_keep_phase_order() {
        let monitor = SystemMonitor::new(true);
        monitor.checkpoint("Extract");
        std::thread::sleep(Duration::from_millis(5));
        monitor.checkpoint("Transform");
        monitor.checkpoint("Load");

        let phases: Vec<String> = monitor.samples().into_iter().map(|s| s.phase).collect();
        assert_eq!(phases, vec!["Extract", "Transform", "Load"]);
        assert!(monitor.samples()[1].duration >= Duration::from_millis(5));
        monitor.log_summary();
    }
}
