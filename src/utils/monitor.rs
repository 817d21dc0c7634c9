use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[derive(Debug, Clone)]
pub struct PhaseTiming {
    pub phase: String,
    pub duration: Duration,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
}

/// 記錄每個階段 (upload / submit / poll / render) 的耗時。
/// 啟用 `cli` feature 並開啟監控時，另外記錄行程的 CPU 與記憶體。
pub struct PhaseMonitor {
    start_time: Instant,
    phases: Mutex<Vec<PhaseTiming>>,
    system_stats: bool,
    #[cfg(feature = "cli")]
    system: Mutex<Option<(System, Pid)>>,
    #[cfg(feature = "cli")]
    peak_memory: Mutex<u64>,
}

impl PhaseMonitor {
    pub fn new(system_stats: bool) -> Self {
        Self {
            start_time: Instant::now(),
            phases: Mutex::new(Vec::new()),
            system_stats,
            #[cfg(feature = "cli")]
            system: Mutex::new(if system_stats { Self::probe() } else { None }),
            #[cfg(feature = "cli")]
            peak_memory: Mutex::new(0),
        }
    }

    #[cfg(feature = "cli")]
    fn probe() -> Option<(System, Pid)> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = System::new_with_specifics(RefreshKind::everything());
        system.refresh_all();
        Some((system, pid))
    }

    pub fn record(&self, phase: &str, duration: Duration) {
        tracing::debug!("⏱️ {} took {:?}", phase, duration);
        if let Ok(mut phases) = self.phases.lock() {
            phases.push(PhaseTiming {
                phase: phase.to_string(),
                duration,
            });
        }
        self.log_stats(phase);
    }

    pub fn phases(&self) -> Vec<PhaseTiming> {
        self.phases.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn is_enabled(&self) -> bool {
        self.system_stats
    }

    #[cfg(feature = "cli")]
    pub fn get_stats(&self) -> Option<SystemStats> {
        let mut guard = self.system.lock().ok()?;
        let (system, pid) = guard.as_mut()?;
        system.refresh_all();

        let process = system.process(*pid)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
        })
    }

    #[cfg(feature = "cli")]
    fn log_stats(&self, phase: &str) {
        if let Some(stats) = self.get_stats() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                self.elapsed()
            );
        }
    }

    #[cfg(not(feature = "cli"))]
    fn log_stats(&self, _phase: &str) {}

    pub fn log_final_stats(&self) {
        let phases = self.phases();
        let breakdown: Vec<String> = phases
            .iter()
            .map(|p| format!("{}={:?}", p.phase, p.duration))
            .collect();
        tracing::info!(
            "📊 Final Stats - Total Time: {:?} ({})",
            self.elapsed(),
            breakdown.join(", ")
        );
    }
}

impl Default for PhaseMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
