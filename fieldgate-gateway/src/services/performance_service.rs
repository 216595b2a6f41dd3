use std::sync::Arc;
use std::time::Duration;

use fieldgate_api::{PerformanceSample, ResourceName};
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::services::DataMessageListener;

pub const DEFAULT_POLL_CYCLES: u64 = 60;

const FIRST_SAMPLE_DELAY: Duration = Duration::from_secs(1);

/// Source of host utilisation percentages.
pub trait SystemProbe: Send + 'static {
    fn cpu_utilization(&mut self) -> f32;

    fn memory_utilization(&mut self) -> f32;

    fn disk_utilization(&mut self) -> f32;
}

pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new_all(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for SysinfoProbe {
    fn cpu_utilization(&mut self) -> f32 {
        self.system.refresh_cpu();
        self.system.global_cpu_info().cpu_usage()
    }

    fn memory_utilization(&mut self) -> f32 {
        self.system.refresh_memory();

        let total = self.system.total_memory();
        if total == 0 {
            return 0.0;
        }

        (self.system.used_memory() as f64 / total as f64 * 100.0) as f32
    }

    fn disk_utilization(&mut self) -> f32 {
        self.system.refresh_disks_list();

        let (total, available) = self
            .system
            .disks()
            .iter()
            .fold((0u64, 0u64), |(total, available), disk| {
                (total + disk.total_space(), available + disk.available_space())
            });

        if total == 0 {
            return 0.0;
        }

        (total.saturating_sub(available) as f64 / total as f64 * 100.0) as f32
    }
}

/// Periodically samples the local host and hands each sample to a listener.
pub struct PerformanceSampler<P: SystemProbe> {
    probe: P,
    location_id: String,
    period: Duration,
}

impl<P: SystemProbe> PerformanceSampler<P> {
    pub fn new(probe: P, location_id: impl Into<String>, poll_cycles: u64) -> Self {
        let poll_cycles = if poll_cycles == 0 {
            tracing::warn!("invalid poll cycles 0, using {}s", DEFAULT_POLL_CYCLES);
            DEFAULT_POLL_CYCLES
        } else {
            poll_cycles
        };

        Self {
            probe,
            location_id: location_id.into(),
            period: Duration::from_secs(poll_cycles),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn sample(&mut self) -> PerformanceSample {
        let cpu = clamp_utilization(self.probe.cpu_utilization());
        let memory = clamp_utilization(self.probe.memory_utilization());
        let disk = clamp_utilization(self.probe.disk_utilization());

        tracing::debug!("cpu {:.1}% memory {:.1}% disk {:.1}%", cpu, memory, disk);

        PerformanceSample::new(self.location_id.as_str()).with_utilization(cpu, memory, disk)
    }

    /// Sample every period, the first one shortly after start, until the task is aborted.
    pub fn spawn(mut self, listener: Arc<dyn DataMessageListener>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + FIRST_SAMPLE_DELAY, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let sample = self.sample();
                if !listener.on_performance_sample(ResourceName::GdaSystemPerfMsg, sample) {
                    tracing::warn!("performance sample rejected");
                }
            }
        })
    }
}

/// Utilisation percentages outside [0, 100], or NaN, are pinned to the range.
pub fn clamp_utilization(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use fieldgate_api::{ActuatorCommand, DeviceType, SensorReading};

    use super::*;

    struct FixedProbe {
        cpu: f32,
        memory: f32,
        disk: f32,
    }

    impl SystemProbe for FixedProbe {
        fn cpu_utilization(&mut self) -> f32 {
            self.cpu
        }

        fn memory_utilization(&mut self) -> f32 {
            self.memory
        }

        fn disk_utilization(&mut self) -> f32 {
            self.disk
        }
    }

    #[derive(Default)]
    struct SampleCollector {
        samples: Mutex<Vec<(ResourceName, PerformanceSample)>>,
    }

    impl DataMessageListener for SampleCollector {
        fn on_sensor_reading(&self, _: ResourceName, _: SensorReading) -> bool {
            false
        }

        fn on_actuator_response(&self, _: ResourceName, _: ActuatorCommand) -> bool {
            false
        }

        fn on_performance_sample(&self, resource: ResourceName, sample: PerformanceSample) -> bool {
            self.samples.lock().unwrap().push((resource, sample));
            true
        }

        fn on_message(&self, _: ResourceName, _: &str) -> bool {
            false
        }
    }

    fn probe() -> FixedProbe {
        FixedProbe {
            cpu: 12.5,
            memory: 140.0,
            disk: -3.0,
        }
    }

    #[test]
    fn test_sample_is_clamped_and_tagged() {
        let mut sampler = PerformanceSampler::new(probe(), "gatewaydevice001", 30);

        let sample = sampler.sample();

        assert_eq!(sample.cpu_utilization, 12.5);
        assert_eq!(sample.memory_utilization, 100.0);
        assert_eq!(sample.disk_utilization, 0.0);
        assert_eq!(sample.header.location_id, "gatewaydevice001");
        assert_eq!(sample.header.type_id, DeviceType::SystemPerformance);
    }

    #[test]
    fn test_zero_poll_cycles_uses_default() {
        let sampler = PerformanceSampler::new(probe(), "gw", 0);

        assert_eq!(sampler.period(), Duration::from_secs(DEFAULT_POLL_CYCLES));
    }

    #[test]
    fn test_clamp_nan() {
        assert_eq!(clamp_utilization(f32::NAN), 0.0);
    }

    #[test]
    fn test_sysinfo_probe_within_range() {
        let mut sampler = PerformanceSampler::new(SysinfoProbe::new(), "gw", 60);

        let sample = sampler.sample();

        assert!((0.0..=100.0).contains(&sample.cpu_utilization));
        assert!((0.0..=100.0).contains(&sample.memory_utilization));
        assert!((0.0..=100.0).contains(&sample.disk_utilization));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sampler_ticks() {
        let collector = Arc::new(SampleCollector::default());
        let handle = PerformanceSampler::new(probe(), "gw", 10).spawn(collector.clone());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(collector.samples.lock().unwrap().is_empty());

        // First tick at 1s, then 11s and 21s
        tokio::time::sleep(Duration::from_secs(21)).await;
        handle.abort();

        let samples = collector.samples.lock().unwrap();
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|(resource, _)| *resource == ResourceName::GdaSystemPerfMsg));
    }
}
