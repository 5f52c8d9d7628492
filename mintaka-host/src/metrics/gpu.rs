//! NVIDIA GPU statistics via `nvidia-smi`.

use std::time::{Duration, Instant};

use super::command::{CommandRunner, QueryError};

const QUERY: &str = "--query-gpu=name,temperature.gpu,utilization.gpu,utilization.memory,\
                     memory.used,memory.total,power.draw,power.limit";

/// One reading for the first GPU.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuStats {
    pub name: String,
    /// °C
    pub temperature: f32,
    /// Percent.
    pub gpu_util: f32,
    /// Percent.
    pub mem_util: f32,
    /// MiB
    pub memory_used: f32,
    /// MiB
    pub memory_total: f32,
    /// Watts.
    pub power_draw: f32,
    /// Watts.
    pub power_limit: f32,
}

impl GpuStats {
    /// Marketing prefixes dropped so the model fits on one line.
    pub fn short_name(&self) -> String {
        self.name.replace("NVIDIA ", "").replace("GeForce ", "")
    }

    /// Draw as a percentage of the limit; 0 without a limit.
    pub fn power_percent(&self) -> f32 {
        if self.power_limit > 0.0 {
            self.power_draw / self.power_limit * 100.0
        } else {
            0.0
        }
    }
}

/// Parse `--format=csv,noheader,nounits` output. Only the first GPU
/// is used.
pub fn parse_gpu_csv(output: &str) -> Result<GpuStats, QueryError> {
    let line = output
        .lines()
        .next()
        .ok_or_else(|| QueryError::Malformed("empty nvidia-smi output".into()))?;
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 8 {
        return Err(QueryError::Malformed(format!(
            "expected 8 fields, got {}",
            parts.len()
        )));
    }

    let num = |i: usize| {
        parts[i]
            .parse::<f32>()
            .map_err(|_| QueryError::Malformed(format!("field {i}: {:?}", parts[i])))
    };

    Ok(GpuStats {
        name: parts[0].to_owned(),
        temperature: num(1)?,
        gpu_util: num(2)?,
        mem_util: num(3)?,
        memory_used: num(4)?,
        memory_total: num(5)?,
        power_draw: num(6)?,
        power_limit: num(7)?,
    })
}

/// Cached GPU query shared by the system and GPU screens.
///
/// Successful readings are reused for `ttl`; failures are not cached.
pub struct GpuMonitor {
    runner: CommandRunner,
    ttl: Duration,
    cached: Option<(Instant, GpuStats)>,
}

impl GpuMonitor {
    pub fn new(runner: CommandRunner, ttl: Duration) -> Self {
        Self {
            runner,
            ttl,
            cached: None,
        }
    }

    pub fn query(&mut self) -> Result<GpuStats, QueryError> {
        let runner = self.runner.clone();
        self.query_with(Instant::now(), || {
            runner
                .run("nvidia-smi", &[QUERY, "--format=csv,noheader,nounits"])
                .and_then(|out| parse_gpu_csv(&out))
        })
    }

    fn query_with<F>(&mut self, now: Instant, fetch: F) -> Result<GpuStats, QueryError>
    where
        F: FnOnce() -> Result<GpuStats, QueryError>,
    {
        if let Some((at, stats)) = &self.cached {
            if now.saturating_duration_since(*at) < self.ttl {
                return Ok(stats.clone());
            }
        }
        let stats = fetch()?;
        self.cached = Some((now, stats.clone()));
        Ok(stats)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "NVIDIA GeForce RTX 3080, 54, 17, 9, 1520, 10240, 95.31, 320.00";

    fn monitor() -> (tokio::runtime::Runtime, GpuMonitor) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let runner = CommandRunner::new(rt.handle().clone(), Duration::from_secs(1));
        (rt, GpuMonitor::new(runner, Duration::from_millis(500)))
    }

    #[test]
    fn parses_first_gpu_line() {
        let stats = parse_gpu_csv(&format!("{SAMPLE}\nNVIDIA T400, 40, 0, 0, 1, 2048, 5, 31")).unwrap();
        assert_eq!(stats.name, "NVIDIA GeForce RTX 3080");
        assert_eq!(stats.temperature, 54.0);
        assert_eq!(stats.gpu_util, 17.0);
        assert_eq!(stats.memory_total, 10240.0);
        assert_eq!(stats.power_limit, 320.0);
        assert_eq!(stats.short_name(), "RTX 3080");
    }

    #[test]
    fn rejects_short_or_non_numeric_output() {
        assert!(parse_gpu_csv("").is_err());
        assert!(parse_gpu_csv("RTX, 1, 2").is_err());
        assert!(parse_gpu_csv("RTX, 54, 17, 9, 1520, 10240, [N/A], 320").is_err());
    }

    #[test]
    fn power_percent_handles_missing_limit() {
        let mut stats = parse_gpu_csv(SAMPLE).unwrap();
        assert!((stats.power_percent() - 29.78).abs() < 0.01);
        stats.power_limit = 0.0;
        assert_eq!(stats.power_percent(), 0.0);
    }

    #[test]
    fn successful_reading_is_cached_for_ttl() {
        let (_rt, mut monitor) = monitor();
        let t0 = Instant::now();
        let stats = parse_gpu_csv(SAMPLE).unwrap();

        monitor.query_with(t0, || Ok(stats.clone())).unwrap();
        let cached = monitor
            .query_with(t0 + Duration::from_millis(400), || {
                Err(QueryError::Malformed("should not run".into()))
            })
            .unwrap();
        assert_eq!(cached, stats);

        assert!(
            monitor
                .query_with(t0 + Duration::from_millis(600), || {
                    Err(QueryError::Unavailable("gone"))
                })
                .is_err()
        );
    }

    #[test]
    fn failures_are_retried() {
        let (_rt, mut monitor) = monitor();
        let t0 = Instant::now();
        assert!(monitor.query_with(t0, || Err(QueryError::Unavailable("no gpu"))).is_err());
        let stats = monitor
            .query_with(t0, || parse_gpu_csv(SAMPLE))
            .unwrap();
        assert_eq!(stats.gpu_util, 17.0);
    }
}
