use serde::Deserialize;

use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::models::Domain;
use crate::sampler::SamplerConfig;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub samplers: SamplersSection,
    #[serde(default)]
    pub motherboard: MotherboardSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    /// Scheduler tick; also the publish cadence.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Max history entries kept per domain.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            history_capacity: default_history_capacity(),
        }
    }
}

/// Polling settings for one domain.
#[derive(Debug, Clone, Deserialize)]
pub struct SamplerSection {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub cadence_ms: u64,
    /// Defaults to 80% of `cadence_ms`.
    pub timeout_ms: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl SamplerSection {
    fn with_cadence(cadence_ms: u64) -> Self {
        Self {
            enabled: true,
            cadence_ms,
            timeout_ms: None,
        }
    }

    pub fn effective_timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(self.cadence_ms.saturating_mul(4) / 5)
    }
}

fn fast() -> SamplerSection {
    SamplerSection::with_cadence(1000)
}

fn medium() -> SamplerSection {
    SamplerSection::with_cadence(3000)
}

fn slow() -> SamplerSection {
    SamplerSection::with_cadence(10_000)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplersSection {
    #[serde(default = "fast")]
    pub cpu: SamplerSection,
    #[serde(default = "fast")]
    pub memory: SamplerSection,
    #[serde(default = "fast")]
    pub network: SamplerSection,
    #[serde(default = "medium")]
    pub gpu: SamplerSection,
    #[serde(default = "medium")]
    pub storage: SamplerSection,
    #[serde(default = "medium")]
    pub npu: SamplerSection,
    #[serde(default = "slow")]
    pub motherboard: SamplerSection,
}

impl Default for SamplersSection {
    fn default() -> Self {
        Self {
            cpu: fast(),
            memory: fast(),
            network: fast(),
            gpu: medium(),
            storage: medium(),
            npu: medium(),
            motherboard: slow(),
        }
    }
}

impl SamplersSection {
    pub fn get(&self, domain: Domain) -> &SamplerSection {
        match domain {
            Domain::Cpu => &self.cpu,
            Domain::Memory => &self.memory,
            Domain::Gpu => &self.gpu,
            Domain::Storage => &self.storage,
            Domain::Network => &self.network,
            Domain::Npu => &self.npu,
            Domain::Motherboard => &self.motherboard,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotherboardSection {
    /// How long the motherboard adapter serves cached identity/sensor data.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    10
}

impl Default for MotherboardSection {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One formatted summary log line every `summary_every_ticks`.
    Log,
    /// One JSON document per snapshot on stdout.
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_mode")]
    pub mode: OutputMode,
    #[serde(default = "default_summary_every_ticks")]
    pub summary_every_ticks: u64,
    /// How often to log sampler stats at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_output_mode() -> OutputMode {
    OutputMode::Log
}

fn default_summary_every_ticks() -> u64 {
    5
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            mode: default_output_mode(),
            summary_every_ticks: default_summary_every_ticks(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

impl AppConfig {
    /// Load from `CONFIG_FILE`, else `config.toml`. Built-in defaults apply when
    /// `CONFIG_FILE` is unset and `config.toml` does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let (path, explicit) = match std::env::var("CONFIG_FILE") {
            Ok(p) => (p, true),
            Err(_) => (DEFAULT_CONFIG_PATH.to_string(), false),
        };
        if !explicit && !std::path::Path::new(&path).exists() {
            tracing::info!(path = %path, "config file not found; using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Sampler config for `domain`, or `None` when the domain is disabled.
    pub fn sampler_config(&self, domain: Domain) -> Option<SamplerConfig> {
        let section = self.samplers.get(domain);
        if !section.enabled {
            return None;
        }
        Some(
            SamplerConfig::new(section.cadence_ms, section.effective_timeout_ms())
                .with_history_capacity(self.scheduler.history_capacity),
        )
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.scheduler.tick_ms > 0,
            "scheduler.tick_ms must be > 0, got {}",
            self.scheduler.tick_ms
        );
        anyhow::ensure!(
            self.scheduler.history_capacity > 0,
            "scheduler.history_capacity must be > 0, got {}",
            self.scheduler.history_capacity
        );
        for domain in Domain::ALL {
            let s = self.samplers.get(domain);
            if !s.enabled {
                continue;
            }
            anyhow::ensure!(
                s.cadence_ms >= self.scheduler.tick_ms,
                "samplers.{}.cadence_ms must be >= scheduler.tick_ms ({}), got {}",
                domain,
                self.scheduler.tick_ms,
                s.cadence_ms
            );
            let timeout_ms = s.effective_timeout_ms();
            anyhow::ensure!(
                timeout_ms > 0,
                "samplers.{}.timeout_ms must be > 0, got {}",
                domain,
                timeout_ms
            );
            anyhow::ensure!(
                timeout_ms < s.cadence_ms,
                "samplers.{}.timeout_ms must be < cadence_ms ({}), got {}",
                domain,
                s.cadence_ms,
                timeout_ms
            );
        }
        anyhow::ensure!(
            self.motherboard.cache_ttl_secs > 0,
            "motherboard.cache_ttl_secs must be > 0, got {}",
            self.motherboard.cache_ttl_secs
        );
        anyhow::ensure!(
            self.output.summary_every_ticks > 0,
            "output.summary_every_ticks must be > 0, got {}",
            self.output.summary_every_ticks
        );
        anyhow::ensure!(
            self.output.stats_log_interval_secs > 0,
            "output.stats_log_interval_secs must be > 0, got {}",
            self.output.stats_log_interval_secs
        );
        Ok(())
    }
}
