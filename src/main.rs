use anyhow::Result;
use pulsemon::config::{AppConfig, OutputMode};
use pulsemon::format::{scale, scale_rate};
use pulsemon::models::{CompositeSnapshot, Domain};
use pulsemon::sources::{
    CpuSource, GpuSource, MemorySource, MotherboardSource, NetworkSource, NpuSource,
    StorageSource,
};
use pulsemon::{Scheduler, SchedulerBuilder, SourceAdapter};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

fn add_if_enabled<A: SourceAdapter>(
    builder: &mut SchedulerBuilder,
    config: &AppConfig,
    domain: Domain,
    make: impl FnOnce() -> A,
) -> Result<()> {
    match config.sampler_config(domain) {
        Some(sampler_config) => {
            builder.add(make(), sampler_config)?;
        }
        None => tracing::info!(domain = %domain, "sampler disabled in config"),
    }
    Ok(())
}

fn build_scheduler(config: &AppConfig) -> Result<Scheduler> {
    let mut builder = Scheduler::builder(Duration::from_millis(config.scheduler.tick_ms));
    add_if_enabled(&mut builder, config, Domain::Cpu, CpuSource::new)?;
    add_if_enabled(&mut builder, config, Domain::Memory, MemorySource::new)?;
    add_if_enabled(&mut builder, config, Domain::Gpu, GpuSource::new)?;
    add_if_enabled(&mut builder, config, Domain::Storage, StorageSource::new)?;
    add_if_enabled(&mut builder, config, Domain::Network, NetworkSource::new)?;
    add_if_enabled(&mut builder, config, Domain::Npu, NpuSource::new)?;
    let ttl = Duration::from_secs(config.motherboard.cache_ttl_secs);
    add_if_enabled(&mut builder, config, Domain::Motherboard, || {
        MotherboardSource::new(ttl)
    })?;
    Ok(builder.build()?)
}

/// One human-readable line per summary; "-" where a domain has no data.
fn log_summary(snapshot: &CompositeSnapshot) {
    let cpu = snapshot
        .cpu
        .as_ref()
        .and_then(|s| s.data.as_ref())
        .map(|c| format!("{:.1}%", c.usage));
    let memory = snapshot
        .memory
        .as_ref()
        .and_then(|s| s.data.as_ref())
        .map(|m| format!("{} / {} ({:.1}%)", scale(m.used), scale(m.total), m.usage_percent));
    let network = snapshot
        .network
        .as_ref()
        .and_then(|s| s.data.as_ref())
        .map(|n| {
            format!(
                "rx {} tx {}",
                scale_rate(n.totals.rx_rate),
                scale_rate(n.totals.tx_rate)
            )
        });
    let storage = snapshot
        .storage
        .as_ref()
        .and_then(|s| s.data.as_ref())
        .map(|s| {
            format!(
                "read {} write {}",
                scale_rate(s.totals.read),
                scale_rate(s.totals.write)
            )
        });
    let gpu = snapshot
        .gpu
        .as_ref()
        .and_then(|s| s.data.as_ref())
        .and_then(|g| g.controllers.first())
        .map(|g| match g.utilization {
            Some(u) => format!("{} {:.0}%", g.model, u),
            None => g.model.clone(),
        });
    tracing::info!(
        cpu = cpu.as_deref().unwrap_or("-"),
        memory = memory.as_deref().unwrap_or("-"),
        network = network.as_deref().unwrap_or("-"),
        storage = storage.as_deref().unwrap_or("-"),
        gpu = gpu.as_deref().unwrap_or("-"),
        stale = ?snapshot.stale_domains(),
        "snapshot"
    );
}

fn subscribe_output(scheduler: &Scheduler, config: &AppConfig) {
    match config.output.mode {
        OutputMode::Log => {
            let every = config.output.summary_every_ticks;
            let mut seen = 0u64;
            scheduler.subscribe(move |snapshot| {
                seen += 1;
                if seen % every == 0 {
                    log_summary(&snapshot);
                }
                Ok(())
            });
        }
        OutputMode::Json => {
            scheduler.subscribe(|snapshot| {
                let line = serde_json::to_string(&*snapshot)?;
                println!("{}", line);
                Ok(())
            });
        }
    }
}

async fn log_stats(scheduler: Scheduler, every: Duration) {
    let mut tick = interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tick.tick().await;
    loop {
        tick.tick().await;
        for report in scheduler.reports() {
            let s = report.stats;
            tracing::info!(
                domain = %report.domain,
                state = ?report.state,
                attempts = s.attempts,
                successes = s.successes,
                failures = s.failures,
                unavailable = s.unavailable,
                timeouts = s.timeouts,
                skipped_busy = s.skipped_busy,
                "sampler stats"
            );
        }
        tracing::info!(
            ticks = scheduler.ticks_total(),
            published = scheduler.publisher().published_total(),
            subscribers = scheduler.publisher().subscriber_count(),
            "scheduler stats"
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = AppConfig::load()?;
    let scheduler = build_scheduler(&app_config)?;
    tracing::info!(domains = ?scheduler.domains(), "samplers registered");

    subscribe_output(&scheduler, &app_config);
    scheduler.start();

    let stats_task = tokio::spawn(log_stats(
        scheduler.clone(),
        Duration::from_secs(app_config.output.stats_log_interval_secs),
    ));

    shutdown_signal().await;
    tracing::info!("Received shutdown signal");
    stats_task.abort();
    scheduler.stop().await;

    Ok(())
}
