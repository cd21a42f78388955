// Host source adapters: sysinfo for CPU/memory/storage/network, sysfs and vendor tools for the rest

mod cpu;
mod gpu;
mod linux;
mod memory;
mod motherboard;
mod network;
mod npu;
mod storage;

pub use cpu::CpuSource;
pub use gpu::GpuSource;
pub use memory::MemorySource;
pub use motherboard::MotherboardSource;
pub use network::NetworkSource;
pub use npu::NpuSource;
pub use storage::StorageSource;

use std::sync::{Mutex, MutexGuard};

use crate::error::CollectError;

fn lock<'a, T>(m: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, CollectError> {
    m.lock()
        .map_err(|e| CollectError::unknown(format!("{} lock poisoned: {}", what, e)))
}

/// Output of an external tool, or a transient error naming the tool.
async fn run_tool(program: &str, args: &[&str]) -> Result<String, CollectError> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CollectError::transient(format!("running {}: {}", program, e)))?;
    if !output.status.success() {
        return Err(CollectError::transient(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
