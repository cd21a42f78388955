// Domain models: per-domain readings, snapshots and the composite

mod cpu;
mod domain;
mod gpu;
mod memory;
mod motherboard;
mod network;
mod npu;
mod snapshot;
mod storage;

pub use cpu::{CoreLoad, CpuHistoryEntry, CpuInfo, CpuStats};
pub use domain::Domain;
pub use gpu::{GpuController, GpuHistoryEntry, GpuStats};
pub use memory::{MemoryHistoryEntry, MemoryStats};
pub use motherboard::{
    BiosInfo, BoardInfo, ChassisInfo, MotherboardStats, ProductInfo, SensorReading,
};
pub use network::{InterfaceStat, NetworkHistoryEntry, NetworkStats, NetworkTotals};
pub use npu::{NpuDevice, NpuHistoryEntry, NpuStats, NpuVendor};
pub use snapshot::{CompositeSnapshot, DomainError, DomainSnapshot, DomainStatus};
pub use storage::{DiskIoStat, FilesystemStat, IoRates, StorageHistoryEntry, StorageStats};
