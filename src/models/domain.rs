// Monitored domains

use serde::{Deserialize, Serialize};

/// One hardware/OS subsystem; each has exactly one sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Cpu,
    Memory,
    Gpu,
    Storage,
    Network,
    Npu,
    Motherboard,
}

impl Domain {
    pub const ALL: [Domain; 7] = [
        Domain::Cpu,
        Domain::Memory,
        Domain::Gpu,
        Domain::Storage,
        Domain::Network,
        Domain::Npu,
        Domain::Motherboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Cpu => "cpu",
            Domain::Memory => "memory",
            Domain::Gpu => "gpu",
            Domain::Storage => "storage",
            Domain::Network => "network",
            Domain::Npu => "npu",
            Domain::Motherboard => "motherboard",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
