// Linux-specific helpers: /proc, sysfs, DMI. Every reader returns None/empty off Linux.

/// Trimmed, non-empty file contents.
pub(super) fn read_trimmed(path: &str) -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        let v = std::fs::read_to_string(path).ok()?;
        let v = v.trim();
        if v.is_empty() {
            return None;
        }
        Some(v.to_string())
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = path;
        None
    }
}

fn read_u64(path: &str) -> Option<u64> {
    read_trimmed(path)?.parse().ok()
}

/// DMI field from /sys/class/dmi/id (e.g. "board_vendor", "bios_version").
/// Placeholder strings some vendors ship are treated as missing.
pub(super) fn read_dmi(field: &str) -> Option<String> {
    let v = read_trimmed(&format!("/sys/class/dmi/id/{}", field))?;
    let lower = v.to_lowercase();
    if lower.contains("to be filled") || lower == "default string" || lower == "not specified" {
        return None;
    }
    Some(v)
}

/// First "model name" from /proc/cpuinfo. Prefer over sysinfo when it returns "cpu0" etc.
pub(super) fn read_cpu_model() -> Option<String> {
    let content = read_trimmed("/proc/cpuinfo")?;
    content
        .lines()
        .find(|l| l.starts_with("model name"))
        .and_then(|l| l.split_once(':'))
        .map(|(_, v)| v.trim().to_string())
        .filter(|s| !s.is_empty() && s != "cpu0")
}

/// Link speed from /sys/class/net/<interface>/speed, in bits per second; 0 if unknown.
pub(super) fn interface_speed(interface_name: &str) -> u64 {
    let path = format!("/sys/class/net/{}/speed", interface_name);
    if let Some(content) = read_trimmed(&path)
        && let Ok(mbps) = content.parse::<i64>()
        && mbps > 0
    {
        return (mbps as u64) * 1_000_000;
    }
    0
}

/// `None` when operstate is not exposed (non-Linux); loopback reports "unknown" and counts as up.
pub(super) fn interface_is_up(interface_name: &str) -> Option<bool> {
    let state = read_trimmed(&format!("/sys/class/net/{}/operstate", interface_name))?;
    Some(matches!(state.as_str(), "up" | "unknown"))
}

/// Cumulative per-device counters from /proc/diskstats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct DiskCounters {
    pub name: String,
    pub reads_completed: u64,
    pub sectors_read: u64,
    pub writes_completed: u64,
    pub sectors_written: u64,
}

/// /proc/diskstats sectors are always 512 bytes regardless of the device.
pub(super) const DISKSTATS_SECTOR_BYTES: u64 = 512;

/// Parse /proc/diskstats, keeping whole devices (skipping partitions, loop and ram devices)
/// as decided by `is_whole_disk`.
pub(super) fn parse_diskstats<F>(content: &str, is_whole_disk: F) -> Vec<DiskCounters>
where
    F: Fn(&str) -> bool,
{
    content
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                return None;
            }
            let name = fields[2];
            if name.starts_with("loop") || name.starts_with("ram") || !is_whole_disk(name) {
                return None;
            }
            Some(DiskCounters {
                name: name.to_string(),
                reads_completed: fields[3].parse().ok()?,
                sectors_read: fields[5].parse().ok()?,
                writes_completed: fields[7].parse().ok()?,
                sectors_written: fields[9].parse().ok()?,
            })
        })
        .collect()
}

/// Whole-disk counters, or `None` off Linux / when /proc/diskstats is unreadable.
pub(super) fn read_diskstats() -> Option<Vec<DiskCounters>> {
    let content = read_trimmed("/proc/diskstats")?;
    Some(parse_diskstats(&content, |name| {
        std::path::Path::new(&format!("/sys/block/{}", name)).exists()
    }))
}

/// A GPU found under /sys/class/drm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct DrmCard {
    pub card: String,
    pub vendor_id: String,
    pub device_id: String,
    pub driver: Option<String>,
}

impl DrmCard {
    fn device_path(&self, file: &str) -> String {
        format!("/sys/class/drm/{}/device/{}", self.card, file)
    }

    pub fn busy_percent(&self) -> Option<f64> {
        read_u64(&self.device_path("gpu_busy_percent")).map(|v| v as f64)
    }

    pub fn vram_total(&self) -> Option<u64> {
        read_u64(&self.device_path("mem_info_vram_total"))
    }

    pub fn vram_used(&self) -> Option<u64> {
        read_u64(&self.device_path("mem_info_vram_used"))
    }

    /// First hwmon temperature in degrees C.
    pub fn temperature(&self) -> Option<f64> {
        let dir = std::fs::read_dir(self.device_path("hwmon")).ok()?;
        dir.flatten().find_map(|entry| {
            let path = entry.path().join("temp1_input");
            let milli: f64 = read_trimmed(path.to_str()?)?.parse().ok()?;
            Some(milli / 1000.0)
        })
    }
}

/// cardN entries (not connectors like card0-DP-1) with a PCI vendor id.
pub(super) fn drm_cards() -> Vec<DrmCard> {
    let Ok(dir) = std::fs::read_dir("/sys/class/drm") else {
        return vec![];
    };
    let mut cards: Vec<DrmCard> = dir
        .flatten()
        .filter_map(|entry| {
            let card = entry.file_name().to_string_lossy().into_owned();
            if !card.starts_with("card") || card.contains('-') {
                return None;
            }
            let base = format!("/sys/class/drm/{}/device", card);
            let vendor_id = read_trimmed(&format!("{}/vendor", base))?;
            let device_id = read_trimmed(&format!("{}/device", base)).unwrap_or_default();
            let driver = std::fs::read_link(format!("{}/driver", base))
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()));
            Some(DrmCard {
                card,
                vendor_id,
                device_id,
                driver,
            })
        })
        .collect();
    cards.sort_by(|a, b| a.card.cmp(&b.card));
    cards
}

pub(super) fn pci_vendor_name(vendor_id: &str) -> &'static str {
    match vendor_id.to_lowercase().as_str() {
        "0x10de" => "NVIDIA",
        "0x1002" => "AMD",
        "0x8086" => "Intel",
        "0x106b" => "Apple",
        "0x5143" => "Qualcomm",
        _ => "Unknown",
    }
}

/// A compute accelerator under /sys/class/accel (Intel NPU, AMD XDNA, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct AccelDevice {
    pub node: String,
    pub vendor_id: Option<String>,
    pub driver: Option<String>,
}

impl AccelDevice {
    /// Cumulative busy time in microseconds (intel_vpu exposes this).
    pub fn busy_time_us(&self) -> Option<u64> {
        read_u64(&format!("/sys/class/accel/{}/device/npu_busy_time_us", self.node))
    }
}

pub(super) fn accel_devices() -> Vec<AccelDevice> {
    let Ok(dir) = std::fs::read_dir("/sys/class/accel") else {
        return vec![];
    };
    let mut devices: Vec<AccelDevice> = dir
        .flatten()
        .filter_map(|entry| {
            let node = entry.file_name().to_string_lossy().into_owned();
            if !node.starts_with("accel") {
                return None;
            }
            let base = format!("/sys/class/accel/{}/device", node);
            let vendor_id = read_trimmed(&format!("{}/vendor", base));
            let driver = std::fs::read_link(format!("{}/driver", base))
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()));
            Some(AccelDevice {
                node,
                vendor_id,
                driver,
            })
        })
        .collect();
    devices.sort_by(|a, b| a.node.cmp(&b.node));
    devices
}
