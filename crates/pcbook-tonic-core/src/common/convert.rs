//! Conversions between generated wire messages and `pcbook` domain types.
//!
//! Missing nested messages decode to their domain defaults, and unknown enum
//! values decode to the `Unknown` variant, mirroring proto3 getter semantics.

use crate::proto::{self, keyboard, laptop, memory, screen, storage};
use pcbook::{
    Cpu, Filter, Gpu, Keyboard, KeyboardLayout, Laptop, Memory, MemoryUnit, Panel, Rating,
    Resolution, Screen, Storage, StorageDriver, Weight,
};
use std::time::SystemTime;

impl From<memory::Unit> for MemoryUnit {
    fn from(unit: memory::Unit) -> Self {
        match unit {
            memory::Unit::Unknown => Self::Unknown,
            memory::Unit::Bit => Self::Bit,
            memory::Unit::Byte => Self::Byte,
            memory::Unit::Kilobyte => Self::Kilobyte,
            memory::Unit::Megabyte => Self::Megabyte,
            memory::Unit::Gigabyte => Self::Gigabyte,
            memory::Unit::Terabyte => Self::Terabyte,
        }
    }
}

impl From<MemoryUnit> for memory::Unit {
    fn from(unit: MemoryUnit) -> Self {
        match unit {
            MemoryUnit::Unknown => Self::Unknown,
            MemoryUnit::Bit => Self::Bit,
            MemoryUnit::Byte => Self::Byte,
            MemoryUnit::Kilobyte => Self::Kilobyte,
            MemoryUnit::Megabyte => Self::Megabyte,
            MemoryUnit::Gigabyte => Self::Gigabyte,
            MemoryUnit::Terabyte => Self::Terabyte,
        }
    }
}

impl From<proto::Memory> for Memory {
    fn from(memory: proto::Memory) -> Self {
        Self::new(memory.value, memory.unit().into())
    }
}

impl From<Memory> for proto::Memory {
    fn from(memory: Memory) -> Self {
        Self {
            value: memory.value,
            unit: memory::Unit::from(memory.unit) as i32,
        }
    }
}

fn memory_or_default(memory: Option<proto::Memory>) -> Memory {
    memory.map(Into::into).unwrap_or_default()
}

impl From<proto::Cpu> for Cpu {
    fn from(cpu: proto::Cpu) -> Self {
        Self {
            brand: cpu.brand,
            name: cpu.name,
            number_cores: cpu.number_cores,
            number_threads: cpu.number_threads,
            min_ghz: cpu.min_ghz,
            max_ghz: cpu.max_ghz,
        }
    }
}

impl From<Cpu> for proto::Cpu {
    fn from(cpu: Cpu) -> Self {
        Self {
            brand: cpu.brand,
            name: cpu.name,
            number_cores: cpu.number_cores,
            number_threads: cpu.number_threads,
            min_ghz: cpu.min_ghz,
            max_ghz: cpu.max_ghz,
        }
    }
}

impl From<proto::Gpu> for Gpu {
    fn from(gpu: proto::Gpu) -> Self {
        Self {
            brand: gpu.brand,
            name: gpu.name,
            min_ghz: gpu.min_ghz,
            max_ghz: gpu.max_ghz,
            memory: memory_or_default(gpu.memory),
        }
    }
}

impl From<Gpu> for proto::Gpu {
    fn from(gpu: Gpu) -> Self {
        Self {
            brand: gpu.brand,
            name: gpu.name,
            min_ghz: gpu.min_ghz,
            max_ghz: gpu.max_ghz,
            memory: Some(gpu.memory.into()),
        }
    }
}

impl From<proto::Storage> for Storage {
    fn from(storage: proto::Storage) -> Self {
        let driver = match storage.driver() {
            storage::Driver::Unknown => StorageDriver::Unknown,
            storage::Driver::Hdd => StorageDriver::Hdd,
            storage::Driver::Ssd => StorageDriver::Ssd,
        };
        Self {
            driver,
            memory: memory_or_default(storage.memory),
        }
    }
}

impl From<Storage> for proto::Storage {
    fn from(storage: Storage) -> Self {
        let driver = match storage.driver {
            StorageDriver::Unknown => storage::Driver::Unknown,
            StorageDriver::Hdd => storage::Driver::Hdd,
            StorageDriver::Ssd => storage::Driver::Ssd,
        };
        Self {
            driver: driver as i32,
            memory: Some(storage.memory.into()),
        }
    }
}

impl From<proto::Screen> for Screen {
    fn from(screen: proto::Screen) -> Self {
        let panel = match screen.panel() {
            screen::Panel::Unknown => Panel::Unknown,
            screen::Panel::Ips => Panel::Ips,
            screen::Panel::Oled => Panel::Oled,
        };
        let resolution = screen
            .resolution
            .map(|r| Resolution {
                width: r.width,
                height: r.height,
            })
            .unwrap_or_default();
        Self {
            size_inch: screen.size_inch,
            resolution,
            panel,
            multitouch: screen.multitouch,
        }
    }
}

impl From<Screen> for proto::Screen {
    fn from(screen: Screen) -> Self {
        let panel = match screen.panel {
            Panel::Unknown => screen::Panel::Unknown,
            Panel::Ips => screen::Panel::Ips,
            Panel::Oled => screen::Panel::Oled,
        };
        Self {
            size_inch: screen.size_inch,
            resolution: Some(screen::Resolution {
                width: screen.resolution.width,
                height: screen.resolution.height,
            }),
            panel: panel as i32,
            multitouch: screen.multitouch,
        }
    }
}

impl From<proto::Keyboard> for Keyboard {
    fn from(keyboard: proto::Keyboard) -> Self {
        let layout = match keyboard.layout() {
            keyboard::Layout::Unknown => KeyboardLayout::Unknown,
            keyboard::Layout::Qwerty => KeyboardLayout::Qwerty,
            keyboard::Layout::Qwertz => KeyboardLayout::Qwertz,
            keyboard::Layout::Azerty => KeyboardLayout::Azerty,
        };
        Self {
            layout,
            backlit: keyboard.backlit,
        }
    }
}

impl From<Keyboard> for proto::Keyboard {
    fn from(keyboard: Keyboard) -> Self {
        let layout = match keyboard.layout {
            KeyboardLayout::Unknown => keyboard::Layout::Unknown,
            KeyboardLayout::Qwerty => keyboard::Layout::Qwerty,
            KeyboardLayout::Qwertz => keyboard::Layout::Qwertz,
            KeyboardLayout::Azerty => keyboard::Layout::Azerty,
        };
        Self {
            layout: layout as i32,
            backlit: keyboard.backlit,
        }
    }
}

impl From<laptop::Weight> for Weight {
    fn from(weight: laptop::Weight) -> Self {
        match weight {
            laptop::Weight::WeightKg(kg) => Self::Kg(kg),
            laptop::Weight::WeightLb(lb) => Self::Lb(lb),
        }
    }
}

impl From<Weight> for laptop::Weight {
    fn from(weight: Weight) -> Self {
        match weight {
            Weight::Kg(kg) => Self::WeightKg(kg),
            Weight::Lb(lb) => Self::WeightLb(lb),
        }
    }
}

impl From<proto::Laptop> for Laptop {
    fn from(laptop: proto::Laptop) -> Self {
        Self {
            id: laptop.id,
            brand: laptop.brand,
            name: laptop.name,
            cpu: laptop.cpu.map(Into::into).unwrap_or_default(),
            ram: memory_or_default(laptop.ram),
            gpus: laptop.gpus.into_iter().map(Into::into).collect(),
            storages: laptop.storages.into_iter().map(Into::into).collect(),
            screen: laptop.screen.map(Into::into).unwrap_or_default(),
            keyboard: laptop.keyboard.map(Into::into).unwrap_or_default(),
            weight: laptop.weight.map(Into::into),
            price_usd: laptop.price_usd,
            release_year: laptop.release_year,
            // Timestamps outside `SystemTime`'s range are dropped.
            updated_at: laptop
                .updated_at
                .and_then(|ts| SystemTime::try_from(ts).ok()),
        }
    }
}

impl From<Laptop> for proto::Laptop {
    fn from(laptop: Laptop) -> Self {
        Self {
            id: laptop.id,
            brand: laptop.brand,
            name: laptop.name,
            cpu: Some(laptop.cpu.into()),
            ram: Some(laptop.ram.into()),
            gpus: laptop.gpus.into_iter().map(Into::into).collect(),
            storages: laptop.storages.into_iter().map(Into::into).collect(),
            screen: Some(laptop.screen.into()),
            keyboard: Some(laptop.keyboard.into()),
            weight: laptop.weight.map(Into::into),
            price_usd: laptop.price_usd,
            release_year: laptop.release_year,
            updated_at: laptop.updated_at.map(Into::into),
        }
    }
}

impl From<proto::Filter> for Filter {
    fn from(filter: proto::Filter) -> Self {
        Self {
            max_price_usd: filter.max_price_usd,
            min_cpu_cores: filter.min_cpu_cores,
            min_cpu_ghz: filter.min_cpu_ghz,
            min_ram: memory_or_default(filter.min_ram),
        }
    }
}

impl From<Filter> for proto::Filter {
    fn from(filter: Filter) -> Self {
        Self {
            max_price_usd: filter.max_price_usd,
            min_cpu_cores: filter.min_cpu_cores,
            min_cpu_ghz: filter.min_cpu_ghz,
            min_ram: Some(filter.min_ram.into()),
        }
    }
}

/// Builds the per-request reply of `RateLaptop`.
pub fn rate_response(laptop_id: String, rating: Rating) -> proto::RateLaptopResponse {
    proto::RateLaptopResponse {
        laptop_id,
        rated_count: rating.count,
        average_score: rating.average(),
    }
}
