//! # Laptop record model
//!
//! Plain owned values describing an inventory entry. Stores hand these out by
//! value (`Clone`), so a caller can never reach back into stored state.

use std::time::SystemTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An inventory entry.
///
/// `id` is empty until the record is created; the store either validates a
/// caller-supplied UUID or mints a fresh one, and never changes it afterwards.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Laptop {
    pub id: String,
    pub brand: String,
    pub name: String,
    pub cpu: Cpu,
    pub ram: Memory,
    pub gpus: Vec<Gpu>,
    pub storages: Vec<Storage>,
    pub screen: Screen,
    pub keyboard: Keyboard,
    pub weight: Option<Weight>,
    pub price_usd: f64,
    pub release_year: u32,
    pub updated_at: Option<SystemTime>,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cpu {
    pub brand: String,
    pub name: String,
    pub number_cores: u32,
    pub number_threads: u32,
    pub min_ghz: f64,
    pub max_ghz: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gpu {
    pub brand: String,
    pub name: String,
    pub min_ghz: f64,
    pub max_ghz: f64,
    pub memory: Memory,
}

/// A memory size expressed in some [`MemoryUnit`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Memory {
    pub value: u64,
    pub unit: MemoryUnit,
}

impl Memory {
    pub const fn new(value: u64, unit: MemoryUnit) -> Self {
        Self { value, unit }
    }

    /// Size in bits.
    ///
    /// An [`MemoryUnit::Unknown`] unit counts as zero bits. Values too large to
    /// fit in a `u64` saturate at `u64::MAX`.
    pub const fn to_bits(&self) -> u64 {
        match self.unit.bit_shift() {
            Some(shift) => self.value.saturating_mul(1 << shift),
            None => 0,
        }
    }
}

/// Memory units on a power-of-two ladder: each step above `Byte` is 2^10 of
/// the previous one. This is intentionally not the SI decimal scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemoryUnit {
    #[default]
    Unknown,
    Bit,
    Byte,
    Kilobyte,
    Megabyte,
    Gigabyte,
    Terabyte,
}

impl MemoryUnit {
    /// Left shift that converts one unit into bits.
    pub const fn bit_shift(self) -> Option<u32> {
        match self {
            Self::Unknown => None,
            Self::Bit => Some(0),
            Self::Byte => Some(3),
            Self::Kilobyte => Some(13),
            Self::Megabyte => Some(23),
            Self::Gigabyte => Some(33),
            Self::Terabyte => Some(43),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Storage {
    pub driver: StorageDriver,
    pub memory: Memory,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StorageDriver {
    #[default]
    Unknown,
    Hdd,
    Ssd,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Screen {
    pub size_inch: f32,
    pub resolution: Resolution,
    pub panel: Panel,
    pub multitouch: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Panel {
    #[default]
    Unknown,
    Ips,
    Oled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keyboard {
    pub layout: KeyboardLayout,
    pub backlit: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyboardLayout {
    #[default]
    Unknown,
    Qwerty,
    Qwertz,
    Azerty,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Weight {
    Kg(f64),
    Lb(f64),
}
