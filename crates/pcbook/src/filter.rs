use crate::{Laptop, Memory};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Search predicate over laptops. Never stored.
///
/// A laptop qualifies when every bound holds, all inclusive:
///
/// - `price_usd <= max_price_usd`
/// - `cpu.number_cores >= min_cpu_cores`
/// - `cpu.min_ghz >= min_cpu_ghz`
/// - `ram` in bits `>= min_ram` in bits
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Filter {
    pub max_price_usd: f64,
    pub min_cpu_cores: u32,
    pub min_cpu_ghz: f64,
    pub min_ram: Memory,
}

impl Filter {
    pub fn matches(&self, laptop: &Laptop) -> bool {
        laptop.price_usd <= self.max_price_usd
            && laptop.cpu.number_cores >= self.min_cpu_cores
            && laptop.cpu.min_ghz >= self.min_cpu_ghz
            && laptop.ram.to_bits() >= self.min_ram.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cpu, MemoryUnit};

    fn laptop(price: f64, cores: u32, ghz: f64, ram: Memory) -> Laptop {
        Laptop {
            cpu: Cpu {
                number_cores: cores,
                min_ghz: ghz,
                ..Cpu::default()
            },
            ram,
            price_usd: price,
            ..Laptop::default()
        }
    }

    fn filter() -> Filter {
        Filter {
            max_price_usd: 2000.0,
            min_cpu_cores: 4,
            min_cpu_ghz: 2.5,
            min_ram: Memory::new(8, MemoryUnit::Gigabyte),
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let exact = laptop(2000.0, 4, 2.5, Memory::new(8, MemoryUnit::Gigabyte));
        assert!(filter().matches(&exact));
    }

    #[test]
    fn each_bound_rejects_independently() {
        let ram = Memory::new(16, MemoryUnit::Gigabyte);
        assert!(!filter().matches(&laptop(2000.01, 8, 3.0, ram)));
        assert!(!filter().matches(&laptop(1500.0, 3, 3.0, ram)));
        assert!(!filter().matches(&laptop(1500.0, 8, 2.4, ram)));
        assert!(!filter().matches(&laptop(
            1500.0,
            8,
            3.0,
            Memory::new(4, MemoryUnit::Gigabyte)
        )));
        assert!(filter().matches(&laptop(1500.0, 8, 3.0, ram)));
    }

    #[test]
    fn ram_compares_in_bits_across_units() {
        // 8 GiB expressed in megabytes is exactly the bound.
        let mb = laptop(1000.0, 4, 3.0, Memory::new(8 * 1024, MemoryUnit::Megabyte));
        assert!(filter().matches(&mb));

        let short = laptop(1000.0, 4, 3.0, Memory::new(8 * 1024 - 1, MemoryUnit::Megabyte));
        assert!(!filter().matches(&short));
    }

    #[test]
    fn default_filter_only_admits_free_laptops() {
        let free = laptop(0.0, 0, 0.0, Memory::default());
        let paid = laptop(1.0, 0, 0.0, Memory::default());
        assert!(Filter::default().matches(&free));
        assert!(!Filter::default().matches(&paid));
    }
}
