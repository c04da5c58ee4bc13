mod disk;
mod interface;
mod memory;

pub use disk::*;
pub use interface::*;
pub use memory::*;
