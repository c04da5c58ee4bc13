#![doc = include_str!("../README.md")]

mod blob;
mod cancel;
mod error;
mod filter;
mod laptop;
mod rating;
mod store;

pub use crate::blob::*;
pub use crate::cancel::*;
pub use crate::error::*;
pub use crate::filter::*;
pub use crate::laptop::*;
pub use crate::rating::*;
pub use crate::store::*;
