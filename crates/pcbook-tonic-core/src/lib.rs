#![doc = include_str!("../README.md")]

mod common;
pub use common::*;
// Public re-export so downstream crates can reach the domain types via
// `pcbook_tonic_core::pcbook`
pub use pcbook;
