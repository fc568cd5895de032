/*
 * VPMU Driver
 *
 * Character device driver for a virtual performance monitoring unit. The
 * device registers of the VPMU are exposed as a byte stream: user reads
 * sample the registers and user writes program them, one machine word at a
 * time.
 *
 * The host kernel supplies its character-device layer (`CharDevHost`) and a
 * way of mapping the register region (`RegionMapper`), then loads the driver
 * with `vpmu_module_init`.
 */

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod io;
pub mod memory;
pub mod sync;
pub mod utils;
pub mod vpmu;

#[cfg(test)]
mod tests;

pub use config::{TransferMode, VpmuParams};
pub use io::{CharDevHost, Errno, Inode, OpenFile, RegionMapper};
pub use vpmu::{VpmuRegistry, vpmu_module_exit, vpmu_module_init, with_registry};
