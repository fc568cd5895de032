/*
 * Memory Management
 *
 * Ways of turning the physical VPMU region into a hardware window:
 *  - Direct map of physical memory (physmap)
 *  - RAM stand-in for machines without the device (`io::window::RamMapper`)
 */

pub mod physmap;

pub use physmap::{DirectMapMapper, PHYS_MAP_BASE};
