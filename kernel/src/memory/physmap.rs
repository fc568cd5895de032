/*
 * Physical Memory Direct Map (Physmap)
 *
 * Kernels that map all of physical memory at a fixed virtual offset can
 * reach device memory without creating a new mapping: the virtual address of
 * physical `p` is simply `phys_offset + p`.
 *
 * `DirectMapMapper` hands out hardware windows that way. "ioremap" only
 * translates and validates the range, and "iounmap" has nothing to undo.
 *
 * MEMORY LAYOUT:
 * ```
 * phys_offset                ← physical 0
 * ...                        [direct map of physical memory]
 * phys_offset + max_phys     ← end of the direct map
 * ```
 */

use alloc::sync::Arc;
use core::ptr::NonNull;

use x86_64::{PhysAddr, VirtAddr};

use crate::io::device::Errno;
use crate::io::window::{HwWindow, MmioWindow, RegionMapper, WORD_SIZE};

/// Conventional base of a higher-half direct map
pub const PHYS_MAP_BASE: u64 = 0xffff_8000_0000_0000;

/// Region mapper for a kernel with a physical memory direct map
pub struct DirectMapMapper {
    phys_offset: u64,
    max_phys: u64,
}

impl DirectMapMapper {
    /// Create a mapper for a direct map at `phys_offset`
    ///
    /// # Arguments
    /// * `phys_offset` - Virtual address physical 0 is mapped at
    /// * `max_phys` - Highest physical address + 1 covered by the map
    ///
    /// # Safety
    /// `[phys_offset, phys_offset + max_phys)` must be mapped, and stay
    /// mapped, onto physical `[0, max_phys)` with attributes suitable for
    /// device memory.
    pub const unsafe fn new(phys_offset: u64, max_phys: u64) -> Self {
        Self {
            phys_offset,
            max_phys,
        }
    }

    /// Convert a physical address to its direct map virtual address
    ///
    /// # Returns
    /// `None` if `phys` is outside the map or the result is not canonical
    pub fn phys_to_virt(&self, phys: PhysAddr) -> Option<VirtAddr> {
        if phys.as_u64() >= self.max_phys {
            return None;
        }
        let virt = self.phys_offset.checked_add(phys.as_u64())?;
        VirtAddr::try_new(virt).ok()
    }
}

impl RegionMapper for DirectMapMapper {
    fn ioremap(&mut self, base: PhysAddr, size: usize) -> Result<Arc<dyn HwWindow>, Errno> {
        let end = base.as_u64().checked_add(size as u64).ok_or(Errno::EINVAL)?;
        if size < WORD_SIZE || end > self.max_phys {
            log::warn!(
                "VPMU: cannot map [0x{:x}..0x{:x}), direct map ends at 0x{:x}",
                base.as_u64(),
                end,
                self.max_phys
            );
            return Err(Errno::EINVAL);
        }

        let virt = self.phys_to_virt(base).ok_or(Errno::EINVAL)?;
        if virt.as_u64() % WORD_SIZE as u64 != 0 {
            return Err(Errno::EINVAL);
        }
        let ptr = NonNull::new(virt.as_mut_ptr::<u8>()).ok_or(Errno::EINVAL)?;

        log::debug!(
            "VPMU: window 0x{:x} ({} bytes) at 0x{:x}",
            base.as_u64(),
            size,
            virt.as_u64()
        );

        // The range lies inside the direct map, which `new` requires to be valid.
        let window = unsafe { MmioWindow::new(ptr, size) };
        Ok(Arc::new(window))
    }

    fn iounmap(&mut self, _window: Arc<dyn HwWindow>) {}
}
