/*
 * Hardware Window
 *
 * A hardware window is the contiguous region the VPMU registers are mapped
 * into. It is accessed one machine word at a time, addressed by word index
 * from the window base.
 *
 * Why this is a trait:
 * - The registry maps exactly one window and hands the same handle to every
 *   device, so sharing is explicit instead of a global base pointer
 * - `MmioWindow` drives real memory-mapped hardware through volatile accesses
 * - `RamWindow` stands in for the hardware in simulation and in tests
 *
 * The window itself is not synchronised. Two devices transferring at the same
 * time race on it, exactly as two CPUs racing on the real registers would.
 */

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use volatile::VolatilePtr;
use x86_64::PhysAddr;

use super::device::Errno;

/// Size in bytes of one hardware word
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// Word-addressed access to a mapped hardware region
pub trait HwWindow: Send + Sync {
    /// Length of the window in bytes
    fn len(&self) -> usize;

    /// Reads the word at `index` (word offset from the window base).
    fn read_word(&self, index: usize) -> usize;

    /// Writes `value` to the word at `index`.
    fn write_word(&self, index: usize, value: usize);

    /// Number of whole words the window holds
    fn words(&self) -> usize {
        self.len() / WORD_SIZE
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Memory-mapped hardware window
///
/// Every access is a single volatile load or store of one word, so the
/// compiler never merges, splits or elides register accesses.
pub struct MmioWindow {
    base: NonNull<usize>,
    len: usize,
}

// The window only ever performs volatile word accesses through `base`; the
// hardware region is valid for the lifetime of the mapping.
unsafe impl Send for MmioWindow {}
unsafe impl Sync for MmioWindow {}

impl MmioWindow {
    /// Create a window over an already mapped region.
    ///
    /// # Arguments
    /// * `base` - Virtual address the region is mapped at (word aligned)
    /// * `len` - Size of the mapping in bytes
    ///
    /// # Safety
    /// `base..base+len` must stay mapped to device memory for as long as the
    /// window exists, and `base` must be aligned to `WORD_SIZE`.
    pub unsafe fn new(base: NonNull<u8>, len: usize) -> Self {
        Self {
            base: base.cast(),
            len,
        }
    }

    fn word_ptr(&self, index: usize) -> VolatilePtr<'_, usize> {
        debug_assert!(index < self.words(), "MMIO word {} out of window", index);
        unsafe { VolatilePtr::new(NonNull::new_unchecked(self.base.as_ptr().add(index))) }
    }
}

impl HwWindow for MmioWindow {
    fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn read_word(&self, index: usize) -> usize {
        self.word_ptr(index).read()
    }

    #[inline(always)]
    fn write_word(&self, index: usize, value: usize) {
        self.word_ptr(index).write(value)
    }
}

/// RAM-backed window used when no VPMU hardware is present
///
/// Counts every word access so callers can check how many discrete hardware
/// operations a transfer issued.
pub struct RamWindow {
    words: Box<[AtomicUsize]>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl RamWindow {
    /// Create a zeroed window of `len` bytes (rounded down to whole words)
    pub fn new(len: usize) -> Self {
        let words: Vec<AtomicUsize> = (0..len / WORD_SIZE).map(|_| AtomicUsize::new(0)).collect();
        Self {
            words: words.into_boxed_slice(),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Word reads issued so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Word writes issued so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Set a word directly, bypassing the access counters
    pub fn poke(&self, index: usize, value: usize) {
        self.words[index].store(value, Ordering::Relaxed);
    }

    /// Get a word directly, bypassing the access counters
    pub fn peek(&self, index: usize) -> usize {
        self.words[index].load(Ordering::Relaxed)
    }
}

impl HwWindow for RamWindow {
    fn len(&self) -> usize {
        self.words.len() * WORD_SIZE
    }

    fn read_word(&self, index: usize) -> usize {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.words[index].load(Ordering::Relaxed)
    }

    fn write_word(&self, index: usize, value: usize) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.words[index].store(value, Ordering::Relaxed);
    }
}

/// Acquires and releases hardware windows (ioremap / iounmap)
pub trait RegionMapper: Send {
    /// Map `size` bytes of device memory starting at physical `base`
    fn ioremap(&mut self, base: PhysAddr, size: usize) -> Result<Arc<dyn HwWindow>, Errno>;

    /// Release a window previously returned by `ioremap`
    fn iounmap(&mut self, window: Arc<dyn HwWindow>);
}

/// Mapper handing out fresh RAM windows
#[derive(Default)]
pub struct RamMapper {
    mapped: usize,
}

impl RamMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Windows currently mapped
    pub fn mapped(&self) -> usize {
        self.mapped
    }
}

impl RegionMapper for RamMapper {
    fn ioremap(&mut self, base: PhysAddr, size: usize) -> Result<Arc<dyn HwWindow>, Errno> {
        if size < WORD_SIZE {
            return Err(Errno::EINVAL);
        }
        log::debug!("VPMU: simulated window of {} bytes for 0x{:x}", size, base.as_u64());
        self.mapped += 1;
        Ok(Arc::new(RamWindow::new(size)))
    }

    fn iounmap(&mut self, _window: Arc<dyn HwWindow>) {
        self.mapped = self.mapped.saturating_sub(1);
    }
}
