/*
 * VPMU Device State and File Handlers
 *
 * One `VpmuDevice` per minor number. It owns the shadow buffer that user
 * reads and writes go through, and the lock that serialises every access to
 * that buffer and to the caller's stream offset.
 *
 * Shadow buffer lifecycle:
 * - Unallocated: after construction, until the first successful open
 * - Allocated:   exactly `buffer_size` zeroed bytes, kept across close/reopen
 * - Released:    after teardown; every handler reports ENODEV from here on
 *
 * Read path:  lock -> clamp -> refresh window from hardware -> copy out -> advance
 * Write path: lock -> clamp -> copy in -> advance -> push window to hardware
 *
 * Hardware transfers always start at the window base; the shadow window being
 * refreshed or pushed is `[pos, pos + count)` as it was before the advance.
 */

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::{TransferMode, VPMU_CDEVICE_NAME};
use crate::io::chrdev::{CharDevHost, NodeMode, NodeName, node_name};
use crate::io::device::{CdevId, DevNum, Errno, FileOperations, Inode, S_IFCHR, Stat, pack_devnum};
use crate::io::transfer;
use crate::io::user::{UserRead, UserWrite};
use crate::io::window::HwWindow;
use crate::sync::{KillableMutex, SignalSource};

/// Shadow buffer state of one device
pub(crate) enum Shadow {
    Unallocated,
    Allocated(Vec<u8>),
    Released,
}

impl Shadow {
    fn buffer_mut(&mut self) -> Result<&mut [u8], Errno> {
        match self {
            Shadow::Allocated(buffer) => Ok(buffer),
            Shadow::Unallocated | Shadow::Released => Err(Errno::ENODEV),
        }
    }
}

/// Allocate a zeroed shadow buffer, ENOMEM if the heap refuses
fn alloc_shadow(size: usize) -> Result<Vec<u8>, Errno> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(size).map_err(|_| Errno::ENOMEM)?;
    buffer.resize(size, 0);
    Ok(buffer)
}

/// Node permissions for a minor; `None` keeps the host default
///
/// Minors 0 and 2 are world read/write so unprivileged tools can sample them.
pub fn devnode_mode(minor: u32) -> Option<NodeMode> {
    match minor {
        0 | 2 => Some(NodeMode::ALL_RW),
        _ => None,
    }
}

/// Per-minor VPMU device
pub struct VpmuDevice {
    devnum: DevNum,
    cdev: CdevId,
    name: NodeName,
    buffer_size: usize,
    mode: TransferMode,
    window: Arc<dyn HwWindow>,
    shadow: KillableMutex<Shadow>,
}

impl VpmuDevice {
    /// Device state with an unallocated buffer, not yet known to the host
    pub(crate) fn new(
        devnum: DevNum,
        cdev: CdevId,
        name: NodeName,
        buffer_size: usize,
        window: Arc<dyn HwWindow>,
        mode: TransferMode,
    ) -> Self {
        Self {
            devnum,
            cdev,
            name,
            buffer_size,
            mode,
            window,
            shadow: KillableMutex::new(Shadow::Unallocated),
        }
    }

    /// Set up the device and make it reachable through the host
    ///
    /// Binds the minor and publishes `vpmu-device-<minor>`. If publishing
    /// fails the binding is removed again before the error is returned.
    pub fn construct(
        devnum: DevNum,
        buffer_size: usize,
        window: Arc<dyn HwWindow>,
        mode: TransferMode,
        host: &mut dyn CharDevHost,
    ) -> Result<Arc<Self>, Errno> {
        let name = node_name(VPMU_CDEVICE_NAME, devnum.minor)?;

        let cdev = host.cdev_add(devnum).map_err(|err| {
            log::warn!("VPMU: Error {} while trying to add {}", err, name);
            err
        })?;

        if let Err(err) = host.device_create(devnum, &name, devnode_mode(devnum.minor)) {
            log::warn!("VPMU: Error {} while trying to create {}", err, name);
            host.cdev_del(cdev);
            return Err(err);
        }

        log::debug!("VPMU: constructed {} ({})", name, devnum);
        Ok(Arc::new(Self::new(devnum, cdev, name, buffer_size, window, mode)))
    }

    /// Remove the device from the host and free its buffer
    ///
    /// Must not race with construction; the registry calls it once per device.
    pub fn destroy(&self, host: &mut dyn CharDevHost) {
        host.device_destroy(self.devnum);
        host.cdev_del(self.cdev);
        *self.shadow.lock() = Shadow::Released;
        log::debug!("VPMU: destroyed {}", self.name);
    }

    pub fn devnum(&self) -> DevNum {
        self.devnum
    }

    /// Binding token the minor was registered with
    pub fn cdev(&self) -> CdevId {
        self.cdev
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Whether the shadow buffer has been allocated
    pub fn is_allocated(&self) -> bool {
        matches!(*self.shadow.lock(), Shadow::Allocated(_))
    }

    /// Inode for a node bound to this device
    pub fn inode(&self) -> Inode {
        Inode {
            devnum: self.devnum,
            cdev: self.cdev,
        }
    }

    /// Shadow buffer lock, for tests that need to hold or inspect it
    #[cfg(test)]
    pub(crate) fn shadow(&self) -> &KillableMutex<Shadow> {
        &self.shadow
    }

    /// Start of the transfer window, `None` once `pos` reached the end
    fn window_start(&self, pos: u64) -> Option<usize> {
        if pos >= self.buffer_size as u64 {
            None
        } else {
            Some(pos as usize)
        }
    }
}

impl FileOperations for VpmuDevice {
    fn open(&self, inode: &Inode) -> Result<(), Errno> {
        if inode.devnum != self.devnum || inode.cdev != self.cdev {
            log::warn!("VPMU: open() internal error");
            return Err(Errno::ENODEV);
        }

        // Allocated at most once; later opens see the data left behind.
        let mut shadow = self.shadow.lock();
        match *shadow {
            Shadow::Allocated(_) => {}
            Shadow::Unallocated => {
                let buffer = alloc_shadow(self.buffer_size).map_err(|err| {
                    log::warn!("VPMU: open() out of memory");
                    err
                })?;
                *shadow = Shadow::Allocated(buffer);
            }
            Shadow::Released => return Err(Errno::ENODEV),
        }

        log::info!("VPMU: Device {} Open", self.name);
        Ok(())
    }

    fn release(&self, _inode: &Inode) -> Result<(), Errno> {
        log::info!("VPMU: Device Release");
        Ok(())
    }

    fn read(
        &self,
        out: &mut dyn UserWrite,
        count: usize,
        pos: &mut u64,
        signals: &dyn SignalSource,
    ) -> Result<usize, Errno> {
        let mut shadow = self.shadow.lock_killable(signals)?;

        log::debug!(
            "VPMU: Device file {} is read at offset = {}, read bytes count = {}",
            self.name,
            *pos,
            count
        );

        let buffer = shadow.buffer_mut()?;
        let Some(start) = self.window_start(*pos) else {
            return Ok(0);
        };
        let count = count.min(self.buffer_size - start);
        let span = &mut buffer[start..start + count];

        if self.mode.touches_hardware() {
            transfer::read_words(span, &*self.window, count);
        }

        out.copy_to_user(span)?;

        *pos += count as u64;
        Ok(count)
    }

    fn write(
        &self,
        src: &mut dyn UserRead,
        count: usize,
        pos: &mut u64,
        signals: &dyn SignalSource,
    ) -> Result<usize, Errno> {
        let mut shadow = self.shadow.lock_killable(signals)?;

        log::debug!(
            "VPMU: Device file {} is write at offset = {}, write bytes count = {}",
            self.name,
            *pos,
            count
        );

        let buffer = shadow.buffer_mut()?;
        let Some(start) = self.window_start(*pos) else {
            // Writing beyond the end of the buffer is not allowed.
            return Err(Errno::EINVAL);
        };
        let count = count.min(self.buffer_size - start);
        let span = &mut buffer[start..start + count];

        src.copy_from_user(span)?;

        *pos += count as u64;

        if self.mode.touches_hardware() {
            let pushed = transfer::write_words(&*self.window, span, count);
            if pushed != count {
                log::debug!("VPMU: {} trailing bytes not pushed to hardware", count - pushed);
            }
        }

        Ok(count)
    }

    fn stat(&self) -> Stat {
        let perms = devnode_mode(self.devnum.minor).unwrap_or(NodeMode::OWNER_RW);
        Stat {
            st_mode: S_IFCHR | perms.bits() as u32,
            st_size: self.buffer_size as u64,
            st_rdev: pack_devnum(self.devnum),
        }
    }
}
