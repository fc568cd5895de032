/*
 * Character Device Abstraction Layer
 *
 * File operation table for character devices, in the shape the host's
 * character-device layer dispatches to: open/release per handle and
 * positioned read/write calls carrying the caller's stream offset.
 *
 * Errors are POSIX errno values, returned negated at the syscall boundary.
 */

use core::fmt;

use super::user::{UserRead, UserWrite};
use crate::sync::SignalSource;

/// Device number (major identifies the driver, minor the instance)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DevNum {
    pub major: u32,
    pub minor: u32,
}

impl DevNum {
    /// Build a device number from its parts (MKDEV)
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for DevNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Token handed out by the host when a minor is bound to a driver (cdev_add)
///
/// An inode carries the token of the binding it was created through, which
/// lets `open` detect a node that no longer belongs to the device it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CdevId(pub u64);

/// The part of an inode a character device cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub devnum: DevNum,
    pub cdev: CdevId,
}

/// File operation table for a character device
///
/// `pos` is the caller's stream offset. Implementations read and update it
/// only while holding whatever lock protects the device state.
pub trait FileOperations: Send + Sync {
    /// Prepare the device for a new handle opened through `inode`
    fn open(&self, inode: &Inode) -> Result<(), Errno>;

    /// Called when a handle is closed
    fn release(&self, _inode: &Inode) -> Result<(), Errno> {
        Ok(())
    }

    /// Copy up to `count` bytes starting at `*pos` into `out`
    ///
    /// Returns the number of bytes transferred, 0 at end of stream.
    fn read(
        &self,
        out: &mut dyn UserWrite,
        count: usize,
        pos: &mut u64,
        signals: &dyn SignalSource,
    ) -> Result<usize, Errno>;

    /// Copy up to `count` bytes from `src` into the device starting at `*pos`
    fn write(
        &self,
        src: &mut dyn UserRead,
        count: usize,
        pos: &mut u64,
        signals: &dyn SignalSource,
    ) -> Result<usize, Errno>;

    /// Get device metadata
    fn stat(&self) -> Stat;
}

/// POSIX errno values
///
/// Subset of standard POSIX error codes used by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    EINTR = 4,   // Interrupted system call
    ENOMEM = 12, // Out of memory
    EFAULT = 14, // Bad address
    EBUSY = 16,  // Device or resource busy
    ENODEV = 19, // No such device
    EINVAL = 22, // Invalid argument
}

impl Errno {
    /// Negative value returned through the syscall ABI
    pub const fn as_isize(self) -> isize {
        -(self as i32 as isize)
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Errno::EINTR => write!(f, "Interrupted system call"),
            Errno::ENOMEM => write!(f, "Out of memory"),
            Errno::EFAULT => write!(f, "Bad address"),
            Errno::EBUSY => write!(f, "Device or resource busy"),
            Errno::ENODEV => write!(f, "No such device"),
            Errno::EINVAL => write!(f, "Invalid argument"),
        }
    }
}

/// Minimal stat structure
///
/// Subset of POSIX struct stat, focusing on st_mode for type checking.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Stat {
    pub st_mode: u32,    // File type and mode
    pub st_size: u64,    // File size in bytes
    pub st_rdev: DevRaw, // Device number of a special file
}

/// Device number packed the way `st_rdev` stores it
pub type DevRaw = u64;

/// Pack a device number for `st_rdev` (major in the high half)
pub const fn pack_devnum(devnum: DevNum) -> DevRaw {
    ((devnum.major as u64) << 32) | devnum.minor as u64
}

// File type constants (POSIX)
pub const S_IFMT: u32 = 0o170000; // File type mask
pub const S_IFCHR: u32 = 0o020000; // Character device

// Seek whence constants (POSIX)
pub const SEEK_SET: i32 = 0; // Seek from beginning
pub const SEEK_CUR: i32 = 1; // Seek from current position
pub const SEEK_END: i32 = 2; // Seek from end

/// Check if mode indicates a character device
#[inline]
#[allow(non_snake_case)]
pub fn S_ISCHR(mode: u32) -> bool {
    (mode & S_IFMT) == S_IFCHR
}
