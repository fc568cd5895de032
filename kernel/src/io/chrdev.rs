/*
 * Host Character Device Interface
 *
 * The calls a driver makes into the host to become reachable as device
 * files: reserve a minor range under one major, create a device class, bind
 * each minor, and publish a node for it.
 *
 * The host implements this trait; the driver never assumes anything about
 * how nodes end up in the filesystem.
 */

use core::fmt::Write;

use bitflags::bitflags;
use heapless::String;

use super::device::{CdevId, DevNum, Errno};

/// Longest device node name the driver produces
pub const NODE_NAME_MAX: usize = 32;

/// Device node name
pub type NodeName = String<NODE_NAME_MAX>;

bitflags! {
    /// Permission bits of a published device node
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeMode: u16 {
        const OWNER_READ = 0o400;
        const OWNER_WRITE = 0o200;
        const GROUP_READ = 0o040;
        const GROUP_WRITE = 0o020;
        const OTHER_READ = 0o004;
        const OTHER_WRITE = 0o002;

        const OWNER_RW = Self::OWNER_READ.bits() | Self::OWNER_WRITE.bits();
        const ALL_RW = Self::OWNER_RW.bits()
            | Self::GROUP_READ.bits()
            | Self::GROUP_WRITE.bits()
            | Self::OTHER_READ.bits()
            | Self::OTHER_WRITE.bits();
    }
}

/// Build `<prefix>-<minor>`
pub fn node_name(prefix: &str, minor: u32) -> Result<NodeName, Errno> {
    let mut name = NodeName::new();
    write!(name, "{}-{}", prefix, minor).map_err(|_| Errno::EINVAL)?;
    Ok(name)
}

/// Character device services provided by the host
pub trait CharDevHost: Send {
    /// Reserve `count` minors starting at 0 under a fresh major
    fn alloc_chrdev_region(&mut self, count: u32, name: &str) -> Result<u32, Errno>;

    /// Give back a range reserved with `alloc_chrdev_region`
    fn unregister_chrdev_region(&mut self, major: u32, count: u32);

    /// Create the device class nodes are published under
    fn class_create(&mut self, name: &str) -> Result<(), Errno>;

    fn class_destroy(&mut self, name: &str);

    /// Bind `devnum` to the driver; opens on it are routed to the driver
    fn cdev_add(&mut self, devnum: DevNum) -> Result<CdevId, Errno>;

    fn cdev_del(&mut self, cdev: CdevId);

    /// Publish a device node
    ///
    /// `mode` of `None` leaves the host default permissions.
    fn device_create(
        &mut self,
        devnum: DevNum,
        name: &str,
        mode: Option<NodeMode>,
    ) -> Result<(), Errno>;

    fn device_destroy(&mut self, devnum: DevNum);
}
