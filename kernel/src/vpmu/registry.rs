/*
 * VPMU Device Registry
 *
 * Owns every VPMU device, the hardware window they share and everything
 * acquired from the host to make them reachable.
 *
 * Registration is a transaction. Resources are acquired in this order:
 *   1. minor range under a fresh major   (alloc_chrdev_region)
 *   2. device class                      (class_create)
 *   3. hardware window                   (ioremap)
 *   4. device table
 *   5. one device per minor, in order    (cdev_add + device_create)
 * On any failure exactly what was acquired so far is released in reverse
 * order and a single `RegisterError` is reported. `unregister_all` performs
 * the same teardown for a fully registered driver and is idempotent.
 *
 * A device only becomes visible to `open` once it is in the table, and it
 * leaves the table before it is destroyed.
 */

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use crate::config::{VPMU_CDEVICE_NAME, VpmuParams};
use crate::io::chrdev::CharDevHost;
use crate::io::device::{DevNum, Errno, FileOperations, Inode};
use crate::io::file::OpenFile;
use crate::io::window::{HwWindow, RegionMapper};

use super::device::VpmuDevice;

/// Registration step that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterStage {
    /// Parameters rejected before anything was acquired
    Params,
    ChrdevRegion,
    Class,
    Window,
    DeviceTable,
    /// Construction of the device with this minor
    Device(u32),
    /// A driver instance is already registered
    AlreadyLoaded,
}

/// Driver registration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterError {
    pub stage: RegisterStage,
    pub errno: Errno,
}

impl RegisterError {
    pub const fn new(stage: RegisterStage, errno: Errno) -> Self {
        Self { stage, errno }
    }
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            RegisterStage::Params => write!(f, "invalid parameters: {}", self.errno),
            RegisterStage::ChrdevRegion => {
                write!(f, "minor range allocation failed: {}", self.errno)
            }
            RegisterStage::Class => write!(f, "device class creation failed: {}", self.errno),
            RegisterStage::Window => write!(f, "hardware window mapping failed: {}", self.errno),
            RegisterStage::DeviceTable => {
                write!(f, "device table allocation failed: {}", self.errno)
            }
            RegisterStage::Device(minor) => {
                write!(f, "construction of device {} failed: {}", minor, self.errno)
            }
            RegisterStage::AlreadyLoaded => write!(f, "driver already loaded: {}", self.errno),
        }
    }
}

/// The registered VPMU driver
pub struct VpmuRegistry {
    host: Box<dyn CharDevHost>,
    mapper: Box<dyn RegionMapper>,
    ndevices: u32,
    major: Option<u32>,
    class: bool,
    window: Option<Arc<dyn HwWindow>>,
    devices: Vec<Arc<VpmuDevice>>,
}

impl VpmuRegistry {
    /// Register `params.ndevices` devices with the host
    ///
    /// # Arguments
    /// * `params` - Device count, window location and transfer mode
    /// * `host` - Host character device layer
    /// * `mapper` - Provider of the hardware window
    ///
    /// # Returns
    /// The registry on success. On failure everything acquired has already
    /// been released.
    pub fn register_all(
        params: VpmuParams,
        host: Box<dyn CharDevHost>,
        mapper: Box<dyn RegionMapper>,
    ) -> Result<Self, RegisterError> {
        log::info!("VPMU: register_device() is called.");

        if params.ndevices <= 0 {
            log::warn!("VPMU: Invalid value of vpmu_ndevices: {}", params.ndevices);
            return Err(RegisterError::new(RegisterStage::Params, Errno::EINVAL));
        }

        let mut registry = Self {
            host,
            mapper,
            ndevices: params.ndevices as u32,
            major: None,
            class: false,
            window: None,
            devices: Vec::new(),
        };

        if let Err(err) = registry.build(&params) {
            log::warn!("VPMU: registration failed, {}", err);
            registry.unregister_all();
            return Err(err);
        }

        Ok(registry)
    }

    fn build(&mut self, params: &VpmuParams) -> Result<(), RegisterError> {
        let major = self
            .host
            .alloc_chrdev_region(self.ndevices, VPMU_CDEVICE_NAME)
            .map_err(|err| RegisterError::new(RegisterStage::ChrdevRegion, err))?;
        self.major = Some(major);
        log::info!(
            "VPMU: registered character device with major number = {} and minor numbers 0...{}",
            major,
            self.ndevices - 1
        );

        self.host
            .class_create(VPMU_CDEVICE_NAME)
            .map_err(|err| RegisterError::new(RegisterStage::Class, err))?;
        self.class = true;

        let window = self
            .mapper
            .ioremap(params.iomem_base, params.iomem_size)
            .map_err(|err| RegisterError::new(RegisterStage::Window, err))?;
        self.window = Some(window.clone());

        self.devices
            .try_reserve_exact(self.ndevices as usize)
            .map_err(|_| RegisterError::new(RegisterStage::DeviceTable, Errno::ENOMEM))?;

        for minor in 0..self.ndevices {
            let device = VpmuDevice::construct(
                DevNum::new(major, minor),
                params.iomem_size,
                window.clone(),
                params.mode,
                self.host.as_mut(),
            )
            .map_err(|err| RegisterError::new(RegisterStage::Device(minor), err))?;
            self.devices.push(device);
        }

        Ok(())
    }

    /// Tear down every device, then the window, class and minor range
    ///
    /// Safe to call on a partially registered driver and more than once.
    pub fn unregister_all(&mut self) {
        if self.major.is_some() {
            log::info!("VPMU: unregister_device() is called");
        }

        while let Some(device) = self.devices.pop() {
            device.destroy(self.host.as_mut());
        }

        if let Some(window) = self.window.take() {
            self.mapper.iounmap(window);
        }

        if core::mem::take(&mut self.class) {
            self.host.class_destroy(VPMU_CDEVICE_NAME);
        }

        if let Some(major) = self.major.take() {
            self.host.unregister_chrdev_region(major, self.ndevices);
        }
    }

    /// Open the device an inode refers to
    ///
    /// Fails with ENODEV when the inode's major is not ours, its minor is
    /// out of range, or its binding is not the device's current one.
    pub fn open(&self, inode: &Inode) -> Result<OpenFile, Errno> {
        let DevNum { major, minor } = inode.devnum;
        let device = match self.major {
            Some(ours) if ours == major => self.devices.get(minor as usize),
            _ => None,
        };

        let Some(device) = device else {
            log::warn!("VPMU: No device found with minor={} and major={}", minor, major);
            return Err(Errno::ENODEV);
        };

        device.open(inode)?;
        Ok(OpenFile::new(device.clone(), *inode))
    }

    /// Open device `minor` through its own binding
    pub fn open_minor(&self, minor: u32) -> Result<OpenFile, Errno> {
        let inode = self.inode(minor).ok_or_else(|| {
            log::warn!("VPMU: No device found with minor={}", minor);
            Errno::ENODEV
        })?;
        self.open(&inode)
    }

    /// Inode the host would hand out for `minor`
    pub fn inode(&self, minor: u32) -> Option<Inode> {
        self.device(minor).map(|device| device.inode())
    }

    pub fn device(&self, minor: u32) -> Option<&Arc<VpmuDevice>> {
        self.devices.get(minor as usize)
    }

    /// Number of live devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Major number, while registered
    pub fn major(&self) -> Option<u32> {
        self.major
    }

    /// The shared hardware window, while registered
    pub fn window(&self) -> Option<&Arc<dyn HwWindow>> {
        self.window.as_ref()
    }
}

impl Drop for VpmuRegistry {
    fn drop(&mut self) {
        self.unregister_all();
    }
}
