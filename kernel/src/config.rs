/*
 * VPMU Configuration
 *
 * Compile-time description of the VPMU hardware region and the load-time
 * parameters of the driver.
 */

use x86_64::PhysAddr;

/// Driver name; device nodes are published as `<name>-<minor>`
pub const VPMU_CDEVICE_NAME: &str = "vpmu-device";

/// Physical base of the VPMU register region
pub const VPMU_DEVICE_BASE_ADDR: u64 = 0xfd00_0000;

/// Size of the VPMU register region, and of every shadow buffer
pub const VPMU_DEVICE_IOMEM_SIZE: usize = 4096;

/// Default value of the `vpmu_ndevices` parameter
pub const VPMU_DEFAULT_NDEVICES: i32 = 1;

/// Whether handlers move data to and from the hardware window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Reads refresh from and writes push to the hardware window
    Hardware,
    /// Hardware transfers are skipped; only the shadow buffer is used
    DryRun,
}

impl TransferMode {
    /// Mode selected by the `dry-run` cargo feature
    pub const fn build_default() -> Self {
        if cfg!(feature = "dry-run") {
            TransferMode::DryRun
        } else {
            TransferMode::Hardware
        }
    }

    pub const fn touches_hardware(self) -> bool {
        matches!(self, TransferMode::Hardware)
    }
}

/// Load-time driver parameters
#[derive(Debug, Clone, Copy)]
pub struct VpmuParams {
    /// Number of device instances (`vpmu_ndevices`), must be positive
    pub ndevices: i32,
    /// Physical base of the hardware window
    pub iomem_base: PhysAddr,
    /// Window size in bytes, also the per-device buffer size
    pub iomem_size: usize,
    pub mode: TransferMode,
}

impl VpmuParams {
    /// Default parameters with a different device count
    pub fn with_devices(ndevices: i32) -> Self {
        Self {
            ndevices,
            ..Self::default()
        }
    }
}

impl Default for VpmuParams {
    fn default() -> Self {
        Self {
            ndevices: VPMU_DEFAULT_NDEVICES,
            iomem_base: PhysAddr::new(VPMU_DEVICE_BASE_ADDR),
            iomem_size: VPMU_DEVICE_IOMEM_SIZE,
            mode: TransferMode::build_default(),
        }
    }
}
