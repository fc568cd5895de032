/*
 * Module Entry Points
 *
 * The loaded driver lives in a single global slot. `vpmu_module_init`
 * registers the devices and fills the slot, `vpmu_module_exit` empties it
 * and tears everything down. Everything else reaches the registry through
 * `with_registry`.
 */

use alloc::boxed::Box;

use spin::Mutex;

use crate::config::VpmuParams;
use crate::io::chrdev::CharDevHost;
use crate::io::device::Errno;
use crate::io::window::RegionMapper;

use super::registry::{RegisterError, RegisterStage, VpmuRegistry};

static VPMU: Mutex<Option<VpmuRegistry>> = Mutex::new(None);

/// Load the driver
///
/// Fails with EBUSY if the driver is already loaded.
pub fn vpmu_module_init(
    params: VpmuParams,
    host: Box<dyn CharDevHost>,
    mapper: Box<dyn RegionMapper>,
) -> Result<(), RegisterError> {
    let mut slot = VPMU.lock();
    if slot.is_some() {
        log::warn!("VPMU: driver already loaded");
        return Err(RegisterError::new(RegisterStage::AlreadyLoaded, Errno::EBUSY));
    }

    *slot = Some(VpmuRegistry::register_all(params, host, mapper)?);
    Ok(())
}

/// Unload the driver; does nothing if it is not loaded
pub fn vpmu_module_exit() {
    // Teardown runs under the slot lock so no caller sees a half-dismantled registry.
    let mut slot = VPMU.lock();
    if let Some(mut registry) = slot.take() {
        registry.unregister_all();
    }
}

/// Run `f` against the loaded driver
///
/// # Returns
/// ENODEV if the driver is not loaded
pub fn with_registry<R>(f: impl FnOnce(&VpmuRegistry) -> R) -> Result<R, Errno> {
    let slot = VPMU.lock();
    slot.as_ref().map(f).ok_or(Errno::ENODEV)
}
