/*
 * VPMU Character Device Driver
 *
 * Exposes the VPMU register region as one or more character devices. Each
 * device keeps a shadow copy of the region; reads refresh it from hardware
 * and writes push it back.
 *
 * - `device`   - per-minor state and the file handlers
 * - `registry` - registration and teardown of all devices
 * - `module`   - load/unload entry points and the global driver slot
 */

pub mod device;
pub mod module;
pub mod registry;

pub use device::{VpmuDevice, devnode_mode};
pub use module::{vpmu_module_exit, vpmu_module_init, with_registry};
pub use registry::{RegisterError, RegisterStage, VpmuRegistry};
