/*
 * Input/Output System
 *
 * Character device interface, host device-node services, user memory
 * copies, hardware windows and the word transfer engine between them.
 */

pub mod chrdev;
pub mod device;
pub mod file;
pub mod transfer;
pub mod user;
pub mod window;

pub use chrdev::{CharDevHost, NodeMode, NodeName};
pub use device::{CdevId, DevNum, Errno, FileOperations, Inode, S_IFCHR, S_IFMT, Stat};
pub use file::OpenFile;
pub use user::{UserRead, UserSliceReader, UserSliceWriter, UserWrite};
pub use window::{HwWindow, MmioWindow, RamMapper, RamWindow, RegionMapper, WORD_SIZE};
