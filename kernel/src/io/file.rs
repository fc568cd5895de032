/*
 * Open File Handle
 *
 * An open handle on a character device: the operation table it was opened
 * through, the inode it came from and its own stream offset.
 *
 * The offset belongs to the handle. Every read or write lends it to the
 * device as `&mut u64`, and the device only touches it under its lock.
 */

use alloc::sync::Arc;

use super::device::{Errno, FileOperations, Inode, SEEK_CUR, SEEK_END, SEEK_SET, Stat};
use super::user::{UserRead, UserSliceReader, UserSliceWriter, UserWrite};
use crate::sync::{NoSignals, SignalSource};

/// Open handle on a character device
pub struct OpenFile {
    ops: Arc<dyn FileOperations>,
    inode: Inode,
    pos: u64,
}

impl OpenFile {
    /// Wrap an operation table that has already accepted `open`
    pub fn new(ops: Arc<dyn FileOperations>, inode: Inode) -> Self {
        Self { ops, inode, pos: 0 }
    }

    /// Inode this handle was opened through
    pub fn inode(&self) -> &Inode {
        &self.inode
    }

    /// Current stream offset
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Read up to `buf.len()` bytes at the current offset
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Errno> {
        let count = buf.len();
        self.read_from(&mut UserSliceWriter::new(buf), count, &NoSignals)
    }

    /// Write `buf` at the current offset
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, Errno> {
        let count = buf.len();
        self.write_to(&mut UserSliceReader::new(buf), count, &NoSignals)
    }

    /// Read with an explicit user destination, count and signal source
    ///
    /// `count` may exceed what `out` can hold; the device then faults with
    /// EFAULT when it copies out.
    pub fn read_from(
        &mut self,
        out: &mut dyn UserWrite,
        count: usize,
        signals: &dyn SignalSource,
    ) -> Result<usize, Errno> {
        self.ops.read(out, count, &mut self.pos, signals)
    }

    /// Write with an explicit user source, count and signal source
    pub fn write_to(
        &mut self,
        src: &mut dyn UserRead,
        count: usize,
        signals: &dyn SignalSource,
    ) -> Result<usize, Errno> {
        self.ops.write(src, count, &mut self.pos, signals)
    }

    /// Reposition the stream offset (lseek)
    ///
    /// `SEEK_END` is relative to the size reported by `stat`. Returns the new
    /// offset; a negative result or unknown whence is EINVAL.
    pub fn seek(&mut self, offset: i64, whence: i32) -> Result<u64, Errno> {
        let base = match whence {
            SEEK_SET => 0,
            SEEK_CUR => self.pos as i64,
            SEEK_END => self.ops.stat().st_size as i64,
            _ => return Err(Errno::EINVAL),
        };
        let target = base.checked_add(offset).ok_or(Errno::EINVAL)?;
        if target < 0 {
            return Err(Errno::EINVAL);
        }
        self.pos = target as u64;
        Ok(self.pos)
    }

    /// Device metadata (fstat)
    pub fn stat(&self) -> Stat {
        self.ops.stat()
    }

    /// Close the handle
    pub fn release(self) -> Result<(), Errno> {
        self.ops.release(&self.inode)
    }
}
