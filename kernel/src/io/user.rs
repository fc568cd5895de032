/*
 * User Memory Access
 *
 * Models copy_to_user / copy_from_user. A user buffer is either a borrowed
 * slice (tests, in-kernel callers) or a raw user pointer that has been
 * validated against the userspace address range first.
 *
 * A copy that does not fit the user buffer fails with EFAULT as a whole;
 * nothing is partially copied.
 */

use super::device::Errno;

/// Highest userspace address (exclusive), lower canonical half
pub const USER_SPACE_END: usize = 0x0000_8000_0000_0000;

/// Destination of a read: kernel data flows out to the user
pub trait UserWrite {
    /// Copy all of `src` to the user buffer
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), Errno>;
}

/// Source of a write: user data flows into the kernel
pub trait UserRead {
    /// Fill all of `dst` from the user buffer
    fn copy_from_user(&mut self, dst: &mut [u8]) -> Result<(), Errno>;
}

/// Validate a user pointer range
///
/// Checks that a range from userspace is:
/// - Not NULL
/// - Within userspace address range
/// - Does not overflow when adding len
pub fn validate_user_range(addr: usize, len: usize) -> Result<(), Errno> {
    if addr == 0 {
        return Err(Errno::EFAULT);
    }

    let end = addr.checked_add(len).ok_or(Errno::EFAULT)?;
    if end > USER_SPACE_END {
        return Err(Errno::EFAULT);
    }

    Ok(())
}

/// User buffer receiving data, backed by a mutable slice
pub struct UserSliceWriter<'a> {
    buf: &'a mut [u8],
}

impl<'a> UserSliceWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    /// Wrap a raw user pointer after validating its range
    ///
    /// # Safety
    /// If the range passes validation, `addr..addr+len` must be mapped,
    /// writable and not aliased for `'a`.
    pub unsafe fn from_raw(addr: usize, len: usize) -> Result<Self, Errno> {
        validate_user_range(addr, len)?;
        let buf = unsafe { core::slice::from_raw_parts_mut(addr as *mut u8, len) };
        Ok(Self { buf })
    }

    /// Capacity of the user buffer
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl UserWrite for UserSliceWriter<'_> {
    fn copy_to_user(&mut self, src: &[u8]) -> Result<(), Errno> {
        let dst = self.buf.get_mut(..src.len()).ok_or(Errno::EFAULT)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

/// User buffer supplying data, backed by a shared slice
pub struct UserSliceReader<'a> {
    buf: &'a [u8],
}

impl<'a> UserSliceReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Wrap a raw user pointer after validating its range
    ///
    /// # Safety
    /// If the range passes validation, `addr..addr+len` must be mapped and
    /// readable for `'a`.
    pub unsafe fn from_raw(addr: usize, len: usize) -> Result<Self, Errno> {
        validate_user_range(addr, len)?;
        let buf = unsafe { core::slice::from_raw_parts(addr as *const u8, len) };
        Ok(Self { buf })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl UserRead for UserSliceReader<'_> {
    fn copy_from_user(&mut self, dst: &mut [u8]) -> Result<(), Errno> {
        let src = self.buf.get(..dst.len()).ok_or(Errno::EFAULT)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}
