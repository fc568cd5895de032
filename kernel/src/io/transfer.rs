/*
 * Word Transfer Engine
 *
 * Moves bytes between a shadow buffer and a hardware window one machine word
 * at a time. Word `i` of the transfer always targets word `i` of the window,
 * counted from the window base.
 *
 * Only whole words are transferred: for a byte count that is not a multiple
 * of WORD_SIZE the trailing remainder is left untouched on both sides. Both
 * functions return the number of bytes actually moved so callers can see the
 * truncation.
 *
 * There is no buffering, batching or retry. Bounds against the window are
 * the caller's business; the window implementation decides what an
 * out-of-range word means.
 */

use super::window::{HwWindow, WORD_SIZE};

/// Number of bytes a transfer of `byte_count` bytes actually moves
#[inline]
pub const fn effective_len(byte_count: usize) -> usize {
    byte_count - byte_count % WORD_SIZE
}

/// Copy `byte_count` bytes from the window base into `dest`
///
/// Issues `byte_count / WORD_SIZE` word reads.
///
/// # Panics
/// Panics if `dest` is shorter than the effective transfer length.
pub fn read_words(dest: &mut [u8], window: &dyn HwWindow, byte_count: usize) -> usize {
    let len = effective_len(byte_count);
    for (index, chunk) in dest[..len].chunks_exact_mut(WORD_SIZE).enumerate() {
        chunk.copy_from_slice(&window.read_word(index).to_ne_bytes());
    }
    len
}

/// Copy `byte_count` bytes from `src` to the window base
///
/// Issues `byte_count / WORD_SIZE` word writes.
///
/// # Panics
/// Panics if `src` is shorter than the effective transfer length.
pub fn write_words(window: &dyn HwWindow, src: &[u8], byte_count: usize) -> usize {
    let len = effective_len(byte_count);
    for (index, chunk) in src[..len].chunks_exact(WORD_SIZE).enumerate() {
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(chunk);
        window.write_word(index, usize::from_ne_bytes(word));
    }
    len
}
