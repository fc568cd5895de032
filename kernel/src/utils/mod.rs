/*
 * Utilities
 *
 * Driver-wide helpers that are not part of the device model itself.
 */

pub mod logger;

pub use logger::Console;
