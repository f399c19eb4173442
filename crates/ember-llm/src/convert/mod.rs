//! Conversion between canonical types and upstream wire formats
//!
//! Each submodule handles conversions for a specific protocol.

pub mod gemini;
pub mod openai;
pub mod textcomp;

/// Clamp a position to the `u32` indices used on the wire
fn wire_index(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}
