//! Registry Module
//!
//! Slot identifiers and the input/output image registry.

pub mod image_registry;
pub mod slot;

pub use image_registry::{ImageRegistry, InputSnapshot, SharedRegistry};
pub use slot::{InputSlot, OutputSlot, INPUT_SLOT_COUNT, OUTPUT_SLOT_COUNT};
