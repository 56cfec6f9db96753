//! Image Registry
//!
//! Four input slots and two output slots of [`SpectralImage`]. Inputs are
//! kept at one common size: every non-empty upload shrinks all inputs to the
//! smallest height and smallest width present.

use std::sync::{Arc, RwLock};

use log::{debug, info};

use super::slot::{InputSlot, OutputSlot, INPUT_SLOT_COUNT, OUTPUT_SLOT_COUNT};
use crate::spectral::SpectralImage;

/// Registry handle shared between the foreground and the mix worker
pub type SharedRegistry = Arc<RwLock<ImageRegistry>>;

/// Point-in-time copy of the input slots, cheap to clone
pub type InputSnapshot = [Option<Arc<SpectralImage>>; INPUT_SLOT_COUNT];

/// Slot storage for input and output images
#[derive(Debug, Default)]
pub struct ImageRegistry {
    inputs: [Option<Arc<SpectralImage>>; INPUT_SLOT_COUNT],
    outputs: [Option<Arc<SpectralImage>>; OUTPUT_SLOT_COUNT],
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry wrapped for sharing with a mix worker
    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Store an input image and unify the sizes of all inputs
    ///
    /// An empty image clears the slot. Images shared with an in-flight job
    /// snapshot are copied before being resized, so the job keeps the data
    /// it started with.
    pub fn set_input(&mut self, slot: InputSlot, image: SpectralImage) {
        if image.is_empty() {
            self.inputs[slot.index()] = None;
            debug!("Empty image cleared input slot {}", slot);
            return;
        }
        self.inputs[slot.index()] = Some(Arc::new(image));
        info!("Stored input image in slot {}", slot);
        self.unify_sizes();
    }

    pub fn get_input(&self, slot: InputSlot) -> Option<Arc<SpectralImage>> {
        self.inputs[slot.index()].clone()
    }

    /// All input slots; empty slots stay `None`
    pub fn get_all_inputs(&self) -> InputSnapshot {
        self.inputs.clone()
    }

    pub fn set_output(&mut self, slot: OutputSlot, image: SpectralImage) {
        self.outputs[slot.index()] = Some(Arc::new(image));
        info!("Stored mix result in {}", slot);
    }

    pub fn get_output(&self, slot: OutputSlot) -> Option<Arc<SpectralImage>> {
        self.outputs[slot.index()].clone()
    }

    pub fn clear_input(&mut self, slot: InputSlot) {
        self.inputs[slot.index()] = None;
    }

    pub fn clear_output(&mut self, slot: OutputSlot) {
        self.outputs[slot.index()] = None;
    }

    pub fn clear_all_inputs(&mut self) {
        self.inputs = Default::default();
    }

    pub fn clear_all_outputs(&mut self) {
        self.outputs = Default::default();
    }

    pub fn clear_all(&mut self) {
        self.clear_all_inputs();
        self.clear_all_outputs();
        debug!("Registry cleared");
    }

    /// Number of input slots holding an image
    pub fn input_count(&self) -> usize {
        self.inputs.iter().filter(|s| s.is_some()).count()
    }

    /// The `(height, width)` shared by all sized inputs
    ///
    /// `None` when no input carries dimensions.
    pub fn common_dimensions(&self) -> Option<(usize, usize)> {
        self.inputs
            .iter()
            .flatten()
            .filter_map(|img| img.dimensions())
            .fold(None, |acc, (h, w)| match acc {
                None => Some((h, w)),
                Some((min_h, min_w)) => Some((min_h.min(h), min_w.min(w))),
            })
    }

    fn unify_sizes(&mut self) {
        let Some((height, width)) = self.common_dimensions() else {
            return;
        };
        for img in self.inputs.iter_mut().flatten() {
            if img.dimensions() != Some((height, width)) {
                Arc::make_mut(img).resize(height, width);
            }
        }
        debug!("Inputs unified to {}x{}", height, width);
    }
}
