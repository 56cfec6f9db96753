//! Integration Tests
//!
//! End-to-end tests for the ftmix mixing pipeline.

use std::sync::Arc;
use std::time::Duration;

use approx::assert_abs_diff_eq;
use image::{GrayImage, Luma};
use serde_json::json;

use ftmix::mixer::{MaskConfig, MixMode, MixOutcome, MixRequest, SlotWeights, SpectralCompositor};
use ftmix::registry::{ImageRegistry, InputSlot, InputSnapshot, OutputSlot};
use ftmix::spectral::{decode_base64, encode_png, SpectralImage};
use ftmix::{JobState, MixerConfig, MixerSession, PacingPolicy, ViewTarget, ViewKind};

const WAIT: Duration = Duration::from_secs(10);

/// Diagonal ramp covering the full 0..=255 range
fn gradient(size: u32) -> GrayImage {
    let span = (2 * (size - 1)) as f64;
    GrayImage::from_fn(size, size, |x, y| {
        Luma([((x + y) as f64 * 255.0 / span).round() as u8])
    })
}

/// Checkerboard of 4x4 blocks
fn checker(size: u32) -> GrayImage {
    GrayImage::from_fn(size, size, |x, y| {
        Luma([if (x / 4 + y / 4) % 2 == 0 { 230 } else { 20 }])
    })
}

fn fast_session() -> MixerSession {
    MixerSession::new(MixerConfig {
        pacing: PacingPolicy::immediate(),
        ..MixerConfig::default()
    })
}

fn snapshot(images: &[(InputSlot, &GrayImage)]) -> InputSnapshot {
    let mut inputs: InputSnapshot = Default::default();
    for (slot, raster) in images {
        inputs[slot.index()] = Some(Arc::new(SpectralImage::from_raster((*raster).clone())));
    }
    inputs
}

// === End-to-End Tests ===

#[test]
fn test_identical_inputs_reproduce_original() {
    let original = gradient(64);
    let png = encode_png(&original).unwrap();

    let session = fast_session();
    session.upload_image("1", &png).unwrap();
    session.upload_image("2", &png).unwrap();
    session
        .start_mix_json(&json!({
            "wa1": 10, "wa2": 10, "wb1": 10, "wb2": 10,
            "mode": "magnitude_phase",
            "mixing_mode": "basic",
            "size": 100,
        }))
        .unwrap();

    let status = session.wait_for_mix(WAIT);
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.progress, 100);
    assert!(!status.running);

    let preview = decode_base64(&status.result.unwrap()).unwrap();
    let composite = image::load_from_memory(&preview).unwrap().to_luma8();
    assert_eq!(composite.dimensions(), (64, 64));
    for (mixed, source) in composite.pixels().zip(original.pixels()) {
        assert!(
            (mixed[0] as i32 - source[0] as i32).abs() <= 1,
            "pixel {} differs from {}",
            mixed[0],
            source[0]
        );
    }
}

#[test]
fn test_output_slot_receives_composite() {
    let session = fast_session();
    session.upload_image("3", &encode_png(&checker(32)).unwrap()).unwrap();
    session
        .start_mix_json(&json!({ "wa3": 10, "wb3": 10, "target_output": 2 }))
        .unwrap();
    session.wait_for_mix(WAIT);

    let target = ViewTarget::Output(OutputSlot::Second);
    for kind in ViewKind::ALL {
        assert!(session.get_view(target, kind).unwrap().is_some(), "{} missing", kind);
    }
    assert!(session
        .get_view(ViewTarget::Output(OutputSlot::First), ViewKind::Original)
        .unwrap()
        .is_none());
}

#[test]
fn test_no_inputs_completes_empty() {
    let session = fast_session();
    session.start_mix(MixRequest::default()).unwrap();
    let status = session.wait_for_mix(WAIT);
    assert_eq!(status.state, JobState::Completed);
    assert!(status.result.is_none());
    assert!(status.error.is_none());
}

// === Registry Tests ===

#[test]
fn test_uploads_share_smallest_dimensions() {
    let session = fast_session();
    session
        .upload_image("1", &encode_png(&GrayImage::new(40, 30)).unwrap())
        .unwrap();
    session
        .upload_image("2", &encode_png(&GrayImage::new(20, 50)).unwrap())
        .unwrap();

    let registry = session.registry();
    let registry = registry.read().unwrap();
    assert_eq!(registry.common_dimensions(), Some((30, 20)));
    for slot in [InputSlot::One, InputSlot::Two] {
        let image = registry.get_input(slot).unwrap();
        assert_eq!(image.dimensions(), Some((30, 20)));
        assert_eq!(image.spectrum().unwrap().shape(), (30, 20));
    }
}

#[test]
fn test_reset_empties_session() {
    let session = fast_session();
    session.upload_image("1", &encode_png(&checker(16)).unwrap()).unwrap();
    session.start_mix_json(&json!({ "wa1": 10, "wb1": 10 })).unwrap();
    session.wait_for_mix(WAIT);

    session.reset();
    let registry = session.registry();
    let registry = registry.read().unwrap();
    assert_eq!(registry.input_count(), 0);
    assert!(registry.get_output(OutputSlot::First).is_none());
    assert_eq!(session.poll_status().state, JobState::Idle);
}

// === Weighting Tests ===

#[test]
fn test_magnitude_and_phase_come_from_separate_slots() {
    let first = gradient(16);
    let second = checker(16);
    let inputs = snapshot(&[(InputSlot::One, &first), (InputSlot::Two, &second)]);
    let request = MixRequest {
        weights: SlotWeights::new([10.0, 0.0, 0.0, 0.0], [0.0, 10.0, 0.0, 0.0]),
        ..MixRequest::default()
    };

    let composite = SpectralCompositor::default()
        .compose(&inputs, &request)
        .unwrap()
        .into_composite()
        .unwrap();
    assert_eq!(composite.contributors, vec![InputSlot::One, InputSlot::Two]);

    let magnitude = SpectralImage::from_raster(first).magnitude().unwrap();
    let mixed = composite.spectrum.map(|c| c.norm());
    for (m, expected) in mixed.as_slice().iter().zip(magnitude.as_slice()) {
        assert_abs_diff_eq!(*m, *expected, epsilon = 1e-6 * expected.max(1.0));
    }
}

#[test]
fn test_weights_are_normalized() {
    let first = checker(16);
    let inputs = snapshot(&[(InputSlot::One, &first)]);
    let compose = |weight: f64| {
        let request = MixRequest {
            weights: SlotWeights::new([weight, 0.0, 0.0, 0.0], [weight, 0.0, 0.0, 0.0]),
            ..MixRequest::default()
        };
        SpectralCompositor::default()
            .compose(&inputs, &request)
            .unwrap()
            .into_composite()
            .unwrap()
    };

    let full = compose(10.0);
    let half = compose(5.0);
    for (a, b) in full.raster.as_slice().iter().zip(half.raster.as_slice()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
    }
}

#[test]
fn test_real_imag_mode_reproduces_single_input() {
    let source = gradient(16);
    let inputs = snapshot(&[(InputSlot::Four, &source)]);
    let request = MixRequest {
        mode: MixMode::RealImag,
        weights: SlotWeights::new([0.0, 0.0, 0.0, 10.0], [0.0, 0.0, 0.0, 10.0]),
        ..MixRequest::default()
    };

    let MixOutcome::Mixed(composite) = SpectralCompositor::default().compose(&inputs, &request).unwrap()
    else {
        panic!("expected a composite");
    };
    for (value, pixel) in composite.raster.as_slice().iter().zip(source.pixels()) {
        assert_abs_diff_eq!(*value, pixel[0] as f64, epsilon = 1e-6);
    }
}

#[test]
fn test_outer_mask_removes_dc_term() {
    let source = gradient(32);
    let inputs = snapshot(&[(InputSlot::One, &source)]);
    let request = MixRequest {
        weights: SlotWeights::new([10.0, 0.0, 0.0, 0.0], [10.0, 0.0, 0.0, 0.0]),
        masks: MaskConfig::basic(20.0, false),
        ..MixRequest::default()
    };

    let composite = SpectralCompositor::default()
        .compose(&inputs, &request)
        .unwrap()
        .into_composite()
        .unwrap();
    // The center of the shifted plane holds the DC term; an outer mask drops it
    let center = composite.spectrum.get(16, 16).unwrap();
    assert_abs_diff_eq!(center.norm(), 0.0, epsilon = 1e-9);

    let mean = composite.raster.as_slice().iter().sum::<f64>() / composite.raster.len() as f64;
    assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-6);
}

#[test]
fn test_region_masks_from_json() {
    let request = MixRequest::from_json(&json!({
        "wa1": 10, "wb1": 10,
        "mixing_mode": "region",
        "regions": { "1": { "type": "outer", "x": 25, "y": 25, "width": 50, "height": 50 } },
    }))
    .unwrap();

    let registry = ImageRegistry::shared();
    registry
        .write()
        .unwrap()
        .set_input(InputSlot::One, SpectralImage::from_raster(checker(16)));
    let inputs = registry.read().unwrap().get_all_inputs();

    let composite = SpectralCompositor::default()
        .compose(&inputs, &request)
        .unwrap()
        .into_composite()
        .unwrap();
    assert_abs_diff_eq!(composite.spectrum.get(8, 8).unwrap().norm(), 0.0, epsilon = 1e-9);
    assert!(composite.spectrum.as_slice().iter().any(|c| c.norm() > 1e-6));
}
