//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{debug, info};

use super::{MixArgs, ViewArgs};
use crate::config::MixerConfig;
use crate::engine::JobState;
use crate::error::MixError;
use crate::mixer::{MaskConfig, MixMode, MixRequest, SlotWeights};
use crate::registry::OutputSlot;
use crate::session::MixerSession;
use crate::spectral::{decode_base64, SpectralImage, ViewKind};

/// How often the CLI polls a running job
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Build the request described by the mix flags, or read it from a file.
pub fn build_request(args: &MixArgs) -> Result<MixRequest> {
    if let Some(path) = &args.request {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading request {}", path.display()))?;
        let body: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing request {}", path.display()))?;
        return Ok(MixRequest::from_json(&body)?);
    }

    Ok(MixRequest {
        mode: MixMode::parse(&args.mode)?,
        weights: SlotWeights::new(args.wa, args.wb),
        masks: MaskConfig::basic(args.size, !args.outer),
        target: OutputSlot::try_from(args.target)?,
    })
}

/// Upload the inputs, run one mix job and write the composite PNG.
pub fn mix(args: &MixArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => MixerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => MixerConfig::default(),
    };
    let request = build_request(args)?;
    let session = MixerSession::new(config);

    for (slot, path) in &args.images {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        session
            .upload_image(&slot.to_string(), &bytes)
            .with_context(|| format!("loading {} into slot {}", path.display(), slot))?;
        info!("Slot {}: {}", slot, path.display());
    }

    let job_id = session.start_mix(request)?;
    info!("Mix job {} started", job_id);

    let mut last_progress = None;
    let status = loop {
        let status = session.poll_status();
        if last_progress != Some(status.progress) {
            debug!("Progress: {}%", status.progress);
            last_progress = Some(status.progress);
        }
        if !status.running {
            break status;
        }
        thread::sleep(POLL_INTERVAL);
    };

    match status.state {
        JobState::Completed => {}
        JobState::Failed => bail!(
            "mix failed: {}",
            status.error.unwrap_or_else(|| "unknown error".to_string())
        ),
        other => bail!("mix ended in state {}", other),
    }

    let preview = status.result.ok_or(MixError::EmptyMixResult)?;
    write_png(&args.output, &preview)?;

    println!("Composite written: {}", args.output.display());
    if let Some(ms) = status.duration_ms {
        println!("Mixed in {} ms", ms);
    }
    Ok(())
}

/// Write one spectral view of an image.
pub fn view(args: &ViewArgs) -> Result<()> {
    let kind: ViewKind = args.kind.parse()?;
    let bytes =
        fs::read(&args.image).with_context(|| format!("reading {}", args.image.display()))?;
    let image = SpectralImage::load(&bytes)
        .with_context(|| format!("decoding {}", args.image.display()))?;

    let Some(encoded) = image.encode_view(kind)? else {
        bail!("{} has no {} view", args.image.display(), kind);
    };
    write_png(&args.output, &encoded)?;

    println!("{} view written: {}", kind, args.output.display());
    Ok(())
}

fn write_png(path: &Path, encoded: &str) -> Result<()> {
    let png = decode_base64(encoded)?;
    fs::write(path, png).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
