//! Mix Job Runner
//!
//! Runs at most one composition at a time on a named background thread.
//! There is no queue: a new request preempts the running job by raising its
//! cancellation token and waiting briefly. The old job only stops at its next
//! checkpoint; if it is already composing it finishes, but the generation
//! guard discards its result.
//!
//! Lock order: active job, then status, then registry.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::cancel::CancellationToken;
use super::status::{JobTracker, MixStatus};
use crate::config::{MixerConfig, PacingPolicy};
use crate::error::{MixError, Result};
use crate::mixer::{Composite, MixOutcome, MixRequest, SpectralCompositor};
use crate::registry::{InputSnapshot, SharedRegistry};
use crate::spectral::Plane;

/// Handle on the job thread currently owned by the runner
struct ActiveJob {
    job_id: Uuid,
    token: CancellationToken,
    /// Disconnects when the worker thread exits; nothing is ever sent
    done: Receiver<()>,
}

impl ActiveJob {
    fn is_finished(&self) -> bool {
        self.wait(Duration::ZERO)
    }

    /// Block until the worker exits or `timeout` passes
    fn wait(&self, timeout: Duration) -> bool {
        !matches!(self.done.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }
}

/// Owner of the single in-flight mix job
pub struct MixJobRunner {
    registry: SharedRegistry,
    tracker: Arc<Mutex<JobTracker>>,
    active: Mutex<Option<ActiveJob>>,
    config: MixerConfig,
}

impl MixJobRunner {
    pub fn new(registry: SharedRegistry, config: MixerConfig) -> Self {
        Self {
            registry,
            tracker: Arc::new(Mutex::new(JobTracker::new())),
            active: Mutex::new(None),
            config,
        }
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Start a job for `request`, preempting any running one
    ///
    /// The inputs are snapshotted now; uploads made while the job runs do
    /// not affect it.
    ///
    /// # Errors
    /// `MixError::Io` if the worker thread cannot be spawned.
    pub fn start(&self, request: MixRequest) -> Result<Uuid> {
        let mut active = lock(&self.active);
        if let Some(previous) = active.take() {
            if !previous.is_finished() {
                info!("Preempting mix job {}", previous.job_id);
                previous.token.cancel();
                if !previous.wait(self.config.cancel_wait()) {
                    debug!(
                        "Job {} still composing; its result will be discarded",
                        previous.job_id
                    );
                }
            }
        }

        let inputs = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get_all_inputs();
        let job_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let generation = lock(&self.tracker).begin(job_id, request.target);

        info!(
            "Starting mix job {} ({} mode, {} input(s), target {})",
            job_id,
            request.mode,
            inputs.iter().flatten().count(),
            request.target
        );

        let job = MixJob {
            generation,
            inputs,
            request,
            token: token.clone(),
            tracker: Arc::clone(&self.tracker),
            registry: Arc::clone(&self.registry),
            pacing: self.config.pacing.clone(),
            compositor: SpectralCompositor::new(self.config.reconstruction),
        };

        let (done_tx, done) = bounded::<()>(0);
        let spawned = thread::Builder::new()
            .name(format!("ftmix-mix-{}", generation))
            .spawn(move || {
                job.run();
                drop(done_tx);
            });
        if let Err(e) = spawned {
            lock(&self.tracker).fail(generation, format!("could not spawn worker: {}", e));
            return Err(MixError::Io(e));
        }

        *active = Some(ActiveJob {
            job_id,
            token,
            done,
        });
        Ok(job_id)
    }

    /// Cancel the running job
    ///
    /// Reports `running=false` and progress 0 immediately; the worker stops
    /// at its next checkpoint.
    pub fn cancel(&self) {
        let active = lock(&self.active);
        if let Some(job) = active.as_ref() {
            job.token.cancel();
        }
        if lock(&self.tracker).cancel() {
            info!("Mix job cancelled");
        }
    }

    /// Cancel any job and return the status to idle
    pub fn reset(&self) {
        let active = lock(&self.active);
        if let Some(job) = active.as_ref() {
            job.token.cancel();
        }
        lock(&self.tracker).reset();
        debug!("Mix runner reset");
    }

    pub fn status(&self) -> MixStatus {
        lock(&self.tracker).snapshot()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.tracker).is_running()
    }

    /// Unnormalized raster of the last completed mix
    ///
    /// Keeps the signed, real-valued reconstruction that the 8-bit preview
    /// and output image lose.
    pub fn result_array(&self) -> Option<Arc<Plane<f64>>> {
        lock(&self.tracker).result_array()
    }

    /// Wait up to `timeout` for the current job thread to exit
    ///
    /// Returns true when no job thread is left running.
    pub fn wait_for_completion(&self, timeout: Duration) -> bool {
        let active = lock(&self.active);
        match active.as_ref() {
            Some(job) => job.wait(timeout),
            None => true,
        }
    }
}

impl Drop for MixJobRunner {
    fn drop(&mut self) {
        if let Some(job) = lock(&self.active).as_ref() {
            job.token.cancel();
        }
    }
}

/// Everything one worker thread owns
struct MixJob {
    generation: u64,
    inputs: InputSnapshot,
    request: MixRequest,
    token: CancellationToken,
    tracker: Arc<Mutex<JobTracker>>,
    registry: SharedRegistry,
    pacing: PacingPolicy,
    compositor: SpectralCompositor,
}

impl MixJob {
    fn run(self) {
        if !lock(&self.tracker).set_progress(self.generation, self.pacing.initial_progress) {
            return;
        }

        for &checkpoint in &self.pacing.checkpoints {
            if self.stop_if_cancelled() {
                return;
            }
            thread::sleep(self.pacing.step_delay());
            if !lock(&self.tracker).set_progress(self.generation, checkpoint) {
                debug!("Job generation {} superseded", self.generation);
                return;
            }
        }
        if self.stop_if_cancelled() {
            return;
        }

        let composed = panic::catch_unwind(AssertUnwindSafe(|| {
            self.compositor.compose(&self.inputs, &self.request)
        }))
        .unwrap_or_else(|payload| {
            Err(MixError::CompositionFailure {
                reason: panic_message(payload),
            })
        });

        // Build the output image before taking any lock
        let prepared = composed.and_then(|outcome| match outcome {
            MixOutcome::Empty => Ok(None),
            MixOutcome::Mixed(composite) => {
                let image = composite.to_spectral_image()?;
                let Composite { raster, preview, .. } = composite;
                Ok(Some((image, preview, raster)))
            }
        });

        let mut tracker = lock(&self.tracker);
        if self.token.is_cancelled() || !tracker.is_current(self.generation) {
            warn!(
                "Discarding result of superseded job generation {}",
                self.generation
            );
            return;
        }

        match prepared {
            Ok(Some((image, preview, raster))) => {
                self.registry
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .set_output(self.request.target, image);
                tracker.complete(self.generation, Some(preview), Some(raster));
                info!("Mix job generation {} completed", self.generation);
            }
            Ok(None) => {
                tracker.complete(self.generation, None, None);
                info!("Mix job generation {} completed with no result", self.generation);
            }
            Err(e) => {
                error!("Mix job generation {} failed: {}", self.generation, e);
                tracker.fail(self.generation, e.to_string());
            }
        }
    }

    fn stop_if_cancelled(&self) -> bool {
        if !self.token.is_cancelled() {
            return false;
        }
        lock(&self.tracker).cancelled(self.generation);
        debug!("Job generation {} observed cancellation", self.generation);
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", message)
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::status::JobState;
    use crate::mixer::{MaskConfig, SlotWeights};
    use crate::registry::{ImageRegistry, InputSlot, OutputSlot};
    use crate::spectral::{Complex64, SpectralImage};
    use image::{GrayImage, Luma};

    const WAIT: Duration = Duration::from_secs(10);

    fn config(step_delay_ms: u64) -> MixerConfig {
        MixerConfig {
            pacing: PacingPolicy {
                step_delay_ms,
                ..PacingPolicy::default()
            },
            ..MixerConfig::default()
        }
    }

    fn registry_with_image() -> SharedRegistry {
        let registry = ImageRegistry::shared();
        let raster = GrayImage::from_fn(8, 8, |x, y| Luma([(x * 30 + y) as u8]));
        registry
            .write()
            .unwrap()
            .set_input(InputSlot::One, SpectralImage::from_raster(raster));
        registry
    }

    fn full_weight(target: OutputSlot) -> MixRequest {
        MixRequest {
            weights: SlotWeights::uniform(10.0, 10.0),
            target,
            ..MixRequest::default()
        }
    }

    #[test]
    fn test_new_runner_is_idle() {
        let runner = MixJobRunner::new(ImageRegistry::shared(), MixerConfig::default());
        assert_eq!(runner.status().state, JobState::Idle);
        assert!(runner.wait_for_completion(Duration::ZERO));
    }

    #[test]
    fn test_job_completes_and_stores_output() {
        let registry = registry_with_image();
        let runner = MixJobRunner::new(Arc::clone(&registry), config(0));
        let job_id = runner.start(full_weight(OutputSlot::Second)).unwrap();
        assert!(runner.wait_for_completion(WAIT));

        let status = runner.status();
        assert_eq!(status.job_id, Some(job_id));
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.progress, 100);
        assert!(status.result.is_some());
        assert!(registry.read().unwrap().get_output(OutputSlot::Second).is_some());
        assert!(registry.read().unwrap().get_output(OutputSlot::First).is_none());
    }

    #[test]
    fn test_empty_registry_completes_without_result() {
        let registry = ImageRegistry::shared();
        let runner = MixJobRunner::new(Arc::clone(&registry), config(0));
        runner.start(full_weight(OutputSlot::First)).unwrap();
        assert!(runner.wait_for_completion(WAIT));

        let status = runner.status();
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.progress, 100);
        assert!(status.result.is_none());
        assert!(status.error.is_none());
        assert!(registry.read().unwrap().get_output(OutputSlot::First).is_none());
    }

    #[test]
    fn test_cancel_stops_before_composing() {
        let registry = registry_with_image();
        let runner = MixJobRunner::new(Arc::clone(&registry), config(50));
        runner.start(full_weight(OutputSlot::First)).unwrap();
        runner.cancel();

        let status = runner.status();
        assert!(!status.running);
        assert_eq!(status.progress, 0);
        assert_eq!(status.state, JobState::Cancelled);

        assert!(runner.wait_for_completion(WAIT));
        let status = runner.status();
        assert_eq!(status.state, JobState::Cancelled);
        assert!(status.error.is_none());
        assert!(registry.read().unwrap().get_output(OutputSlot::First).is_none());
    }

    #[test]
    fn test_restart_preempts_previous_job() {
        let registry = registry_with_image();
        let runner = MixJobRunner::new(Arc::clone(&registry), config(30));
        runner.start(full_weight(OutputSlot::First)).unwrap();
        let second = runner.start(full_weight(OutputSlot::Second)).unwrap();
        assert!(runner.wait_for_completion(WAIT));

        let status = runner.status();
        assert_eq!(status.job_id, Some(second));
        assert_eq!(status.state, JobState::Completed);
        let registry = registry.read().unwrap();
        assert!(registry.get_output(OutputSlot::First).is_none());
        assert!(registry.get_output(OutputSlot::Second).is_some());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let runner = MixJobRunner::new(registry_with_image(), config(50));
        runner.start(full_weight(OutputSlot::First)).unwrap();
        runner.reset();
        assert_eq!(runner.status().state, JobState::Idle);
        assert!(runner.wait_for_completion(WAIT));
        assert_eq!(runner.status().state, JobState::Idle);
    }

    #[test]
    fn test_result_array_keeps_signed_values() {
        let registry = ImageRegistry::shared();
        let checker = GrayImage::from_fn(16, 16, |x, y| {
            Luma([if (x / 4 + y / 4) % 2 == 0 { 230 } else { 20 }])
        });
        registry
            .write()
            .unwrap()
            .set_input(InputSlot::One, SpectralImage::from_raster(checker));
        let runner = MixJobRunner::new(Arc::clone(&registry), config(0));
        assert!(runner.result_array().is_none());

        // Dropping the centre of the plane removes the DC term, so the
        // reconstruction swings around zero
        let request = MixRequest {
            masks: MaskConfig::basic(20.0, false),
            ..full_weight(OutputSlot::First)
        };
        runner.start(request).unwrap();
        assert!(runner.wait_for_completion(WAIT));
        assert_eq!(runner.status().state, JobState::Completed);

        let raster = runner.result_array().unwrap();
        assert_eq!(raster.shape(), (16, 16));
        let (min, max) = raster.min_max().unwrap();
        assert!(min < 0.0, "min {} should be negative", min);
        assert!(max > 0.0);

        let output = registry.read().unwrap().get_output(OutputSlot::First).unwrap();
        let pixels = output.raster().unwrap();
        assert_eq!(pixels.pixels().map(|p| p[0]).min(), Some(0));
        assert_eq!(pixels.pixels().map(|p| p[0]).max(), Some(255));
    }

    #[test]
    fn test_non_finite_spectrum_fails_job() {
        let registry = ImageRegistry::shared();
        let poisoned = Plane::filled(4, 4, Complex64::new(f64::NAN, 0.0));
        registry
            .write()
            .unwrap()
            .set_input(InputSlot::One, SpectralImage::from_spectrum(poisoned));
        let runner = MixJobRunner::new(Arc::clone(&registry), config(0));
        runner.start(full_weight(OutputSlot::First)).unwrap();
        assert!(runner.wait_for_completion(WAIT));

        let status = runner.status();
        assert_eq!(status.state, JobState::Failed);
        assert!(!status.running);
        assert_eq!(status.progress, 100);
        assert!(status.result.is_none());
        let error = status.error.unwrap();
        assert!(error.contains("non-finite"), "unexpected error: {}", error);
        assert!(runner.result_array().is_none());
        assert!(registry.read().unwrap().get_output(OutputSlot::First).is_none());
    }

    #[test]
    fn test_wait_times_out_while_job_is_paced() {
        let runner = MixJobRunner::new(registry_with_image(), config(200));
        runner.start(full_weight(OutputSlot::First)).unwrap();
        assert!(!runner.wait_for_completion(Duration::from_millis(20)));
        runner.cancel();
        assert!(runner.wait_for_completion(WAIT));
    }

    #[test]
    fn test_panic_message_formats() {
        assert_eq!(panic_message(Box::new("boom")), "worker panicked: boom");
        assert_eq!(
            panic_message(Box::new(String::from("bang"))),
            "worker panicked: bang"
        );
        assert_eq!(panic_message(Box::new(7_u8)), "worker panicked");
    }
}
