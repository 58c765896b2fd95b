//! The viewer component.
//!
//! `Viewer` owns everything one live view needs: the provider it opens
//! streams from, the attached stream, the off-screen surface, the filter,
//! the latest statistic and the display. It is created with `mount` and
//! torn down with `unmount` (or when dropped).
//!
//! Processing is a two-state machine:
//!
//! ```text
//!            start                     tick (stop flag clear)
//!   Idle ─────────────▶ Running ◀──────────────────────────┐
//!    ▲                    │  └─────────────────────────────┘
//!    └────────────────────┘
//!      tick (stop flag raised)
//! ```
//!
//! `stop` raises the flag and blanks the outputs at once; the state only
//! returns to `Idle` when the next tick sees the flag. Ticks are requested
//! through an injected `TickScheduler`, one at a time.

use anyhow::{anyhow, Result};

use crate::capture::{
    CameraProvider, CaptureConstraints, CaptureSource, DeviceInfo, SourceStats, StreamMetadata,
};
use crate::display::ViewerDisplay;
use crate::filter::RedFilter;
use crate::schedule::TickScheduler;
use crate::stats::RedStatistic;
use crate::surface::OffscreenSurface;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessorState {
    Idle,
    Running,
}

/// What one call to `Viewer::tick` did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// A frame was filtered and shown; the next tick is scheduled.
    Processed(RedStatistic),
    /// The frame was skipped after a failure; the next tick is scheduled.
    Skipped,
    /// The stop flag was seen (or the viewer is idle); nothing is scheduled.
    Halted,
}

pub struct Viewer<P: CameraProvider, D: ViewerDisplay> {
    provider: P,
    display: D,
    filter: RedFilter,
    surface: OffscreenSurface,
    source: Option<Box<dyn CaptureSource>>,
    statistic: RedStatistic,
    state: ProcessorState,
    stop_requested: bool,
    frames_processed: u64,
    frames_skipped: u64,
}

impl<P: CameraProvider, D: ViewerDisplay> Viewer<P, D> {
    pub fn mount(provider: P, display: D, filter: RedFilter) -> Self {
        let thresholds = filter.thresholds();
        log::info!(
            "viewer mounted (red > {}, green <= {}, blue <= {}, dim {})",
            thresholds.red_floor,
            thresholds.green_ceiling,
            thresholds.blue_ceiling,
            filter.dim_factor()
        );
        Self {
            provider,
            display,
            filter,
            surface: OffscreenSurface::new(),
            source: None,
            statistic: RedStatistic::ZERO,
            state: ProcessorState::Idle,
            stop_requested: false,
            frames_processed: 0,
            frames_skipped: 0,
        }
    }

    /// Stop processing and close the stream.
    pub fn unmount(mut self) {
        self.teardown();
    }

    /// Enumerate capture devices and show them.
    pub fn list_devices(&mut self) -> Result<Vec<DeviceInfo>> {
        let devices = self.provider.enumerate().map_err(|err| {
            log::error!("device enumeration failed: {:#}", err);
            err
        })?;
        self.display.show_devices(&devices);
        Ok(devices)
    }

    /// Request a stream, open it, and size the surface to it.
    ///
    /// Any previously attached stream is closed first. On failure the error
    /// is logged, nothing is attached and the display is left empty.
    pub fn attach(&mut self, constraints: &CaptureConstraints) -> Result<StreamMetadata> {
        self.detach();
        match self.open_stream(constraints) {
            Ok((source, metadata)) => {
                log::info!(
                    "stream attached: {} ({}x{})",
                    source.device_id(),
                    metadata.width,
                    metadata.height
                );
                self.source = Some(source);
                Ok(metadata)
            }
            Err(err) => {
                log::error!("camera access failed: {:#}", err);
                self.display.clear();
                Err(err)
            }
        }
    }

    fn open_stream(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<(Box<dyn CaptureSource>, StreamMetadata)> {
        let mut source = self.provider.request_stream(constraints)?;
        let metadata = match source.open() {
            Ok(metadata) => metadata,
            Err(err) => {
                source.close();
                return Err(err);
            }
        };
        self.surface.resize(metadata.width, metadata.height)?;
        Ok((source, metadata))
    }

    /// Close the attached stream, if any, and release the surface.
    pub fn detach(&mut self) {
        if let Some(mut source) = self.source.take() {
            log::info!("stream detached: {}", source.device_id());
            source.close();
        }
        self.surface.release();
    }

    /// Idle → Running. Schedules the first tick.
    pub fn start(&mut self, scheduler: &mut dyn TickScheduler) {
        self.stop_requested = false;
        if self.state == ProcessorState::Running {
            // A tick is still pending; it will carry on.
            return;
        }
        self.state = ProcessorState::Running;
        log::info!("processing started");
        scheduler.request_tick();
    }

    /// Raise the stop flag and blank the outputs immediately.
    pub fn stop(&mut self) {
        self.stop_requested = true;
        self.surface.clear();
        self.statistic = RedStatistic::ZERO;
        self.display.clear();
        self.display.show_statistic(&self.statistic);
        log::info!("processing stopped");
    }

    /// Switch to the device with exactly this id and resume processing.
    pub fn select_device(
        &mut self,
        device_id: &str,
        scheduler: &mut dyn TickScheduler,
    ) -> Result<StreamMetadata> {
        log::info!("switching to device {}", device_id);
        self.stop();
        let metadata = self.attach(&CaptureConstraints::device(device_id))?;
        self.start(scheduler);
        Ok(metadata)
    }

    /// Run one tick of the processing loop.
    pub fn tick(&mut self, scheduler: &mut dyn TickScheduler) -> TickOutcome {
        if self.state == ProcessorState::Idle {
            return TickOutcome::Halted;
        }
        if self.stop_requested {
            self.state = ProcessorState::Idle;
            log::debug!("tick loop exited");
            return TickOutcome::Halted;
        }

        let outcome = match self.process_frame() {
            Ok(statistic) => {
                self.statistic = statistic;
                self.frames_processed += 1;
                if let Ok(frame) = self.surface.image_data() {
                    self.display.show_frame(frame);
                }
                self.display.show_statistic(&statistic);
                TickOutcome::Processed(statistic)
            }
            Err(err) => {
                self.frames_skipped += 1;
                if self.source.is_some() {
                    log::warn!("frame skipped: {:#}", err);
                } else {
                    log::debug!("frame skipped: {:#}", err);
                }
                TickOutcome::Skipped
            }
        };
        scheduler.request_tick();
        outcome
    }

    /// Draw, classify and recolor the current frame in place.
    fn process_frame(&mut self) -> Result<RedStatistic> {
        let source = self
            .source
            .as_deref_mut()
            .ok_or_else(|| anyhow!("no stream attached"))?;
        self.surface.draw_from(source)?;
        let frame = self.surface.image_data_mut()?;
        let outcome = self.filter.apply(frame.as_bytes_mut());
        Ok(RedStatistic::from(outcome))
    }

    fn teardown(&mut self) {
        if self.state == ProcessorState::Running && !self.stop_requested {
            self.stop();
        }
        self.state = ProcessorState::Idle;
        self.detach();
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Statistic of the last fully processed frame (zero after `stop`).
    pub fn statistic(&self) -> RedStatistic {
        self.statistic
    }

    pub fn filter(&self) -> &RedFilter {
        &self.filter
    }

    pub fn surface(&self) -> &OffscreenSurface {
        &self.surface
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn attached_device(&self) -> Option<&str> {
        self.source.as_ref().map(|source| source.device_id())
    }

    pub fn source_stats(&self) -> Option<SourceStats> {
        self.source.as_ref().map(|source| source.stats())
    }

    pub fn source_healthy(&self) -> bool {
        self.source.as_ref().is_some_and(|source| source.is_healthy())
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }
}

impl<P: CameraProvider, D: ViewerDisplay> Drop for Viewer<P, D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
