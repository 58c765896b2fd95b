//! redscope
//!
//! A live camera viewer that highlights red pixels and reports what share of
//! each frame is red.
//!
//! # Architecture
//!
//! One component, `Viewer`, ties three parts together:
//!
//! 1. **Capture**: a `CameraProvider` opens a `CaptureSource` (synthetic,
//!    still images, or V4L2) and the stream is drawn into an off-screen
//!    RGBA surface every tick.
//! 2. **Filter**: `RedFilter` classifies each pixel on its incoming values,
//!    paints matches pure red and dims the rest, in place.
//! 3. **Statistic**: the share of matching pixels, published only once the
//!    whole frame has been processed.
//!
//! Ticks are driven by an injected `TickScheduler`, so the loop can run on a
//! real frame clock or be stepped by hand.
//!
//! # Module Structure
//!
//! - `frame`: RGBA frame buffer
//! - `filter`, `stats`: classifier, recolor and percentage
//! - `capture`: devices and frame sources
//! - `surface`, `schedule`, `display`: the collaborators the viewer draws on
//! - `viewer`: the component and its state machine
//! - `config`, `controls`, `cli`: the command line front end

pub mod capture;
pub mod cli;
pub mod config;
pub mod controls;
pub mod display;
pub mod error;
pub mod filter;
pub mod frame;
pub mod schedule;
pub mod stats;
pub mod surface;
pub mod viewer;

pub use capture::{
    CameraProvider, CaptureConstraints, CaptureSource, DeviceInfo, DeviceRegistry, FacingMode,
    SourceStats, StillSource, StreamMetadata, SyntheticConfig, SyntheticSource,
};
#[cfg(feature = "capture-v4l2")]
pub use capture::{V4l2Config, V4l2Source};
pub use config::ViewerConfig;
pub use controls::Control;
pub use display::{MemoryDisplay, TerminalDisplay, UiMode, ViewerDisplay};
pub use error::ViewerError;
pub use filter::{FilterOutcome, RedFilter, Thresholds, DEEP_DIM_FACTOR, DEFAULT_DIM_FACTOR};
pub use frame::FrameBuffer;
pub use schedule::{FrameClock, ManualScheduler, TickScheduler};
pub use stats::{red_percentage, RedStatistic};
pub use surface::OffscreenSurface;
pub use viewer::{ProcessorState, TickOutcome, Viewer};
