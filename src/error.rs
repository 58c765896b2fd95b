use thiserror::Error;

/// Failures the viewer distinguishes.
///
/// Library functions return `anyhow::Result`; these values travel inside it
/// and can be recovered with `downcast_ref::<ViewerError>()`.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Permission denied, device missing, or the stream failed to open.
    #[error("camera access failed for {device}: {reason}")]
    CameraAccess { device: String, reason: String },

    /// The off-screen surface has no pixel buffer yet.
    #[error("raster surface unavailable")]
    SurfaceUnavailable,

    #[error("frame size mismatch: surface is {expected:?}, frame is {actual:?}")]
    FrameMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("unknown capture device '{0}'")]
    UnknownDevice(String),
}

impl ViewerError {
    pub fn camera_access(device: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::CameraAccess {
            device: device.into(),
            reason: reason.to_string(),
        }
    }
}
