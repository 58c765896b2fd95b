//! Still image frame source.
//!
//! This module provides `StillSource`, which plays local images as a stream:
//! - a single image file is repeated on every tick
//! - a directory is played in lexical file-name order and looped
//!
//! The stream size is the first image's size. Every other image must match it.
//! Decoded frames are cached after first use.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::{CaptureSource, SourceStats, StreamMetadata};
use crate::error::ViewerError;
use crate::frame::FrameBuffer;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Local image / image-directory source.
pub struct StillSource {
    device: String,
    path: PathBuf,
    frames: Vec<PathBuf>,
    cache: Vec<Option<FrameBuffer>>,
    next_index: usize,
    frame_count: u64,
    metadata: Option<StreamMetadata>,
}

impl StillSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            device: path.display().to_string(),
            path,
            frames: Vec::new(),
            cache: Vec::new(),
            next_index: 0,
            frame_count: 0,
            metadata: None,
        }
    }

    /// Number of images in the playlist (0 before `open`).
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn collect_frames(&self) -> Result<Vec<PathBuf>> {
        if !self.path.is_dir() {
            return Ok(vec![self.path.clone()]);
        }
        let mut frames = Vec::new();
        let entries = std::fs::read_dir(&self.path)
            .with_context(|| format!("read image directory {}", self.path.display()))?;
        for entry in entries {
            let path = entry?.path();
            if is_image_path(&path) {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }

    fn decode(&mut self, index: usize) -> Result<&FrameBuffer> {
        if self.cache[index].is_none() {
            let frame = decode_rgba(&self.frames[index])?;
            self.cache[index] = Some(frame);
        }
        self.cache[index]
            .as_ref()
            .ok_or_else(|| anyhow!("frame cache miss for index {}", index))
    }
}

impl CaptureSource for StillSource {
    fn device_id(&self) -> &str {
        &self.device
    }

    fn open(&mut self) -> Result<StreamMetadata> {
        let frames = self
            .collect_frames()
            .map_err(|err| ViewerError::camera_access(&self.device, format!("{:#}", err)))?;
        if frames.is_empty() {
            return Err(ViewerError::camera_access(&self.device, "no images found").into());
        }
        self.cache = vec![None; frames.len()];
        self.frames = frames;
        self.next_index = 0;

        let device = self.device.clone();
        let first = self
            .decode(0)
            .map_err(|err| ViewerError::camera_access(device, format!("{:#}", err)))?;
        let metadata = StreamMetadata {
            width: first.width(),
            height: first.height(),
        };
        self.metadata = Some(metadata);
        log::info!(
            "StillSource: opened {} ({} image(s), {}x{})",
            self.device,
            self.frames.len(),
            metadata.width,
            metadata.height
        );
        Ok(metadata)
    }

    fn draw_into(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        if self.metadata.is_none() {
            return Err(ViewerError::camera_access(&self.device, "stream not open").into());
        }
        let index = self.next_index;
        let image = self.decode(index)?;
        let drawn = frame.copy_from(image);
        drawn.with_context(|| format!("draw {}", self.frames[index].display()))?;
        self.next_index = (index + 1) % self.frames.len();
        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) {
        if self.metadata.take().is_some() {
            log::info!("StillSource: closed {}", self.device);
        }
        self.cache.clear();
        self.frames.clear();
    }

    fn is_healthy(&self) -> bool {
        self.metadata.is_some()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.device.clone(),
        }
    }
}

/// Decode an image file into an RGBA buffer.
pub fn decode_rgba(path: &Path) -> Result<FrameBuffer> {
    let image = image::open(path)
        .with_context(|| format!("decode image {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    FrameBuffer::from_rgba(width, height, image.into_raw())
}

/// Encode an RGBA buffer to an image file; format follows the extension.
pub fn encode_rgba(frame: &FrameBuffer, path: &Path) -> Result<()> {
    let image = image::RgbaImage::from_raw(frame.width(), frame.height(), frame.as_bytes().to_vec())
        .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))?;
    let saved = if is_jpeg_path(path) {
        // JPEG has no alpha channel.
        image::DynamicImage::ImageRgba8(image).to_rgb8().save(path)
    } else {
        image.save(path)
    };
    saved.with_context(|| format!("write image {}", path.display()))
}

fn is_image_path(path: &Path) -> bool {
    extension_in(path, &IMAGE_EXTENSIONS)
}

fn is_jpeg_path(path: &Path) -> bool {
    extension_in(path, &["jpg", "jpeg"])
}

fn extension_in(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
