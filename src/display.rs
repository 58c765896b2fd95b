//! Viewer outputs: the filtered frame, the red percentage and the device list.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::capture::still::encode_rgba;
use crate::capture::DeviceInfo;
use crate::frame::FrameBuffer;
use crate::stats::RedStatistic;

/// Where the viewer puts what the user sees.
pub trait ViewerDisplay {
    /// A fully processed frame.
    fn show_frame(&mut self, frame: &FrameBuffer);

    /// The statistic for the frame last passed to `show_frame`.
    fn show_statistic(&mut self, statistic: &RedStatistic);

    fn show_devices(&mut self, devices: &[DeviceInfo]);

    /// Blank the frame output.
    fn clear(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

impl UiMode {
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        }
    }

    fn use_pretty(self, is_tty: bool) -> bool {
        is_tty
            && match self {
                UiMode::Pretty | UiMode::Auto => true,
                UiMode::Plain => false,
            }
    }
}

/// Periodic PNG dump of the filtered frame.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub path: PathBuf,
    /// Write every N shown frames (0 and 1 both mean every frame).
    pub every: u64,
}

/// Status line on stderr plus an optional snapshot file.
pub struct TerminalDisplay {
    spinner: Option<ProgressBar>,
    snapshot: Option<Snapshot>,
    frames_shown: u64,
    frame_size: Option<(u32, u32)>,
    last_plain_report: Option<Instant>,
    plain_interval: Duration,
}

impl TerminalDisplay {
    pub fn new(mode: UiMode, is_tty: bool, snapshot: Option<Snapshot>) -> Self {
        let spinner = mode.use_pretty(is_tty).then(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message("waiting for camera…");
            spinner
        });
        Self {
            spinner,
            snapshot,
            frames_shown: 0,
            frame_size: None,
            last_plain_report: None,
            plain_interval: Duration::from_secs(1),
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    fn write_snapshot(&self, frame: &FrameBuffer) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        if self.frames_shown % snapshot.every.max(1) != 0 {
            return;
        }
        if let Err(err) = encode_rgba(frame, &snapshot.path) {
            log::warn!("snapshot write failed: {:#}", err);
        }
    }

    fn println(&self, line: &str) {
        match &self.spinner {
            Some(spinner) => spinner.println(line),
            None => println!("{line}"),
        }
    }
}

impl ViewerDisplay for TerminalDisplay {
    fn show_frame(&mut self, frame: &FrameBuffer) {
        self.frames_shown += 1;
        self.frame_size = Some(frame.dimensions());
        self.write_snapshot(frame);
    }

    fn show_statistic(&mut self, statistic: &RedStatistic) {
        let size = self
            .frame_size
            .map(|(w, h)| format!("{w}x{h}"))
            .unwrap_or_else(|| "-".to_string());
        let message = format!(
            "red {} | frame {} | {}",
            statistic, self.frames_shown, size
        );
        match &self.spinner {
            Some(spinner) => spinner.set_message(message),
            None => {
                let due = self
                    .last_plain_report
                    .map_or(true, |at| at.elapsed() >= self.plain_interval);
                if due {
                    log::info!("{}", message);
                    self.last_plain_report = Some(Instant::now());
                }
            }
        }
    }

    fn show_devices(&mut self, devices: &[DeviceInfo]) {
        if devices.is_empty() {
            self.println("no video input devices");
            return;
        }
        for device in devices {
            self.println(&format_device(device));
        }
    }

    fn clear(&mut self) {
        self.frame_size = None;
        if let Some(spinner) = &self.spinner {
            spinner.set_message("stopped");
        } else {
            log::info!("display cleared");
        }
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("✔ {} frame(s) shown", self.frames_shown));
        }
    }
}

/// One device per line: `id  label  [facing]`.
pub fn format_device(device: &DeviceInfo) -> String {
    match device.facing {
        Some(facing) => format!(
            "{}\t{}\t[{}]",
            device.id,
            device.label,
            format!("{:?}", facing).to_lowercase()
        ),
        None => format!("{}\t{}", device.id, device.label),
    }
}

/// Records outputs in memory.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    pub frame: Option<FrameBuffer>,
    pub statistic: Option<RedStatistic>,
    pub devices: Vec<DeviceInfo>,
    pub frames_shown: u64,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// The percentage as the user would read it.
    pub fn statistic_text(&self) -> Option<String> {
        self.statistic.map(|stat| stat.to_string())
    }
}

impl ViewerDisplay for MemoryDisplay {
    fn show_frame(&mut self, frame: &FrameBuffer) {
        self.frames_shown += 1;
        self.frame = Some(frame.clone());
    }

    fn show_statistic(&mut self, statistic: &RedStatistic) {
        self.statistic = Some(*statistic);
    }

    fn show_devices(&mut self, devices: &[DeviceInfo]) {
        self.devices = devices.to_vec();
    }

    fn clear(&mut self) {
        self.frame = None;
    }
}
