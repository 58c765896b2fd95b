//! redscope - command line front end
//!
//! Subcommands:
//! - `run`: attach a camera and highlight red pixels live
//! - `devices`: list capture devices
//! - `filter`: apply the red filter to a single image

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crate::capture::still::{decode_rgba, encode_rgba};
use crate::capture::{CameraProvider, CaptureConstraints};
use crate::config::ViewerConfig;
use crate::controls::{forward_controls, Control};
use crate::display::{format_device, Snapshot, TerminalDisplay, UiMode, ViewerDisplay};
use crate::filter::Thresholds;
use crate::schedule::FrameClock;
use crate::stats::RedStatistic;
use crate::viewer::{TickOutcome, Viewer};

const IDLE_POLL: Duration = Duration::from_millis(50);
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "redscope", version, about = "Live camera viewer that highlights red pixels")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Filter settings shared by subcommands.
#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// Config file (TOML, or JSON by extension). Falls back to REDSCOPE_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Red predicate cutoffs as R,G,B or a preset name (standard, strict).
    #[arg(long)]
    thresholds: Option<String>,
    /// Attenuation for non-red pixels, 0..=1.
    #[arg(long)]
    dim: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Attach a camera and highlight red pixels live.
    ///
    /// Reads controls from stdin: start, stop, device <id>, devices, quit.
    Run {
        #[command(flatten)]
        filter: FilterArgs,
        /// Exact device id (stub://..., /dev/videoN, or an image path).
        #[arg(long)]
        device: Option<String>,
        /// Target ticks per second.
        #[arg(long)]
        fps: Option<u32>,
        /// Exit after this many ticks, whether the frame was processed or skipped.
        #[arg(long)]
        frames: Option<u64>,
        /// Write the filtered frame to this image file.
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Write the snapshot every N frames.
        #[arg(long, default_value_t = 30)]
        snapshot_every: u64,
        /// Status line style: auto, plain or pretty.
        #[arg(long)]
        ui: Option<String>,
        /// Do not read controls from stdin. A failed initial attach is then fatal.
        #[arg(long)]
        no_controls: bool,
    },

    /// List capture devices.
    Devices {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print JSON instead of one device per line.
        #[arg(long)]
        json: bool,
    },

    /// Apply the red filter to one image and print the red percentage.
    Filter {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Run {
            filter,
            device,
            fps,
            frames,
            snapshot,
            snapshot_every,
            ui,
            no_controls,
        } => {
            let mut cfg = load_config(&filter)?;
            if device.is_some() {
                cfg.device = device;
            }
            if let Some(fps) = fps {
                cfg.fps = fps;
            }
            cfg.validate()?;
            let snapshot = snapshot.map(|path| Snapshot {
                path,
                every: snapshot_every,
            });
            let ui = UiMode::from_flag(ui.as_deref());
            let last = run_live(&cfg, frames, snapshot, ui, !no_controls)?;
            if let Some(stat) = last {
                println!("{}", stat);
            }
            Ok(())
        }
        Command::Devices { config, json } => {
            let cfg = ViewerConfig::load(config.as_deref())?;
            let devices = cfg.registry().enumerate()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else if devices.is_empty() {
                println!("no video input devices");
            } else {
                for device in &devices {
                    println!("{}", format_device(device));
                }
            }
            Ok(())
        }
        Command::Filter {
            input,
            output,
            filter,
        } => {
            let cfg = load_config(&filter)?;
            let stat = filter_image(&cfg, &input, &output)?;
            println!("{}", stat);
            Ok(())
        }
    }
}

fn load_config(args: &FilterArgs) -> Result<ViewerConfig> {
    let mut cfg = ViewerConfig::load(args.config.as_deref())?;
    if let Some(thresholds) = &args.thresholds {
        cfg.thresholds = Thresholds::parse(thresholds)?;
    }
    if let Some(dim) = args.dim {
        cfg.dim_factor = dim;
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Filter one image file into another.
pub fn filter_image(cfg: &ViewerConfig, input: &Path, output: &Path) -> Result<RedStatistic> {
    let mut frame = decode_rgba(input)?;
    let outcome = cfg.filter().apply(frame.as_bytes_mut());
    encode_rgba(&frame, output)?;
    let stat = RedStatistic::from(outcome);
    log::info!(
        "{} -> {}: red {} ({} of {} pixels)",
        input.display(),
        output.display(),
        stat,
        stat.matched,
        stat.total
    );
    Ok(stat)
}

/// Attach the configured stream before the loop starts.
///
/// Without stdin controls nothing could ever pick another device, so the
/// failure is returned. With controls the loop keeps going and waits for a
/// `device <id>` command.
fn attach_initial<P: CameraProvider, D: ViewerDisplay>(
    viewer: &mut Viewer<P, D>,
    constraints: &CaptureConstraints,
    read_controls: bool,
) -> Result<()> {
    match viewer.attach(constraints) {
        Ok(_) => Ok(()),
        Err(err) if !read_controls => {
            Err(err.context("no capture stream attached and stdin controls are disabled"))
        }
        Err(_) => {
            log::warn!("no capture stream attached; enter `device <id>` to pick one");
            Ok(())
        }
    }
}

/// `--frames` counts every tick, so a run with a failing stream still ends.
fn frame_limit_reached(max_frames: Option<u64>, ticks: u64) -> bool {
    max_frames.is_some_and(|max| ticks >= max)
}

/// Drive a viewer until quit, Ctrl-C, or `max_frames` ticks.
///
/// Returns the statistic of the last processed frame.
fn run_live(
    cfg: &ViewerConfig,
    max_frames: Option<u64>,
    snapshot: Option<Snapshot>,
    ui: UiMode,
    read_controls: bool,
) -> Result<Option<RedStatistic>> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .context("install Ctrl-C handler")?;

    let display = TerminalDisplay::new(ui, std::io::stderr().is_terminal(), snapshot);
    let mut viewer = Viewer::mount(cfg.registry(), display, cfg.filter());
    let mut clock = FrameClock::new(cfg.fps);

    attach_initial(&mut viewer, &cfg.constraints(), read_controls)?;
    viewer.start(&mut clock);

    let (tx, rx) = mpsc::channel();
    if read_controls {
        std::thread::Builder::new()
            .name("controls".to_string())
            .spawn(move || forward_controls(std::io::stdin().lock(), tx))
            .map_err(|e| anyhow!("failed to spawn control reader: {}", e))?;
    } else {
        drop(tx);
    }

    let mut ticks = 0u64;
    let mut last = None;
    let mut last_health_log = Instant::now();

    'run: while running.load(Ordering::SeqCst) {
        while let Ok(control) = rx.try_recv() {
            match control {
                Control::Start => viewer.start(&mut clock),
                Control::Stop => viewer.stop(),
                Control::SelectDevice(id) => {
                    let _ = viewer.select_device(&id, &mut clock);
                }
                Control::ListDevices => {
                    let _ = viewer.list_devices();
                }
                Control::Quit => break 'run,
            }
        }

        if !clock.wait_for_tick() {
            std::thread::sleep(IDLE_POLL);
            continue;
        }
        match viewer.tick(&mut clock) {
            TickOutcome::Processed(stat) => {
                ticks += 1;
                last = Some(stat);
            }
            TickOutcome::Skipped => ticks += 1,
            TickOutcome::Halted => {}
        }
        if frame_limit_reached(max_frames, ticks) {
            break;
        }

        if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            if let Some(stats) = viewer.source_stats() {
                log::info!(
                    "source health={} frames={} device={}",
                    viewer.source_healthy(),
                    stats.frames_captured,
                    stats.device
                );
            }
            last_health_log = Instant::now();
        }
    }

    log::info!(
        "viewer exiting: {} frame(s) processed, {} skipped",
        viewer.frames_processed(),
        viewer.frames_skipped()
    );
    viewer.stop();
    viewer.unmount();
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{DeviceRegistry, SyntheticConfig};
    use crate::display::MemoryDisplay;
    use crate::filter::RedFilter;
    use crate::schedule::ManualScheduler;

    fn viewer() -> Viewer<DeviceRegistry, MemoryDisplay> {
        let registry = DeviceRegistry::new(SyntheticConfig {
            width: 8,
            height: 6,
            ..SyntheticConfig::default()
        })
        .without_v4l2();
        Viewer::mount(registry, MemoryDisplay::new(), RedFilter::default())
    }

    #[test]
    fn failed_attach_without_controls_is_fatal() {
        let mut viewer = viewer();
        let missing = CaptureConstraints::device("/nonexistent/redscope");
        let err = attach_initial(&mut viewer, &missing, false).unwrap_err();
        assert!(format!("{:#}", err).contains("stdin controls are disabled"));
        assert!(err.downcast_ref::<crate::error::ViewerError>().is_some());
    }

    #[test]
    fn failed_attach_with_controls_keeps_running() {
        let mut viewer = viewer();
        let missing = CaptureConstraints::device("/nonexistent/redscope");
        assert!(attach_initial(&mut viewer, &missing, true).is_ok());
        assert!(viewer.attached_device().is_none());
    }

    #[test]
    fn skipped_ticks_count_toward_frame_limit() {
        let mut viewer = viewer();
        let mut scheduler = ManualScheduler::new();
        viewer.start(&mut scheduler);

        let mut ticks = 0u64;
        while scheduler.take_tick() {
            assert_eq!(viewer.tick(&mut scheduler), TickOutcome::Skipped);
            ticks += 1;
            if frame_limit_reached(Some(3), ticks) {
                break;
            }
        }
        assert_eq!(ticks, 3);
        assert!(!frame_limit_reached(None, ticks));
    }
}
