use std::io::Write;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use redscope::config::ViewerConfig;
use redscope::{CameraProvider, Thresholds};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "REDSCOPE_CONFIG",
        "REDSCOPE_DEVICE",
        "REDSCOPE_THRESHOLDS",
        "REDSCOPE_DIM_FACTOR",
        "REDSCOPE_FPS",
    ] {
        std::env::remove_var(key);
    }
}

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ViewerConfig::load(None).expect("load config");
    assert_eq!(cfg, ViewerConfig::default());
    assert_eq!(cfg.device, None);
    assert_eq!(cfg.fps, 30);
}

#[test]
fn loads_toml_from_env_path_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = toml_file(
        r#"
        device = "stub://front"
        fps = 24

        [filter]
        red_floor = 120
        green_ceiling = 60
        blue_ceiling = 60
        dim_factor = 0.8

        [capture]
        width = 320
        height = 240
        noise = 0
        seed = 42
        stills = ["/srv/frames"]
        "#,
    );

    std::env::set_var("REDSCOPE_CONFIG", file.path());
    std::env::set_var("REDSCOPE_THRESHOLDS", "strict");
    std::env::set_var("REDSCOPE_FPS", "15");

    let cfg = ViewerConfig::load(None).expect("load config");

    assert_eq!(cfg.device.as_deref(), Some("stub://front"));
    assert_eq!(cfg.fps, 15);
    assert_eq!(cfg.thresholds, Thresholds::STRICT);
    assert_eq!(cfg.dim_factor, 0.8);
    assert_eq!(cfg.capture.width, 320);
    assert_eq!(cfg.capture.height, 240);
    assert_eq!(cfg.capture.noise, 0);
    assert_eq!(cfg.capture.seed, 42);

    let ids: Vec<String> = cfg
        .registry()
        .without_v4l2()
        .enumerate()
        .expect("enumerate")
        .into_iter()
        .map(|device| device.id)
        .collect();
    assert_eq!(ids, vec!["stub://rear", "stub://front", "/srv/frames"]);

    clear_env();
}

#[test]
fn explicit_path_wins_over_env_path_and_json_is_accepted() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let ignored = toml_file("fps = 5\n");
    let mut json = Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp config");
    json.write_all(br#"{ "fps": 60, "filter": { "preset": "standard", "dim_factor": 0.5 } }"#)
        .expect("write config");

    std::env::set_var("REDSCOPE_CONFIG", ignored.path());
    std::env::set_var("REDSCOPE_DEVICE", "stub://rear");

    let cfg = ViewerConfig::load(Some(json.path())).expect("load config");
    assert_eq!(cfg.fps, 60);
    assert_eq!(cfg.dim_factor, 0.5);
    assert_eq!(cfg.thresholds, Thresholds::STANDARD);
    assert_eq!(cfg.device.as_deref(), Some("stub://rear"));

    clear_env();
}

#[test]
fn invalid_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("REDSCOPE_DIM_FACTOR", "1.2");
    assert!(ViewerConfig::load(None).is_err());
    clear_env();

    std::env::set_var("REDSCOPE_THRESHOLDS", "red");
    assert!(ViewerConfig::load(None).is_err());
    clear_env();

    std::env::set_var("REDSCOPE_FPS", "0");
    assert!(ViewerConfig::load(None).is_err());
    clear_env();

    let file = toml_file("[filter]\npreset = \"neon\"\n");
    assert!(ViewerConfig::load(Some(file.path())).is_err());

    clear_env();
}
