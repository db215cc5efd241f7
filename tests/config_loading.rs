use pipeline_deck::{
    app::{App, AppConfig, LogLevel},
    cli::RunOptions,
    config::{PluginConfig, DEFAULT_FETCH_TIMEOUT},
    host::protocol::DEFAULT_ACTION_UUID,
    poller::Timings,
    Error,
};
use std::{
    env, fs,
    path::Path,
    sync::{Mutex, OnceLock},
    time::Duration,
};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn with_temp_home<F: FnOnce(&Path)>(f: F) {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let original_home = env::var_os("HOME");
    let home = tempfile::tempdir().expect("failed to create temp HOME");
    env::set_var("HOME", home.path());
    f(home.path());
    match original_home {
        Some(val) => env::set_var("HOME", val),
        None => env::remove_var("HOME"),
    }
}

#[test]
fn first_run_writes_default_config() {
    with_temp_home(|home| {
        let cfg = PluginConfig::load_or_default().unwrap();
        assert_eq!(cfg, PluginConfig::default());

        let path = home.join(".pipeline_deck").join("config.toml");
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("refresh_interval = \"1m\""), "{raw}");
        assert!(raw.contains("long_press = \"1s 300ms\""), "{raw}");
        assert!(raw.contains(DEFAULT_ACTION_UUID), "{raw}");
    });
}

#[test]
fn existing_config_is_honoured() {
    with_temp_home(|home| {
        let dir = home.join(".pipeline_deck");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            "aws_cli = \"/opt/aws/bin/aws\"\nrefresh_interval = \"90s\"\n",
        )
        .unwrap();

        let app = App::from_options(RunOptions::default()).unwrap();
        let cfg = app.config();
        assert_eq!(cfg.aws_cli, "/opt/aws/bin/aws");
        assert_eq!(cfg.timings.refresh_interval, Duration::from_secs(90));
        assert_eq!(cfg.timings.long_press, Timings::default().long_press);
        assert_eq!(cfg.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
    });
}

#[test]
fn unknown_keys_fail_startup() {
    with_temp_home(|home| {
        let dir = home.join(".pipeline_deck");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "baud = 9600\n").unwrap();
        let err = App::from_options(RunOptions::default()).err().unwrap();
        assert!(matches!(err, Error::Config(_)), "{err:?}");
    });
}

#[test]
fn cli_flags_win_over_file() {
    let file = PluginConfig {
        action_uuid: "com.example.file".into(),
        ..PluginConfig::default()
    };
    let opts = RunOptions {
        action_uuid: Some("com.example.cli".into()),
        log_level: Some(LogLevel::Debug),
        ..RunOptions::default()
    };
    let cfg = AppConfig::from_sources(file, opts);
    assert_eq!(cfg.action_uuid, "com.example.cli");
    assert_eq!(cfg.log_level, LogLevel::Debug);
    assert_eq!(cfg.aws_cli, "aws");
}

#[test]
fn app_reports_the_config_it_created_only_once() {
    with_temp_home(|home| {
        let path = home.join(".pipeline_deck").join("config.toml");

        let first = App::from_options(RunOptions::default()).unwrap();
        assert_eq!(first.created_config(), Some(path.as_path()));
        assert!(path.exists());

        let second = App::from_options(RunOptions::default()).unwrap();
        assert_eq!(second.created_config(), None);
    });
}
