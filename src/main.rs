#![doc = include_str!("../README.md")]

mod action;
mod config;
mod event;
mod gesture;
mod recognize;
mod source;
mod touch;

use std::{ffi::OsString, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use crate::{
    action::{Actions, ShellDispatcher},
    config::Config,
    event::LineDecoder,
    recognize::Recognizer,
};

/// Turn touchscreen swipes into shell commands
///
/// Reads touch events from `libinput debug-events`, groups them into
/// multi-finger swipes, and runs the command configured for each swipe. A
/// swipe is keyed by how many fingers took part and which way they moved,
/// e.g. `3swipe_up` or `1swipe_left`.
///
/// Reading input events usually requires root, or membership of the `input`
/// group.
#[derive(Debug, Clone, clap::Parser)]
#[command(version, disable_version_flag = true)]
pub struct Args {
    /// Path to the JSON configuration file
    ///
    /// If the file is missing or can't be parsed, a default configuration
    /// with a few `echo` actions for 3-finger swipes is used instead.
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,
    /// Enables debug logging, regardless of the config file
    #[arg(long)]
    pub debug: bool,
    /// Program used to read input events
    ///
    /// It is run with the single argument `debug-events`.
    #[arg(long, default_value = "libinput")]
    pub libinput: OsString,
    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    pub version: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config: config_path,
        debug,
        libinput,
        version: _,
    } = Args::parse();

    // the config decides the log level, so report on loading it afterwards
    let loaded = Config::load(&config_path);
    init_logging(debug || loaded.as_ref().is_ok_and(|config| config.debug));

    let config = Config::or_default(&config_path, loaded);
    config.validate().with_context(|| "invalid configuration")?;
    debug!("Debug mode is enabled");

    let decoder = LineDecoder::new()?;
    let dispatcher = ShellDispatcher::new()?;
    let actions = Actions::new(config.gesture_actions);
    if actions.is_empty() {
        info!("No gesture actions configured, swipes will only be logged");
    } else {
        info!(
            "Threshold = {}, {} gesture action(s)",
            config.threshold,
            actions.len()
        );
    }
    let mut recognizer = Recognizer::new(config.threshold, actions, dispatcher);

    let shutdown = source::shutdown_signal()?;
    let child = source::spawn_libinput(&libinput)?;
    info!("Listening for touch events from {libinput:?} debug-events");

    source::run(child, &decoder, &mut recognizer, shutdown).await
}

fn init_logging(debug: bool) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(log::LevelFilter::Info);
    if debug {
        builder.filter_module(env!("CARGO_CRATE_NAME"), log::LevelFilter::Debug);
    }
    builder.parse_default_env();
    builder.init();
}
