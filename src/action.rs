use std::process::{Output, Stdio};

use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info};
use tokio::{process::Command, runtime::Handle};

/// Gesture keys mapped to the command run when that gesture is performed.
#[derive(Debug, Clone, Default)]
pub struct Actions(AHashMap<String, String>);

impl Actions {
    pub fn new(actions: AHashMap<String, String>) -> Self {
        Self(actions)
    }

    /// Finds the command for a gesture key, matching the key exactly.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Runs action commands.
///
/// `dispatch` must not block: it starts the command and returns immediately,
/// without waiting for it to finish or reporting whether it succeeded. Several
/// commands may be running at the same time.
pub trait Dispatch {
    fn dispatch(&self, command: &str);
}

/// Runs each command through `sh -c` on its own tokio task, logging whatever
/// the command prints.
///
/// Commands inherit this process's environment, so things like
/// `WAYLAND_DISPLAY` and `XDG_RUNTIME_DIR` are available to them.
#[derive(Debug, Clone)]
pub struct ShellDispatcher {
    runtime: Handle,
}

impl ShellDispatcher {
    /// Creates a dispatcher which spawns onto the current tokio runtime.
    pub fn new() -> Result<Self> {
        let runtime =
            Handle::try_current().with_context(|| "must be created inside a tokio runtime")?;
        Ok(Self { runtime })
    }
}

impl Dispatch for ShellDispatcher {
    fn dispatch(&self, command: &str) {
        info!("Executing command: {command}");
        let command = command.to_owned();
        // detached: nothing joins this task
        drop(self.runtime.spawn(async move {
            match run_shell(&command).await {
                Ok(output) => debug!("Command output: {}", output.trim()),
                Err(err) => error!("Error executing command {command:?}: {err:#}"),
            }
        }));
    }
}

fn combined_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Runs `command` with `sh -c` and returns everything it wrote to stdout and
/// stderr. A nonzero exit is an error carrying that output.
pub async fn run_shell(command: &str) -> Result<String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| "failed to launch sh")?;

    let text = combined_output(&output);
    if output.status.success() {
        Ok(text)
    } else {
        Err(anyhow!("{}\nOutput: {}", output.status, text.trim()))
    }
}
