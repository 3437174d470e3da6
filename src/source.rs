use std::{ffi::OsStr, future::Future, process::Stdio};

use anyhow::{Context, Result};
use futures::{never::Never, FutureExt};
use log::{debug, info, trace, warn};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    process::{Child, Command},
    signal::unix::{signal, SignalKind},
};

use crate::{action::Dispatch, event::LineDecoder, recognize::Recognizer};

/// Starts `<program> debug-events`, which prints every input event on the
/// system as a line of text.
///
/// The child gets its own process group, so a Ctrl-C in the terminal reaches
/// only us and we decide when it stops.
pub fn spawn_libinput(program: &OsStr) -> Result<Child> {
    Command::new(program)
        .arg("debug-events")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| {
            format!("failed to start {program:?} debug-events - is libinput installed?")
        })
}

/// Feeds lines from the event source through the recognizer until the source
/// closes.
///
/// Closing is always an error, since there is no way to get more input after
/// that.
pub async fn pump<R, D>(
    lines: R,
    decoder: &LineDecoder,
    recognizer: &mut Recognizer<D>,
) -> Result<Never>
where
    R: AsyncBufRead + Unpin,
    D: Dispatch,
{
    let mut lines = lines.lines();
    loop {
        let line = lines
            .next_line()
            .await
            .with_context(|| "failed to read event source output")?
            .with_context(|| "event source closed its output")?;
        trace!("Raw line: {line}");

        if let Some(event) = decoder.decode(&line) {
            let outcome = recognizer.handle(event);
            trace!("{event:?} -> {outcome:?}");
        }
    }
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// The handlers are installed before this returns, so signals arriving before
/// the future is first polled are not lost.
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigint = signal(SignalKind::interrupt()).with_context(|| "failed to listen for SIGINT")?;
    let mut sigterm =
        signal(SignalKind::terminate()).with_context(|| "failed to listen for SIGTERM")?;
    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    })
}

/// Runs the recognizer over libinput's output until `shutdown` resolves.
///
/// Returns `Ok` on shutdown, and an error if libinput exits or its output
/// can't be read. Shutdown wins over the output closing at the same time.
pub async fn run<D, S>(
    mut child: Child,
    decoder: &LineDecoder,
    recognizer: &mut Recognizer<D>,
    shutdown: S,
) -> Result<()>
where
    D: Dispatch,
    S: Future<Output = ()>,
{
    let stdout = child
        .stdout
        .take()
        .with_context(|| "event source has no stdout")?;
    tokio::pin!(shutdown);

    let source_err = tokio::select! {
        biased;
        () = &mut shutdown => None,
        res = pump(BufReader::new(stdout), decoder, recognizer) => match res {
            Ok(never) => match never {},
            Err(err) => Some(err),
        },
    };
    let Some(err) = source_err else {
        return terminate(child, recognizer).await;
    };
    if (&mut shutdown).now_or_never().is_some() {
        debug!("Event source closed while shutting down: {err:#}");
        return terminate(child, recognizer).await;
    }

    match child.wait().await {
        Ok(status) => warn!("libinput debug-events terminated with {status}"),
        Err(wait_err) => warn!(
            "Failed to wait for libinput debug-events: {:#}",
            anyhow::Error::new(wait_err)
        ),
    }
    Err(err)
}

async fn terminate<D: Dispatch>(mut child: Child, recognizer: &Recognizer<D>) -> Result<()> {
    info!("Terminating...");
    let touching = recognizer.tracker().active().count();
    if touching > 0 {
        debug!("Dropping gesture in progress with {touching} finger(s) touching");
    }
    if let Err(err) = child.kill().await {
        warn!(
            "Failed to kill libinput debug-events: {:#}",
            anyhow::Error::new(err)
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::action::Actions;

    #[derive(Debug, Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl Dispatch for Recorder {
        fn dispatch(&self, command: &str) {
            self.0.borrow_mut().push(command.to_owned());
        }
    }

    const SWIPE_UP: &str = "\
-event11  DEVICE_ADDED            Goodix Capacitive TouchScreen     seat0 default group5  cap:t  size 155x259mm calib
 event11  TOUCH_DOWN              +0.000s\t0 (0) 50.00/80.00 (77.50/207.20mm)
 event11  TOUCH_DOWN              +0.000s\t1 (1) 60.00/80.00 (93.00/207.20mm)
 event11  TOUCH_DOWN              +0.000s\t2 (2) 70.00/80.00 (108.50/207.20mm)
 event11  TOUCH_FRAME             +0.000s
 event11  TOUCH_MOTION            +0.010s\t0 (0) 50.00/80.00 (77.50/207.20mm)
 event11  TOUCH_MOTION            +0.010s\t1 (1) 60.00/80.00 (93.00/207.20mm)
 event11  TOUCH_MOTION            +0.010s\t2 (2) 70.00/80.00 (108.50/207.20mm)
 event11  TOUCH_FRAME             +0.010s
 event11  TOUCH_MOTION            +0.020s\t0 (0) 50.00/60.00 (77.50/155.40mm)
 event11  TOUCH_MOTION            +0.020s\t1 (1) 60.00/61.00 (93.00/158.00mm)
 event11  TOUCH_MOTION            +0.020s\t2 (2) 70.00/59.00 (108.50/152.80mm)
 event11  TOUCH_FRAME             +0.020s
 event11  TOUCH_UP                +0.030s\t0 (0)
 event11  TOUCH_UP                +0.030s\t1 (1)
 event11  TOUCH_UP                +0.030s\t2 (2)
 event11  TOUCH_FRAME             +0.030s
";

    #[tokio::test]
    async fn pump_dispatches_and_fails_at_end_of_stream() {
        let recorder = Recorder::default();
        let actions = Actions::new(
            [("3swipe_up".to_owned(), "echo up".to_owned())]
                .into_iter()
                .collect(),
        );
        let mut recognizer = Recognizer::new(10.0, actions, recorder.clone());
        let decoder = LineDecoder::new().unwrap();

        let err = pump(SWIPE_UP.as_bytes(), &decoder, &mut recognizer)
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("closed"));
        assert_eq!(*recorder.0.borrow(), ["echo up"]);
        assert!(recognizer.tracker().is_idle());
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let err = spawn_libinput(OsStr::new("/nonexistent/libinput")).unwrap_err();
        assert!(format!("{err:#}").contains("is libinput installed"));
    }

    fn fake_libinput(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.path().join("fake-libinput");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[tokio::test]
    async fn run_reports_source_exit() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_libinput(&dir, "echo ' event1 TOUCH_MOTION +0.1s 0 (0) 1.00/1.00'");

        let child = spawn_libinput(script.as_os_str()).unwrap();
        let decoder = LineDecoder::new().unwrap();
        let mut recognizer = Recognizer::new(10.0, Actions::default(), Recorder::default());
        let err = run(child, &decoder, &mut recognizer, std::future::pending())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("closed"));
        assert_eq!(recognizer.tracker().active().count(), 1);
    }

    #[tokio::test]
    async fn shutdown_exits_cleanly_and_kills_source() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_libinput(&dir, "exec sleep 100");
        let decoder = LineDecoder::new().unwrap();

        for _ in 0..5 {
            let child = spawn_libinput(script.as_os_str()).unwrap();
            let pid = child.id().unwrap();
            let mut recognizer = Recognizer::new(10.0, Actions::default(), Recorder::default());
            run(child, &decoder, &mut recognizer, async {})
                .await
                .unwrap();
            // reaped by the kill, so the pid no longer names our child
            let cmdline = std::fs::read_to_string(format!("/proc/{pid}/cmdline")).unwrap_or_default();
            assert!(!cmdline.contains("sleep"), "{cmdline:?}");
        }
    }

    #[tokio::test]
    async fn shutdown_wins_over_closed_output() {
        let dir = tempfile::tempdir().unwrap();
        // output is already closed by the time shutdown is requested
        let script = fake_libinput(&dir, "exit 0");
        let decoder = LineDecoder::new().unwrap();

        for _ in 0..10 {
            let child = spawn_libinput(script.as_os_str()).unwrap();
            let mut recognizer = Recognizer::new(10.0, Actions::default(), Recorder::default());
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            run(child, &decoder, &mut recognizer, async {})
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn libinput_runs_in_its_own_process_group() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_libinput(&dir, "exec sleep 100");

        let mut child = spawn_libinput(script.as_os_str()).unwrap();
        let pid = child.id().unwrap();
        let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).unwrap();
        // fields after the command name: state, ppid, pgrp
        let after_name = &stat[stat.rfind(')').unwrap() + 1..];
        let pgrp = after_name.split_whitespace().nth(2).unwrap();
        assert_eq!(pgrp, pid.to_string());

        child.kill().await.unwrap();
    }
}
