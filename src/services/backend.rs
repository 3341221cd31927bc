//! Backend process lifecycle management.
//!
//! The supervisor owns at most one backend handle at a time. Starting a new
//! backend always requests termination of the previous process first; the
//! actual exit is confirmed asynchronously by a watcher thread that reaps
//! the child and flips the handle to `Exited`. There is no automatic restart
//! and no retry: a backend that dies stays down until the user selects a
//! data source again.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::ShellError;

/// Executable name the backend ships under.
#[cfg(not(windows))]
const BACKEND_BINARY: &str = "scout-server";
#[cfg(windows)]
const BACKEND_BINARY: &str = "scout-server.exe";

/// Subdirectory of the resource dir holding bundled binaries.
const BUNDLED_DIR: &str = "binaries";

/// How long a restart waits for the previous process's confirmed exit before
/// rebinding the shared port anyway.
const RESTART_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle states of a backend handle.
///
/// `Stopped` records that termination has been requested; `Exited` that the
/// watcher confirmed the process is gone (or that it never spawned).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Stopped,
    Starting,
    Running,
    Exited,
}

/// Status cell shared between the supervisor and the watcher thread.
struct SharedStatus {
    status: Mutex<ProcessStatus>,
    exited: Condvar,
}

impl SharedStatus {
    fn new(status: ProcessStatus) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status),
            exited: Condvar::new(),
        })
    }

    fn get(&self) -> ProcessStatus {
        *self.status.lock().unwrap()
    }

    fn set(&self, next: ProcessStatus) {
        *self.status.lock().unwrap() = next;
        if next == ProcessStatus::Exited {
            self.exited.notify_all();
        }
    }

    fn transition(&self, from: ProcessStatus, to: ProcessStatus) -> bool {
        let mut guard = self.status.lock().unwrap();
        if *guard == from {
            *guard = to;
            true
        } else {
            false
        }
    }
}

/// Handle to the current backend process. Replaced wholesale on every start
/// request, never merged.
pub struct BackendHandle {
    /// OS process id; `None` when the spawn itself failed.
    pid: Option<u32>,
    port: u16,
    data_source: PathBuf,
    termination_requested: bool,
    shared: Arc<SharedStatus>,
}

impl BackendHandle {
    /// Handle for a start request whose spawn failed: no process, already
    /// confirmed exited.
    fn failed(data_source: &Path, port: u16) -> Self {
        Self {
            pid: None,
            port,
            data_source: data_source.to_path_buf(),
            termination_requested: false,
            shared: SharedStatus::new(ProcessStatus::Exited),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn data_source(&self) -> &Path {
        &self.data_source
    }

    pub fn status(&self) -> ProcessStatus {
        self.shared.get()
    }

    /// Whether a termination request has been issued against this handle.
    #[allow(dead_code)]
    pub fn termination_requested(&self) -> bool {
        self.termination_requested
    }

    /// Block until the watcher confirms exit, bounded by `timeout`. Returns
    /// whether the exit was confirmed in time.
    pub fn wait_for_exit(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut status = self.shared.status.lock().unwrap();
        while *status != ProcessStatus::Exited {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _timed_out) = self
                .shared
                .exited
                .wait_timeout(status, deadline - now)
                .unwrap();
            status = guard;
        }
        true
    }
}

/// Fully resolved backend invocation.
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
}

/// Owns the lifecycle of the backend process.
///
/// All shell-side mutation of backend state goes through [`start`],
/// [`stop`] and [`restart_with`] on this one value, held in `AppState`
/// behind a mutex.
///
/// [`start`]: BackendSupervisor::start
/// [`stop`]: BackendSupervisor::stop
/// [`restart_with`]: BackendSupervisor::restart_with
pub struct BackendSupervisor {
    resource_dir: Option<PathBuf>,
    current: Option<BackendHandle>,
}

impl BackendSupervisor {
    pub fn new(resource_dir: Option<PathBuf>) -> Self {
        Self {
            resource_dir,
            current: None,
        }
    }

    /// Current handle, if a start request has ever been made this run.
    pub fn current(&self) -> Option<&BackendHandle> {
        self.current.as_ref()
    }

    /// Start the backend for `data_source` on `port`, superseding any
    /// previous backend.
    ///
    /// Termination of the previous process is requested before the new spawn
    /// and not awaited; use [`BackendSupervisor::restart_with`] where the
    /// port must be provably released first.
    pub fn start(&mut self, data_source: &Path, port: u16) -> Result<(), ShellError> {
        self.stop();
        let plan = match self.launch_plan(data_source, port) {
            Ok(plan) => plan,
            Err(e) => {
                log::error!("Cannot start backend: {e}");
                self.current = Some(BackendHandle::failed(data_source, port));
                return Err(e);
            }
        };
        self.spawn(data_source, port, plan)
    }

    /// Request termination of the current backend and mark its handle
    /// `Stopped` immediately, without waiting for the OS to reap it.
    pub fn stop(&mut self) {
        let Some(handle) = self.current.as_mut() else {
            return;
        };
        match handle.status() {
            ProcessStatus::Stopped | ProcessStatus::Exited => {}
            ProcessStatus::Starting | ProcessStatus::Running => {
                if let Some(pid) = handle.pid {
                    log::info!("Requesting termination of backend (pid {pid})");
                    request_termination(pid);
                }
                handle.termination_requested = true;
                handle.shared.set(ProcessStatus::Stopped);
            }
        }
    }

    /// Replace the data source: stop the current backend, wait (bounded) for
    /// its confirmed exit so the shared port is actually released, then
    /// start the successor.
    pub fn restart_with(&mut self, data_source: &Path, port: u16) -> Result<(), ShellError> {
        self.await_release(port);
        self.start(data_source, port)
    }

    /// Flip the current handle from `Starting` to `Running` once the
    /// readiness probe has seen the listener answer.
    pub fn mark_running(&mut self) {
        if let Some(handle) = self.current.as_ref() {
            if handle
                .shared
                .transition(ProcessStatus::Starting, ProcessStatus::Running)
            {
                log::info!("Backend on port {} is ready", handle.port);
            }
        }
    }

    /// Stop the current backend and wait, bounded, for the watcher to
    /// confirm its exit. A request alone does not prove the port is free.
    fn await_release(&mut self, port: u16) {
        self.stop();
        if let Some(prev) = self.current.as_ref() {
            if prev.pid.is_some() && !prev.wait_for_exit(RESTART_GRACE) {
                log::warn!(
                    "Previous backend (pid {:?}) not confirmed exited after {RESTART_GRACE:?}; \
                     rebinding port {port} anyway",
                    prev.pid
                );
            }
        }
    }

    /// Resolve the backend executable, re-checked on every start: the
    /// bundled copy under the resource directory wins, a PATH lookup is the
    /// fallback.
    fn launch_plan(&self, data_source: &Path, port: u16) -> Result<LaunchPlan, ShellError> {
        let bundled = self
            .resource_dir
            .as_ref()
            .map(|dir| dir.join(BUNDLED_DIR).join(BACKEND_BINARY));
        let program = match bundled.as_ref().filter(|candidate| candidate.is_file()) {
            Some(candidate) => candidate.clone(),
            None => find_in_path(BACKEND_BINARY)
                .ok_or_else(|| ShellError::BackendNotFound { bundled: bundled.clone() })?,
        };
        let args = vec![
            OsString::from("--db"),
            data_source.as_os_str().to_os_string(),
            OsString::from("--port"),
            OsString::from(port.to_string()),
        ];
        Ok(LaunchPlan {
            program,
            args,
            working_dir: self.resource_dir.clone(),
        })
    }

    /// Spawn `plan` and install the exit watcher.
    fn spawn(
        &mut self,
        data_source: &Path,
        port: u16,
        plan: LaunchPlan,
    ) -> Result<(), ShellError> {
        let mut command = Command::new(&plan.program);
        command
            .args(&plan.args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &plan.working_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = ShellError::Spawn {
                    program: plan.program,
                    source,
                };
                log::error!("{err}");
                self.current = Some(BackendHandle::failed(data_source, port));
                return Err(err);
            }
        };

        let pid = child.id();
        log::info!(
            "Started backend pid {pid} on port {port} for {}",
            data_source.display()
        );

        let shared = SharedStatus::new(ProcessStatus::Starting);
        let watcher_shared = Arc::clone(&shared);
        // The watcher owns the child: it reaps the process and is the only
        // place `Exited` is confirmed from.
        std::thread::spawn(move || {
            match child.wait() {
                Ok(status) => log::info!("Backend pid {pid} exited with {status}"),
                Err(e) => log::error!("Failed to wait on backend pid {pid}: {e}"),
            }
            watcher_shared.set(ProcessStatus::Exited);
        });

        self.current = Some(BackendHandle {
            pid: Some(pid),
            port,
            data_source: data_source.to_path_buf(),
            termination_requested: false,
            shared,
        });
        Ok(())
    }

    /// Like [`BackendSupervisor::start`], but with a caller-supplied plan.
    #[cfg(test)]
    fn start_plan(
        &mut self,
        data_source: &Path,
        port: u16,
        plan: LaunchPlan,
    ) -> Result<(), ShellError> {
        self.stop();
        self.spawn(data_source, port, plan)
    }
}

/// Fire-and-forget termination request, the platform-appropriate way.
fn request_termination(pid: u32) {
    #[cfg(unix)]
    unsafe {
        libc::kill(pid as i32, libc::SIGTERM);
    }

    #[cfg(windows)]
    {
        let _ = Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/F"])
            .output();
    }
}

/// First executable named `name` on PATH.
fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn launch_plan_prefers_the_bundled_binary() {
        let dir = tempdir().expect("tempdir");
        let bundled_dir = dir.path().join(BUNDLED_DIR);
        std::fs::create_dir_all(&bundled_dir).expect("create bundled dir");
        let bundled = bundled_dir.join(BACKEND_BINARY);
        std::fs::write(&bundled, b"").expect("seed bundled binary");

        let sup = BackendSupervisor::new(Some(dir.path().to_path_buf()));
        let plan = sup
            .launch_plan(Path::new("/data/units.db"), 4242)
            .expect("plan");
        assert_eq!(plan.program, bundled);
        assert_eq!(
            plan.args,
            vec![
                OsString::from("--db"),
                OsString::from("/data/units.db"),
                OsString::from("--port"),
                OsString::from("4242"),
            ]
        );
        assert_eq!(plan.working_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn executable_resolution_is_rechecked_per_start() {
        let dir = tempdir().expect("tempdir");
        let sup = BackendSupervisor::new(Some(dir.path().to_path_buf()));
        let bundled = dir.path().join(BUNDLED_DIR).join(BACKEND_BINARY);

        let before = sup
            .launch_plan(Path::new("x.db"), 1)
            .map(|plan| plan.program)
            .ok();
        assert_ne!(before.as_deref(), Some(bundled.as_path()));

        // Dropping the binary into the bundle is picked up by the same
        // supervisor on its next start.
        std::fs::create_dir_all(bundled.parent().unwrap()).expect("create bundled dir");
        std::fs::write(&bundled, b"").expect("seed bundled binary");
        let after = sup.launch_plan(Path::new("x.db"), 1).expect("plan").program;
        assert_eq!(after, bundled);
    }

    #[test]
    fn stop_without_a_start_is_a_no_op() {
        let mut sup = BackendSupervisor::new(None);
        sup.stop();
        assert!(sup.current().is_none());
    }
}

#[cfg(all(test, unix))]
mod process_tests {
    use super::*;

    fn sleep_plan() -> LaunchPlan {
        LaunchPlan {
            program: find_in_path("sleep").expect("sleep on PATH"),
            args: vec![OsString::from("30")],
            working_dir: None,
        }
    }

    /// Whether `pid` no longer exists (reaped by the watcher).
    fn reaped(pid: u32) -> bool {
        unsafe { libc::kill(pid as i32, 0) != 0 }
    }

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        for _ in 0..250 {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        cond()
    }

    #[test]
    fn second_start_supersedes_and_terminates_the_first() {
        let mut sup = BackendSupervisor::new(None);
        sup.start_plan(Path::new("/tmp/first.db"), 7001, sleep_plan())
            .expect("spawn first");
        let first_pid = sup.current().unwrap().pid().unwrap();

        sup.start_plan(Path::new("/tmp/second.db"), 7001, sleep_plan())
            .expect("spawn second");
        let second = sup.current().unwrap();
        assert_eq!(second.data_source(), Path::new("/tmp/second.db"));
        assert_eq!(second.status(), ProcessStatus::Starting);
        let second_pid = second.pid().unwrap();
        assert_ne!(first_pid, second_pid);

        // The first process was signalled before the second spawn; the
        // watcher reaps it shortly after.
        assert!(wait_until(|| reaped(first_pid)));
        assert!(!reaped(second_pid));

        sup.stop();
        assert!(wait_until(|| reaped(second_pid)));
    }

    #[test]
    fn stop_right_after_start_requests_termination_without_panicking() {
        let mut sup = BackendSupervisor::new(None);
        sup.start_plan(Path::new("/tmp/units.db"), 7002, sleep_plan())
            .expect("spawn");
        sup.stop();

        let handle = sup.current().unwrap();
        assert!(handle.termination_requested());
        assert_eq!(handle.status(), ProcessStatus::Stopped);
        // Confirmation arrives via the watcher, not the stop call.
        assert!(handle.wait_for_exit(Duration::from_secs(5)));
        assert_eq!(handle.status(), ProcessStatus::Exited);
    }

    #[test]
    fn release_wait_confirms_exit_before_a_restart() {
        let mut sup = BackendSupervisor::new(None);
        sup.start_plan(Path::new("/tmp/first.db"), 7003, sleep_plan())
            .expect("spawn first");
        let first_pid = sup.current().unwrap().pid().unwrap();

        sup.await_release(7003);
        // await_release returns only once the watcher confirmed the exit.
        assert_eq!(sup.current().unwrap().status(), ProcessStatus::Exited);
        assert!(reaped(first_pid));

        sup.start_plan(Path::new("/tmp/second.db"), 7003, sleep_plan())
            .expect("spawn second");
        assert_eq!(
            sup.current().unwrap().data_source(),
            Path::new("/tmp/second.db")
        );
        sup.stop();
    }

    #[test]
    fn spawn_failure_leaves_an_exited_handle_and_no_retry() {
        let mut sup = BackendSupervisor::new(None);
        let plan = LaunchPlan {
            program: PathBuf::from("/nonexistent/scout-server"),
            args: Vec::new(),
            working_dir: None,
        };
        let err = sup
            .start_plan(Path::new("/tmp/units.db"), 7004, plan)
            .unwrap_err();
        assert!(matches!(err, ShellError::Spawn { .. }));

        let handle = sup.current().unwrap();
        assert_eq!(handle.pid(), None);
        assert_eq!(handle.status(), ProcessStatus::Exited);
        // A handle that never spawned is already confirmed exited.
        assert!(handle.wait_for_exit(Duration::from_millis(10)));
    }
}
