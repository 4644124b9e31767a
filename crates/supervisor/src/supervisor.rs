// SPDX-License-Identifier: MIT

//! Supervisor / Manager: directory discovery, filesystem surveillance,
//! script-to-service grouping, and supervised restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use scriptmesh_bus::Bus;
use scriptmesh_core::SubjectRewriter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::backoff::Backoff;
use crate::debounce::Debouncer;
use crate::discovery;
use crate::managed_service::ManagedService;
use crate::watcher::{self, RawEvent};

/// How long a serve loop must run before a subsequent failure is treated as
/// a fresh run rather than a continuation of the same instability.
const STABILITY_WINDOW: Duration = Duration::from_secs(60);
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);
const PERMISSION_POLL_INTERVAL: Duration = Duration::from_secs(5);

struct SupervisedTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

struct State<B: Bus> {
    services: IndexMap<String, Arc<ManagedService<B>>>,
    tasks: HashMap<String, SupervisedTask>,
    script_index: HashMap<PathBuf, String>,
    last_executable: HashMap<PathBuf, bool>,
}

/// Tunable knobs the daemon entry point resolves from configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub scripts_dir: PathBuf,
    pub host_id: String,
    pub describe_deadline: Duration,
    pub handle_deadline: Duration,
    pub shutdown_grace: Duration,
}

/// The root lifecycle owner for every Managed Service.
pub struct Supervisor<B: Bus> {
    config: SupervisorConfig,
    bus: Arc<B>,
    rewriter: SubjectRewriter,
    state: Mutex<State<B>>,
    root_token: CancellationToken,
}

impl<B: Bus + 'static> Supervisor<B> {
    pub fn new(config: SupervisorConfig, bus: Arc<B>) -> Self {
        let rewriter = SubjectRewriter::new(config.host_id.clone());
        Self {
            config,
            bus,
            rewriter,
            state: Mutex::new(State {
                services: IndexMap::new(),
                tasks: HashMap::new(),
                script_index: HashMap::new(),
                last_executable: HashMap::new(),
            }),
            root_token: CancellationToken::new(),
        }
    }

    pub fn root_token(&self) -> CancellationToken {
        self.root_token.clone()
    }

    pub fn service_names(&self) -> Vec<String> {
        self.state.lock().services.keys().cloned().collect()
    }

    pub fn owning_service(&self, path: &Path) -> Option<String> {
        self.state.lock().script_index.get(path).cloned()
    }

    /// Non-recursive scan of the configured directory, admitting every
    /// candidate script. Returns the count admitted.
    pub async fn discover(&self) -> usize {
        let candidates = match discovery::scan(&self.config.scripts_dir) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(dir = %self.config.scripts_dir.display(), error = %e, "directory scan failed");
                return 0;
            }
        };
        let mut admitted = 0;
        for path in &candidates {
            self.state.lock().last_executable.insert(path.clone(), true);
            if self.add_script(path).await {
                admitted += 1;
            }
        }
        info!(count = admitted, dir = %self.config.scripts_dir.display(), "discovery complete");
        admitted
    }

    /// Admit `path`: probe it, group it under its declared service name,
    /// creating or extending a Managed Service as needed. Returns `true` if
    /// the script was admitted.
    pub async fn add_script(&self, path: &Path) -> bool {
        if self.state.lock().script_index.contains_key(path) {
            warn!(path = %path.display(), "script already admitted, ignoring");
            return false;
        }

        let descriptor = match scriptmesh_probe::describe(path, self.config.describe_deadline).await
        {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "probe failed, not admitting");
                return false;
            }
        };
        let svc_name = descriptor.name.clone();

        let existing = self.state.lock().services.get(&svc_name).cloned();
        if let Some(service) = existing {
            service.add_script(path).await;
            self.state.lock().script_index.insert(path.to_path_buf(), svc_name.clone());
            self.reinitialize_live(&svc_name, &service).await;
        } else {
            let service = Arc::new(ManagedService::new(
                svc_name.clone(),
                self.bus.clone(),
                self.rewriter.clone(),
                self.config.describe_deadline,
                self.config.handle_deadline,
            ));
            service.add_script(path).await;
            {
                let mut state = self.state.lock();
                state.services.insert(svc_name.clone(), service.clone());
                state.script_index.insert(path.to_path_buf(), svc_name.clone());
            }
            self.spawn_supervised(svc_name, service);
        }
        true
    }

    /// Remove `path` from its owning service, tearing the service down if it
    /// becomes empty.
    pub async fn remove_script(&self, path: &Path) {
        let svc_name = {
            let mut state = self.state.lock();
            state.last_executable.remove(path);
            match state.script_index.remove(path) {
                Some(name) => name,
                None => return,
            }
        };
        let service = self.state.lock().services.get(&svc_name).cloned();
        let Some(service) = service else { return };

        let now_empty = service.remove_script(path);
        if now_empty {
            self.teardown(&svc_name).await;
        } else {
            self.reinitialize_live(&svc_name, &service).await;
        }
    }

    /// Restart `path`: equivalent to removing then re-adding it, since its
    /// descriptor (and therefore its service name) may have changed.
    pub async fn restart_script(&self, path: &Path) {
        self.remove_script(path).await;
        self.add_script(path).await;
    }

    async fn teardown(&self, svc_name: &str) {
        {
            let mut state = self.state.lock();
            state.services.shift_remove(svc_name);
        }
        let task = self.state.lock().tasks.remove(svc_name);
        if let Some(task) = task {
            task.token.cancel();
            let _ = task.handle.await;
        }
        info!(service = %svc_name, "managed service torn down");
    }

    /// Tear down and reconstitute the live bus registration so the bus never
    /// observes a partial endpoint set.
    async fn reinitialize_live(&self, svc_name: &str, service: &Arc<ManagedService<B>>) {
        service.initialize().await;
        let task = self.state.lock().tasks.remove(svc_name);
        if let Some(task) = task {
            task.token.cancel();
            let _ = task.handle.await;
        }
        self.spawn_supervised(svc_name.to_string(), service.clone());
    }

    fn spawn_supervised(&self, name: String, service: Arc<ManagedService<B>>) {
        let token = self.root_token.child_token();
        let child = token.clone();
        let handle = tokio::spawn(async move { run_supervised(service, child).await });
        self.state.lock().tasks.insert(name, SupervisedTask { token, handle });
    }

    /// Handle one classified filesystem event, debouncing writes.
    pub async fn handle_raw_event(&self, event: RawEvent, debouncer: &Debouncer, fire: tokio::sync::mpsc::Sender<PathBuf>) {
        match event {
            RawEvent::Created(path) => {
                self.state.lock().last_executable.insert(path.clone(), discovery::is_executable(&path));
                self.add_script(&path).await;
            }
            RawEvent::Written(path) => {
                debouncer.note_event(path, DEBOUNCE_WINDOW, fire);
            }
            RawEvent::Removed(path) => {
                self.remove_script(&path).await;
            }
        }
    }

    /// Run the filesystem watcher, the debounced-write handler, and the
    /// permission-flip poller until the root token is cancelled, then wait
    /// up to the shutdown grace for in-flight supervised tasks.
    pub async fn run(self: Arc<Self>) {
        let (mut raw_rx, _watcher) = match watcher::watch(&self.config.scripts_dir) {
            Ok(w) => w,
            Err(e) => {
                warn!(error = %e, "failed to start filesystem watcher");
                self.root_token.cancel();
                return;
            }
        };
        let debouncer = Debouncer::new();
        let (fire_tx, mut fire_rx) = tokio::sync::mpsc::channel::<PathBuf>(256);

        let mut poll_interval = tokio::time::interval(PERMISSION_POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = self.root_token.cancelled() => break,
                Some(event) = raw_rx.recv() => {
                    self.handle_raw_event(event, &debouncer, fire_tx.clone()).await;
                }
                Some(path) = fire_rx.recv() => {
                    self.restart_or_admit_on_write(&path).await;
                }
                _ = poll_interval.tick() => {
                    self.poll_permissions().await;
                }
            }
        }

        self.shutdown().await;
    }

    async fn restart_or_admit_on_write(&self, path: &Path) {
        if self.owning_service(path).is_some() {
            self.restart_script(path).await;
        } else {
            self.add_script(path).await;
        }
    }

    async fn poll_permissions(&self) {
        let files = match discovery::list_sh_files(&self.config.scripts_dir) {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "permission poll scan failed");
                return;
            }
        };
        for path in files {
            let now_executable = discovery::is_executable(&path);
            let was_executable = self.state.lock().last_executable.insert(path.clone(), now_executable);
            match was_executable {
                Some(false) | None if now_executable => {
                    self.add_script(&path).await;
                }
                Some(true) if !now_executable => {
                    self.remove_script(&path).await;
                }
                _ => {}
            }
        }
    }

    async fn shutdown(&self) {
        let tasks: Vec<SupervisedTask> = {
            let mut state = self.state.lock();
            state.tasks.drain().map(|(_, task)| task).collect()
        };
        for task in &tasks {
            task.token.cancel();
        }
        let joins = tasks.into_iter().map(|t| t.handle);
        let _ = tokio::time::timeout(self.config.shutdown_grace, join_all_handles(joins)).await;
    }
}

async fn join_all_handles(handles: impl IntoIterator<Item = JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.await;
    }
}

/// Drive one Managed Service's initialize/serve cycle under exponential
/// backoff, giving up after too many consecutive failures.
async fn run_supervised<B: Bus + 'static>(service: Arc<ManagedService<B>>, token: CancellationToken) {
    let mut backoff = Backoff::new();
    loop {
        service.initialize().await;
        let started = tokio::time::Instant::now();
        match service.serve(token.clone()).await {
            Ok(()) => break,
            Err(e) => {
                if started.elapsed() >= STABILITY_WINDOW {
                    backoff.note_stable();
                }
                warn!(service = %service.name(), error = %e, "managed service failed");
                match backoff.note_failure() {
                    Some(delay) => tokio::time::sleep(delay).await,
                    None => {
                        tracing::error!(service = %service.name(), "giving up after repeated failures");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
