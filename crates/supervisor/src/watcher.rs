// SPDX-License-Identifier: MIT

//! Filesystem watcher: bridges `notify`'s synchronous callback into an
//! async stream of classified events for one directory.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

/// A raw filesystem event, already filtered to `.sh` paths and classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    Created(PathBuf),
    Written(PathBuf),
    Removed(PathBuf),
}

/// Starts watching `dir` and returns a receiver of classified events plus
/// the live watcher (drop it to stop watching).
pub fn watch(dir: &Path) -> notify::Result<(mpsc::Receiver<RawEvent>, RecommendedWatcher)> {
    let (tx, rx) = mpsc::channel(256);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "filesystem watcher error");
                return;
            }
        };
        for raw in classify(&event) {
            if tx.blocking_send(raw).is_err() {
                // Receiver dropped; the watcher is being torn down.
                return;
            }
        }
    })?;

    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok((rx, watcher))
}

fn classify(event: &notify::Event) -> Vec<RawEvent> {
    if let EventKind::Modify(ModifyKind::Name(mode)) = event.kind {
        return classify_rename(mode, &event.paths);
    }

    event
        .paths
        .iter()
        .filter(|p| is_sh_path(p))
        .filter_map(|path| {
            let raw = match event.kind {
                EventKind::Create(_) => RawEvent::Created(path.clone()),
                EventKind::Modify(_) => RawEvent::Written(path.clone()),
                EventKind::Remove(_) => RawEvent::Removed(path.clone()),
                _ => return None,
            };
            Some(raw)
        })
        .collect()
}

fn is_sh_path(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("sh")
}

/// A rename of a `.sh` file is removal of the old path, not a write: the
/// script under the old name no longer exists. `Both` carries `[from, to]`
/// in one event; some backends instead deliver a `From`/`To` pair of
/// single-path events.
fn classify_rename(mode: RenameMode, paths: &[PathBuf]) -> Vec<RawEvent> {
    match mode {
        RenameMode::Both => match paths {
            [from, to] => {
                let mut events = Vec::new();
                if is_sh_path(from) {
                    events.push(RawEvent::Removed(from.clone()));
                }
                if is_sh_path(to) {
                    events.push(RawEvent::Created(to.clone()));
                }
                events
            }
            _ => Vec::new(),
        },
        RenameMode::From => {
            paths.iter().filter(|p| is_sh_path(p)).map(|p| RawEvent::Removed(p.clone())).collect()
        }
        RenameMode::To => {
            paths.iter().filter(|p| is_sh_path(p)).map(|p| RawEvent::Created(p.clone())).collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
