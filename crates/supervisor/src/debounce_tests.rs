// SPDX-License-Identifier: MIT

use super::*;

#[tokio::test(start_paused = true)]
async fn a_burst_of_events_fires_exactly_once() {
    let debouncer = Debouncer::new();
    let (tx, mut rx) = mpsc::channel(8);
    let path = PathBuf::from("/scripts/greet.sh");
    let window = Duration::from_millis(500);

    for _ in 0..10 {
        debouncer.note_event(path.clone(), window, tx.clone());
        tokio::time::advance(Duration::from_millis(50)).await;
    }
    drop(tx);

    tokio::time::advance(window).await;
    let fired = rx.recv().await;
    assert_eq!(fired, Some(path));
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn independent_paths_each_fire() {
    let debouncer = Debouncer::new();
    let (tx, mut rx) = mpsc::channel(8);
    let window = Duration::from_millis(100);

    debouncer.note_event(PathBuf::from("/a.sh"), window, tx.clone());
    debouncer.note_event(PathBuf::from("/b.sh"), window, tx.clone());
    drop(tx);

    tokio::time::advance(window).await;
    let mut seen = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
    seen.sort();
    assert_eq!(seen, vec![PathBuf::from("/a.sh"), PathBuf::from("/b.sh")]);
}
