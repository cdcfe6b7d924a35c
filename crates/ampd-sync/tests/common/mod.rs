#![allow(dead_code)]

use std::time::Duration;

use ampd_proto::protocol::InboundMessage;
use ampd_sync::NormalizedTrack;
use tokio::sync::{broadcast, watch};

pub const WAIT: Duration = Duration::from_secs(2);

pub fn snapshot(id: i64, elapsed: u64, file: &str) -> InboundMessage {
    snapshot_with(id, elapsed, file, "play", false)
}

pub fn snapshot_with(id: i64, elapsed: u64, file: &str, state: &str, random: bool) -> InboundMessage {
    InboundMessage::state(format!(
        r#"{{"serverStatus":{{"state":"{state}","elapsedTime":{elapsed}}},
            "currentTrack":{{"id":{id},"title":"Track {id}","artistName":"Artist","albumName":"Album","file":"{file}","length":240}},
            "mpdModesPanelMsg":{{"random":{random},"consume":false,"single":false,"crossfade":false,"repeat":false}}}}"#
    ))
}

/// Snapshot with the empty track the backend sends when nothing is loaded.
pub fn placeholder(elapsed: u64) -> InboundMessage {
    InboundMessage::state(format!(
        r#"{{"serverStatus":{{"state":"stop","elapsedTime":{elapsed}}},
            "currentTrack":{{"id":0,"title":"","artistName":"","file":""}},
            "mpdModesPanelMsg":{{"random":false,"consume":false,"single":false,"crossfade":false,"repeat":false}}}}"#
    ))
}

pub fn queue_of(count: usize) -> InboundMessage {
    let items: Vec<String> = (0..count)
        .map(|i| format!(r#"{{"id":{i},"file":"Music/{i}.mp3"}}"#))
        .collect();
    InboundMessage::queue(format!("[{}]", items.join(",")))
}

pub async fn next_track(rx: &mut broadcast::Receiver<NormalizedTrack>) -> NormalizedTrack {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a track event")
        .expect("track events closed")
}

/// Wait until `rx` holds a value matching `pred`.
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, pred: F) -> T
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            {
                let value = rx.borrow_and_update();
                if pred(&*value) {
                    return value.clone();
                }
            }
            rx.changed().await.expect("signal closed");
        }
    })
    .await
    .expect("timed out waiting for signal")
}
