mod common;

use std::sync::Arc;

use ampd_proto::protocol::{ConnectionState, Mode, ModesPanel, OutboundCommand};
use ampd_sync::{
    spawn_publisher, ChannelAdapter, CommandDispatcher, CoverUrls, DispatchError, Intent,
    LoopbackChannel, PublisherOptions, SeekDirection,
};
use common::{next_track, snapshot};

#[tokio::test]
async fn seek_from_current_track_position() {
    let channel = Arc::new(LoopbackChannel::default());
    channel.set_state(ConnectionState::Open);
    let signals = spawn_publisher(
        channel.as_ref(),
        PublisherOptions {
            covers: CoverUrls::new("http://backend"),
            capacity: 16,
        },
    );
    let mut events = signals.track_events();
    let dispatcher = CommandDispatcher::new(channel.clone() as Arc<dyn ChannelAdapter>, 15);

    channel.deliver(snapshot(1, 230, "Music/1.mp3"));
    let track = next_track(&mut events).await;

    dispatcher
        .dispatch(&Intent::seek_from(&track, SeekDirection::Forward))
        .unwrap();
    dispatcher
        .dispatch(&Intent::seek_from(&track, SeekDirection::Backward))
        .unwrap();

    // Length in the fixture is 240 seconds.
    assert_eq!(
        channel.sent(),
        vec![
            OutboundCommand::SetSeek { value: 240.0 },
            OutboundCommand::SetSeek { value: 215.0 },
        ]
    );
}

#[tokio::test]
async fn toggling_a_mode_sends_the_whole_panel() {
    let channel = Arc::new(LoopbackChannel::default());
    channel.set_state(ConnectionState::Open);
    let dispatcher = CommandDispatcher::new(channel.clone(), 10);

    let panel = ModesPanel::default().toggled(Mode::Repeat);
    dispatcher.dispatch(&Intent::SetModes(panel)).unwrap();

    let sent = channel.sent();
    assert_eq!(sent.len(), 1);
    let json = serde_json::to_value(&sent[0]).unwrap();
    assert_eq!(json["type"], "SET_CONTROL_PANEL");
    assert_eq!(json["payload"]["controlPanel"]["repeat"], true);
    assert_eq!(json["payload"]["controlPanel"]["random"], false);
}

#[test]
fn nothing_is_queued_while_disconnected() {
    let channel = Arc::new(LoopbackChannel::default());
    let dispatcher = CommandDispatcher::new(channel.clone(), 10);

    for intent in [Intent::Play, Intent::Next, Intent::ClearQueue] {
        assert_eq!(
            dispatcher.dispatch(&intent),
            Err(DispatchError::ChannelClosed(ConnectionState::Connecting))
        );
    }

    channel.set_state(ConnectionState::Open);
    dispatcher.dispatch(&Intent::Stop).unwrap();
    // Earlier rejected intents are not replayed.
    assert_eq!(channel.sent(), vec![OutboundCommand::SetStop]);
}
