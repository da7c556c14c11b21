use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket},
    thread,
    time::{Duration, Instant},
};

use telemetry::{
    ListenerConfig, ListenerError, ListenerStats, MarkerSample, MarkerSlot, TelemetryListener,
};

fn loopback_config() -> ListenerConfig {
    ListenerConfig {
        bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        ..Default::default()
    }
}

fn send_all(target: SocketAddr, messages: &[String]) {
    let sender = UdpSocket::bind("127.0.0.1:0").expect("bind sender");
    for message in messages {
        sender.send_to(message.as_bytes(), target).expect("send datagram");
    }
}

fn wait_for(listener: &TelemetryListener, done: impl Fn(&ListenerStats) -> bool) -> ListenerStats {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let stats = listener.stats();
        if done(&stats) {
            return stats;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for listener, stats: {:?}",
            stats
        );
        thread::sleep(Duration::from_millis(5));
    }
}

fn marker_message(label: usize, z: f64) -> String {
    format!("Marker Hand{}: X={} Y={} Z={}", label, label as f64, -(label as f64), z)
}

#[test]
fn test_messages_fill_slots_cyclically() {
    let _ = env_logger::builder().is_test(true).try_init();
    let listener = TelemetryListener::start(loopback_config()).expect("listener starts");
    let reader = listener.reader();

    let messages: Vec<String> = (1..=5)
        .map(|n| marker_message((n - 1) % 4 + 1, n as f64 * 100.0))
        .collect();
    send_all(listener.local_addr(), &messages);

    let stats = wait_for(&listener, |s| s.decoded == 5);
    assert_eq!(stats.decode_errors, 0);
    assert_eq!(stats.label_mismatches, 0);
    assert_eq!(reader.active_slot(), MarkerSlot::new(1));

    let z: Vec<f64> = reader.snapshot().iter().map(|m| m.z).collect();
    assert_eq!(z, vec![500.0, 200.0, 300.0, 400.0]);
    assert_eq!(
        reader.get(MarkerSlot::new(2).unwrap()),
        MarkerSample::new(2.0, -2.0, 200.0)
    );

    listener.stop().expect("listener stops");
}

#[test]
fn test_malformed_datagrams_are_dropped() {
    let listener = TelemetryListener::start(loopback_config()).expect("listener starts");
    let reader = listener.reader();

    send_all(listener.local_addr(), &[marker_message(1, 42.0)]);
    wait_for(&listener, |s| s.decoded == 1);

    let garbage = [
        "hello".to_string(),
        "Marker Hand2: X=1 Y=2".to_string(),
        "Marker Hand2: X=1 Y=two Z=3".to_string(),
    ];
    send_all(listener.local_addr(), &garbage);
    let stats = wait_for(&listener, |s| s.decode_errors == 3);

    // last good value persists and the slot index has not moved
    assert_eq!(stats.decoded, 1);
    assert_eq!(stats.received, 4);
    assert_eq!(reader.writes(), 1);
    assert_eq!(reader.snapshot()[0].z, 42.0);

    // ingestion carries on after the burst
    send_all(listener.local_addr(), &[marker_message(2, 7.0)]);
    wait_for(&listener, |s| s.decoded == 2);
    assert_eq!(reader.snapshot()[1].z, 7.0);

    listener.stop().expect("listener stops");
}

#[test]
fn test_long_datagram_is_not_truncated() {
    let listener = TelemetryListener::start(loopback_config()).expect("listener starts");
    let reader = listener.reader();

    // zero padding pushes the payload past 2048 bytes; cut at 2048 it would
    // still parse, as z = 3
    let message = format!("Marker Hand1: X={}1 Y=2 Z=35", "0".repeat(2023));
    assert!(message.len() > 2048);
    send_all(listener.local_addr(), &[message]);

    let stats = wait_for(&listener, |s| s.received == 1);
    assert_eq!(stats.decoded, 1);
    assert_eq!(stats.decode_errors, 0);
    assert_eq!(reader.snapshot()[0], MarkerSample::new(1.0, 2.0, 35.0));

    listener.stop().expect("listener stops");
}

#[test]
fn test_addressing_ignores_labels() {
    let listener = TelemetryListener::start(loopback_config()).expect("listener starts");
    let reader = listener.reader();

    // a dropped "Hand1" message shifts every following marker by one slot
    send_all(
        listener.local_addr(),
        &[marker_message(2, 2.0), marker_message(3, 3.0)],
    );
    let stats = wait_for(&listener, |s| s.decoded == 2);
    assert_eq!(stats.label_mismatches, 2);

    let snapshot = reader.snapshot();
    assert_eq!(snapshot[0].z, 2.0);
    assert_eq!(snapshot[1].z, 3.0);

    listener.stop().expect("listener stops");
}

#[test]
fn test_stop_unblocks_idle_listener() {
    let listener = TelemetryListener::start(loopback_config()).expect("listener starts");
    thread::sleep(Duration::from_millis(20));
    assert!(listener.is_running());

    let started = Instant::now();
    listener.stop().expect("listener stops");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_drop_stops_listener() {
    let listener = TelemetryListener::start(loopback_config()).expect("listener starts");
    let addr = listener.local_addr();
    drop(listener);

    // the port is free again once the thread has exited
    let rebound = UdpSocket::bind(addr);
    assert!(rebound.is_ok(), "port {} still held after drop", addr);
}

#[test]
fn test_bind_conflict_is_reported() {
    let first = TelemetryListener::start(loopback_config()).expect("listener starts");
    let taken = ListenerConfig {
        port: first.local_addr().port(),
        ..loopback_config()
    };
    match TelemetryListener::start(taken) {
        Err(ListenerError::Socket(_)) => {}
        Err(e) => panic!("unexpected error {:?}", e),
        Ok(_) => panic!("second bind on the same port should fail"),
    }
    first.stop().expect("listener stops");
}
