//! Tests for the link supervisor
//!
//! These tests run a link with the echo heartbeat enabled against the
//! emulator and verify:
//! - The first echo brings the link up
//! - Silence makes it stale, answers restore it
//! - Caller requests and heartbeats share the slot without collisions
//! - Controller disconnects close the link

use std::thread;
use std::time::Duration;

use crossbeam::channel::Receiver;
use fobos_link::emulator::{ControllerEmulator, EmulatorServer};
use fobos_link::protocol::CommandCode;
use fobos_link::{Link, LinkConfig, LinkEvent, Liveness};

// =============================================================================
// Helper Functions
// =============================================================================

fn start_emulator() -> EmulatorServer {
    EmulatorServer::bind("127.0.0.1:0", ControllerEmulator::new()).unwrap()
}

fn supervised_config() -> LinkConfig {
    LinkConfig::builder()
        .echo_interval(Duration::from_millis(20))
        .response_timeout(Duration::from_millis(50))
        .acquire_timeout(Duration::from_secs(1))
        .build()
}

/// Wait for the next event that is not a stray frame
fn next_event(events: &Receiver<LinkEvent>) -> LinkEvent {
    loop {
        match events.recv_timeout(Duration::from_secs(2)).unwrap() {
            LinkEvent::UnexpectedFrame(_) => continue,
            event => return event,
        }
    }
}

// =============================================================================
// Liveness Tests
// =============================================================================

#[test]
fn test_first_echo_brings_link_up() {
    let server = start_emulator();
    let link = Link::connect(server.local_addr(), supervised_config()).unwrap();
    let events = link.events();

    assert_eq!(next_event(&events), LinkEvent::Up);
    assert_eq!(link.liveness(), Liveness::Alive);
    assert!(link.last_exchange().is_some());
}

#[test]
fn test_heartbeat_keeps_echoing() {
    let server = start_emulator();
    let link = Link::connect(server.local_addr(), supervised_config()).unwrap();
    let events = link.events();
    assert_eq!(next_event(&events), LinkEvent::Up);

    let before = server.with_emulator(|emu| emu.request_count());
    thread::sleep(Duration::from_millis(200));
    let after = server.with_emulator(|emu| emu.request_count());

    assert!(after > before + 2, "expected several echoes, got {}", after - before);
}

#[test]
fn test_silence_goes_stale_then_restores() {
    let server = start_emulator();
    let link = Link::connect(server.local_addr(), supervised_config()).unwrap();
    let events = link.events();
    assert_eq!(next_event(&events), LinkEvent::Up);

    server.with_emulator(|emu| emu.mute());
    assert_eq!(next_event(&events), LinkEvent::Lost { missed: 1 });
    assert_eq!(link.liveness(), Liveness::Stale);

    server.with_emulator(|emu| emu.unmute());
    assert_eq!(next_event(&events), LinkEvent::Restored);
    assert_eq!(link.liveness(), Liveness::Alive);
}

#[test]
fn test_miss_threshold() {
    let server = start_emulator();
    let config = LinkConfig::builder()
        .echo_interval(Duration::from_millis(20))
        .response_timeout(Duration::from_millis(30))
        .stale_after_misses(3)
        .build();
    let link = Link::connect(server.local_addr(), config).unwrap();
    let events = link.events();
    assert_eq!(next_event(&events), LinkEvent::Up);

    server.with_emulator(|emu| emu.mute());
    assert_eq!(next_event(&events), LinkEvent::Lost { missed: 3 });
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_requests_interleave_with_heartbeat() {
    let server = start_emulator();
    let link = Link::connect(server.local_addr(), supervised_config()).unwrap();
    let events = link.events();
    assert_eq!(next_event(&events), LinkEvent::Up);

    thread::scope(|s| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    for _ in 0..25 {
                        let data = link.request(CommandCode::DeviceReady, &[]).unwrap();
                        assert_eq!(data.as_ref(), &[1]);
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
    });

    assert_eq!(link.liveness(), Liveness::Alive);
    // Matching by command code means no frame should have gone astray
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, LinkEvent::UnexpectedFrame(_) | LinkEvent::Lost { .. }),
            "unexpected event {:?}",
            event
        );
    }
}

// =============================================================================
// Teardown Tests
// =============================================================================

#[test]
fn test_controller_disconnect_closes_link() {
    let server = start_emulator();
    let link = Link::connect(server.local_addr(), supervised_config()).unwrap();
    let events = link.events();
    assert_eq!(next_event(&events), LinkEvent::Up);

    server.drop_connections();

    loop {
        match next_event(&events) {
            LinkEvent::Closed => break,
            LinkEvent::Lost { .. } | LinkEvent::Restored => continue,
            other => panic!("Unexpected event {:?}", other),
        }
    }
    assert!(link.is_closed());
    assert_eq!(link.liveness(), Liveness::Disconnected);
}

#[test]
fn test_close_stops_heartbeat() {
    let server = start_emulator();
    let mut link = Link::connect(server.local_addr(), supervised_config()).unwrap();
    let events = link.events();
    assert_eq!(next_event(&events), LinkEvent::Up);

    link.close();
    // Let the emulator drain whatever was already on the wire
    thread::sleep(Duration::from_millis(50));
    let before = server.with_emulator(|emu| emu.request_count());
    thread::sleep(Duration::from_millis(100));
    let after = server.with_emulator(|emu| emu.request_count());

    assert_eq!(before, after);
}
