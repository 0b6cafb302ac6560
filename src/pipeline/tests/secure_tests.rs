//! Sealed output and datagram delivery.

use super::super::*;
use super::Harness;
use crate::codec::testing::ScriptedSource;
use crate::framing::{FrameHeader, FramerCounters, FramerError, NonceMode};
use std::net::UdpSocket;
use std::time::Duration;

const KEY: [u8; 32] = [7; 32];

#[test]
fn test_sealed_packets_reach_socket_and_host() {
    let harness = Harness::new();
    let (player, mut recorder) = harness.player("song.opus", ScriptedSource::opus(3, 0xFC));

    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let port = receiver.local_addr().unwrap().port();

    assert_eq!(player.secret_box(), None);
    player.set_secret_box(&KEY, NonceMode::Counter, 0x1234).unwrap();
    player.connect("127.0.0.1", port).unwrap();

    player.start().unwrap();
    assert!(harness.run_while(&mut recorder, |r| r.finished()));

    let packets = recorder.packets();
    assert_eq!(packets.len(), 3);
    let mut buffer = [0u8; 2048];
    for (index, packet) in packets.iter().enumerate() {
        assert!(packet.sealed);
        // Header, tag, 4-byte payload and 4-byte counter trailer.
        assert_eq!(packet.size(), 12 + 16 + 4 + 4);

        let header = FrameHeader::parse(&packet.data).unwrap();
        assert_eq!(header.sequence, index as u16 + 1);
        assert_eq!(header.timestamp, 960 * (index as u32 + 1));
        assert_eq!(header.ssrc, 0x1234);

        let received = receiver.recv(&mut buffer).unwrap();
        assert_eq!(&buffer[..received], packet.data.as_slice());
    }

    assert_eq!(
        player.secret_box(),
        Some(FramerCounters {
            sequence: 3,
            timestamp: 2880,
            nonce: 3,
        })
    );
    assert_eq!(player.failed_transmits(), 0);
}

#[test]
fn test_updated_counters_wrap() {
    let harness = Harness::new();
    let (player, mut recorder) = harness.player("song.opus", ScriptedSource::opus(1, 0xFC));

    player.set_secret_box(&KEY, NonceMode::Implicit, 1).unwrap();
    player.update_secret_box(FramerCounters {
        sequence: u16::MAX,
        timestamp: u32::MAX - 100,
        nonce: 0,
    });

    player.start().unwrap();
    assert!(harness.run_while(&mut recorder, |r| r.finished()));

    let header = FrameHeader::parse(&recorder.packets()[0].data).unwrap();
    assert_eq!(header.sequence, 0);
    assert_eq!(header.timestamp, 859);
}

#[test]
fn test_oversized_frames_are_skipped() {
    let config = PlayerConfig {
        framer_capacity: 40,
        ..PlayerConfig::default()
    };
    let harness = Harness::with_config(config);
    let source = ScriptedSource::opus(4, 0xFC).with_payload(vec![0xFC; 64]);
    let (player, mut recorder) = harness.player("big.opus", source);

    player.set_secret_box(&KEY, NonceMode::Counter, 9).unwrap();
    player.start().unwrap();
    assert!(harness.run_while(&mut recorder, |r| r.finished()));

    assert!(recorder.packets().is_empty());
    assert!(recorder.errors().is_empty());
    assert_eq!(player.skipped_frames(), 4);
    assert_eq!(player.total_packets(), 4);
    assert_eq!(player.secret_box(), Some(FramerCounters::default()));
}

#[test]
fn test_reconfiguring_resets_counters() {
    let harness = Harness::new();
    let (player, mut recorder) = harness.player("song.opus", ScriptedSource::opus(2, 0xFC));

    player.set_secret_box(&KEY, NonceMode::RandomSuffix, 5).unwrap();
    player.start().unwrap();
    assert!(harness.run_while(&mut recorder, |r| r.finished()));
    assert_eq!(player.secret_box().map(|c| c.sequence), Some(2));

    player.set_secret_box(&KEY, NonceMode::Counter, 6).unwrap();
    assert_eq!(player.secret_box(), Some(FramerCounters::default()));
}

#[test]
fn test_secure_setup_errors() {
    let harness = Harness::new();
    let (player, _recorder) = harness.player("song.opus", ScriptedSource::opus(1, 0xFC));

    assert!(matches!(
        player.set_secret_box(&[], NonceMode::Counter, 1),
        Err(FramerError::NoKey)
    ));
    assert_eq!(player.secret_box(), None);
    assert!(matches!(
        player.connect("not an address", 5000),
        Err(FramerError::InvalidAddress(_))
    ));
}
