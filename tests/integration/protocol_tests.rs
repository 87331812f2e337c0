//! Serial protocol end to end: request bytes in, reply bytes out, through
//! the controller and the interrupt-driven transmit path.

use kombi::app::commands::Opcode;
use kombi::app::events::AppEvent;
use kombi::config::{ConfigRecord, IO_BUFFER_SIZE, RECORD_SIZE};
use kombi::protocol::FrameError;
use kombi::ring::ByteRing;
use kombi::serial::{Outbox, TxDrain};
use proptest::prelude::*;

use super::mock_hw::{CapturePort, exchange, exchange_in_bursts, load_frame, started};

fn sample_record() -> ConfigRecord {
    let mut rec = ConfigRecord::default();
    rec.apply_demo();
    rec.starter_on_rpm = 300;
    rec.starter_off_rpm = 600;
    rec.breakpoints[2].reserved = 0x33;
    rec
}

// ── Load then get returns the same bytes ──────────────────────

#[test]
fn loaded_record_is_read_back_verbatim() {
    let (mut ctl, shared, mut sink) = started();
    let rec = sample_record();

    let mut input = load_frame(&rec);
    input.extend_from_slice(b"ge");
    let out = exchange(&mut ctl, &shared, &input, &mut sink);

    let mut expected = b"s0e".to_vec();
    expected.push(b'd');
    expected.extend_from_slice(&rec.to_bytes());
    expected.push(b'e');
    assert_eq!(out, expected);
    assert_eq!(ctl.store().cache(), &rec);
    // Not promoted yet.
    assert_ne!(ctl.store().active(), &rec);
}

// ── Unknown opcode with echo ──────────────────────────────────

#[test]
fn unknown_byte_is_echoed_and_skipped() {
    let (mut ctl, shared, mut sink) = started();

    let out = exchange(&mut ctl, &shared, b"a1exte", &mut sink);
    assert_eq!(out, b"s0es1e\r\nx\r\ns0e");
    assert!(ctl.echo_unknown());

    let rejected: Vec<_> = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::FramingError(_)))
        .collect();
    assert_eq!(rejected, [&AppEvent::FramingError(FrameError::UnknownOpcode(b'x'))]);
    assert!(sink.contains(&AppEvent::CommandExecuted(Opcode::Promote)));
}

#[test]
fn unknown_byte_without_echo_gets_status_only() {
    let (mut ctl, shared, mut sink) = started();
    let out = exchange(&mut ctl, &shared, b"?", &mut sink);
    assert_eq!(out, b"s1e");
}

// ── Bad terminator ────────────────────────────────────────────

#[test]
fn bad_terminator_discards_whole_frame() {
    let (mut ctl, shared, mut sink) = started();

    let out = exchange(&mut ctl, &shared, b"sxte", &mut sink);
    assert_eq!(out, b"s2es0e");
    assert_eq!(ctl.store().storage().commits, 0, "save must not run");
    assert!(sink.contains(&AppEvent::FramingError(FrameError::MissingTerminator {
        opcode: Opcode::Save,
        found: b'x',
    })));
}

// ── Frames split across receive bursts ────────────────────────

#[test]
fn frame_split_across_bursts_is_assembled() {
    let (mut ctl, shared, mut sink) = started();
    let rec = sample_record();
    let frame = load_frame(&rec);

    let rx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let tx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let (mut rx_in, mut rx) = rx_ring.split().unwrap();
    let (tx_in, tx_out) = tx_ring.split().unwrap();
    let drain = TxDrain::new();
    drain.attach(tx_out);
    let mut outbox = Outbox::new(tx_in, &drain);
    let mut port = CapturePort::default();

    for chunk in frame.chunks(17) {
        assert!(port.bytes.is_empty(), "no reply before the last byte");
        rx_in.push_slice(chunk);
        ctl.run_once(&shared, &mut rx, &mut outbox, &mut port, &mut sink);
        port.flush(&drain);
    }

    assert_eq!(port.bytes, b"s0e");
    assert_eq!(rx.available(), 0);
    assert_eq!(ctl.store().cache(), &rec);
}

proptest! {
    /// `l<record>e` followed by `ge`, cut at any byte, answers exactly as
    /// the unbroken stream does.
    #[test]
    fn split_point_does_not_change_replies(
        raw in proptest::collection::vec(any::<u8>(), RECORD_SIZE),
        split in 0usize..=RECORD_SIZE + 4,
    ) {
        let bytes: [u8; RECORD_SIZE] = raw.try_into().unwrap();
        let mut input = load_frame(&ConfigRecord::from_bytes(&bytes));
        input.extend_from_slice(b"ge");

        let whole = {
            let (mut ctl, shared, mut sink) = started();
            exchange(&mut ctl, &shared, &input, &mut sink)
        };
        let (mut ctl, shared, mut sink) = started();
        let (head, tail) = input.split_at(split);
        let pieces = exchange_in_bursts(&mut ctl, &shared, &[head, tail], &mut sink);

        prop_assert_eq!(&pieces, &whole);
        prop_assert_eq!(&whole[..3], b"s0e");
        prop_assert_eq!(whole.len(), 3 + RECORD_SIZE + 2);
    }
}

#[test]
fn one_frame_per_pass() {
    let (mut ctl, shared, mut sink) = started();

    let rx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let tx_ring = ByteRing::<IO_BUFFER_SIZE>::new();
    let (mut rx_in, mut rx) = rx_ring.split().unwrap();
    let (tx_in, tx_out) = tx_ring.split().unwrap();
    let drain = TxDrain::new();
    drain.attach(tx_out);
    let mut outbox = Outbox::new(tx_in, &drain);
    let mut port = CapturePort::default();

    rx_in.push_slice(b"dete");
    ctl.run_once(&shared, &mut rx, &mut outbox, &mut port, &mut sink);
    port.flush(&drain);
    assert_eq!(port.bytes, b"s0e");
    assert_eq!(rx.available(), 2);

    ctl.run_once(&shared, &mut rx, &mut outbox, &mut port, &mut sink);
    port.flush(&drain);
    assert_eq!(port.bytes, b"s0es0e");
    assert_eq!(rx.available(), 0);
}

// ── Storage round trip ────────────────────────────────────────

#[test]
fn save_then_read_restores_cache() {
    let (mut ctl, shared, mut sink) = started();
    let rec = sample_record();

    let mut input = load_frame(&rec);
    input.extend_from_slice(b"se");
    exchange(&mut ctl, &shared, &input, &mut sink);
    assert_eq!(ctl.store().storage().commits, 1);

    // Overwrite the cache, then reload it from storage.
    let out = exchange(&mut ctl, &shared, &load_frame(&ConfigRecord::default()), &mut sink);
    assert_eq!(out, b"s0e");
    assert_eq!(ctl.store().cache(), &ConfigRecord::default());

    exchange(&mut ctl, &shared, b"re", &mut sink);
    assert_eq!(ctl.store().cache(), &rec);
    assert!(sink.contains(&AppEvent::StorageSaved));
}
