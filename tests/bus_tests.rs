//! Tests for the bus transaction engine
//!
//! Drives the engine against a loopback shift port.
//! Run with: cargo test --no-default-features --features std --test bus_tests

use rfm12_link::link::bus::{BusEngine, BusRequest, BusState, BusStatus};
use rfm12_link::shift::{Loopback, ShiftPort};
use rfm12_link::types::Instruction;

/// Step until ready, then issue `instr` and step until valid
fn transact(engine: &mut BusEngine, port: &mut Loopback, instr: Instruction) -> (BusStatus, u32) {
    for _ in 0..10 {
        if engine.status().ready {
            break;
        }
        engine.step(BusRequest::NONE, port);
    }
    assert!(engine.status().ready, "engine never became ready");

    engine.step(BusRequest::issue(instr), port);
    for ticks in 1..200 {
        let status = engine.step(BusRequest::NONE, port);
        if status.valid {
            return (status, ticks);
        }
    }
    panic!("transaction for {instr:?} never completed");
}

// =============================================================================
// Start-up
// =============================================================================

#[test]
fn ready_after_start() {
    let mut engine = BusEngine::new();
    let mut port = Loopback::new(0);
    assert_eq!(engine.state(), BusState::Start);
    assert!(!engine.status().ready);

    let status = engine.step(BusRequest::NONE, &mut port);
    assert!(status.ready);
    assert_eq!(engine.state(), BusState::Idle);
}

#[test]
fn idle_without_request_stays_idle() {
    let mut engine = BusEngine::new();
    let mut port = Loopback::new(0);
    for _ in 0..20 {
        engine.step(BusRequest::NONE, &mut port);
    }
    assert_eq!(engine.state(), BusState::Idle);
    assert_eq!(port.shifts(), 0);
    assert!(!port.is_selected());
}

// =============================================================================
// Transactions
// =============================================================================

#[test]
fn command_round_trip_two_shifts() {
    let mut engine = BusEngine::new();
    let mut port = Loopback::new(0);
    let (status, _) = transact(&mut engine, &mut port, Instruction::new(0x1234));
    assert_eq!(status.data, 0x1234);
    assert_eq!(port.shifts(), 2);
}

#[test]
fn round_trip_with_slow_port() {
    let mut engine = BusEngine::new();
    let mut fast = Loopback::new(0);
    let mut slow = Loopback::new(5);
    let (a, fast_ticks) = transact(&mut engine, &mut fast, Instruction::new(0xC623));
    let mut engine = BusEngine::new();
    let (b, slow_ticks) = transact(&mut engine, &mut slow, Instruction::new(0xC623));
    assert_eq!(a.data, b.data);
    assert_eq!(slow_ticks, fast_ticks + 10);
}

#[test]
fn fifo_read_takes_three_shifts() {
    let mut engine = BusEngine::new();
    let mut port = Loopback::new(1);
    let (status, _) = transact(&mut engine, &mut port, Instruction::new(0xB0AA));
    // Loopback: the second byte out (0xAA) is the high half,
    // the padding byte (0x00) the low half.
    assert_eq!(status.data, 0xAA00);
    assert_eq!(port.shifts(), 3);
}

#[test]
fn back_to_back_transactions() {
    let mut engine = BusEngine::new();
    let mut port = Loopback::new(0);
    for word in [0x0000, 0xB800, 0xCA83, 0xB000, 0x82D9] {
        port.clear_shifts();
        let (status, _) = transact(&mut engine, &mut port, Instruction::new(word));
        let instr = Instruction::new(word);
        if instr.is_fifo_read() {
            assert_eq!(port.shifts(), 3);
            assert_eq!(status.data, u16::from(instr.low()) << 8);
        } else {
            assert_eq!(port.shifts(), 2);
            assert_eq!(status.data, word);
        }
    }
}

// =============================================================================
// Handshake invariants
// =============================================================================

#[test]
fn ready_only_when_idle_and_valid_for_one_tick() {
    let mut engine = BusEngine::new();
    let mut port = Loopback::new(2);
    engine.step(BusRequest::NONE, &mut port);
    engine.step(BusRequest::issue(Instruction::new(0xCED4)), &mut port);

    let mut valid_ticks = 0;
    for _ in 0..100 {
        let status = engine.step(BusRequest::NONE, &mut port);
        assert_eq!(status.ready, engine.state() == BusState::Idle);
        if status.valid {
            valid_ticks += 1;
            assert_eq!(engine.state(), BusState::Idle);
        }
    }
    assert_eq!(valid_ticks, 1);
}

#[test]
fn chip_selected_for_whole_transaction() {
    let mut engine = BusEngine::new();
    let mut port = Loopback::new(1);
    engine.step(BusRequest::NONE, &mut port);
    engine.step(BusRequest::issue(Instruction::READ_FIFO), &mut port);
    assert!(!port.is_selected());

    let mut seen_selected = false;
    loop {
        let status = engine.step(BusRequest::NONE, &mut port);
        if status.valid {
            break;
        }
        if engine.state() != BusState::Write0 {
            seen_selected |= port.is_selected();
            assert!(port.is_selected() || !seen_selected);
        }
    }
    assert!(seen_selected);
    assert!(!port.is_selected());
    assert!(!engine.is_selected());
}

#[test]
fn request_while_busy_is_ignored() {
    let mut engine = BusEngine::new();
    let mut port = Loopback::new(0);
    engine.step(BusRequest::NONE, &mut port);
    engine.step(BusRequest::issue(Instruction::new(0x1111)), &mut port);

    let mut result = None;
    for _ in 0..50 {
        let status = engine.step(BusRequest::issue(Instruction::new(0x2222)), &mut port);
        if status.valid {
            result = Some(status.data);
            break;
        }
    }
    assert_eq!(result, Some(0x1111));
    assert_eq!(port.shifts(), 2);
}

#[test]
fn start_waits_for_port() {
    let mut engine = BusEngine::new();
    let mut port = Loopback::new(3);
    port.start(0xFF);
    let status = engine.step(BusRequest::NONE, &mut port);
    assert!(!status.ready);
    assert_eq!(engine.state(), BusState::Start);
    while port.poll().is_none() {}
    assert!(engine.step(BusRequest::NONE, &mut port).ready);
}
