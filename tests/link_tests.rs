//! Tests for the link controller
//!
//! Scenario tests against the chip model, one tick per millisecond.
//! Run with: cargo test --no-default-features --features std --test link_tests

use rfm12_link::link::bus::BusState;
use rfm12_link::link::controller::LinkState;
use rfm12_link::link::table::InstructionSet;
use rfm12_link::sim::{test_config, Harness, SimChip};
use rfm12_link::types::PowerMode;

/// Settle (200) + status read + settle + 12 init commands, with margin
const POWER_UP_LIMIT: u64 = 1_000;

/// Check that `needle` appears in `haystack` in order, not necessarily adjacent
fn in_order(haystack: &[u16], needle: &[u16]) -> bool {
    let mut rest = haystack.iter();
    needle.iter().all(|word| rest.any(|w| w == word))
}

fn init_words() -> Vec<u16> {
    let set = InstructionSet::from_config(&test_config()).unwrap();
    set.init().iter().map(|i| i.word()).collect()
}

fn powered_harness() -> Harness {
    let mut h = Harness::new();
    assert!(h.power_up(POWER_UP_LIMIT).is_some(), "chip never powered up");
    h
}

/// Let the last instruction finish; the chip acts on it at deselect
fn finish_instruction(h: &mut Harness) {
    let n = h.run_until(20, |h| h.radio.engine().state() == BusState::Idle);
    assert!(n.is_some(), "bus engine never went idle");
}

/// Offer the first byte of a frame and wait for the transmitter to come up
fn start_frame(h: &mut Harness, byte: u8) {
    h.inputs.frame_active = true;
    h.inputs.data_out = byte;
    h.inputs.write_enable = true;
    h.tick();
    h.inputs.write_enable = false;
    assert!(h
        .run_until(50, |h| h.radio.controller().state() == LinkState::TransmitWait)
        .is_some());
}

// =============================================================================
// Start-up
// =============================================================================

#[test]
fn startup_holds_reset_then_initializes() {
    let mut h = Harness::new();
    let first = h.tick();
    assert!(first.chip_reset);
    assert_eq!(h.radio.controller().state(), LinkState::Start);

    let n = h.power_up(POWER_UP_LIMIT);
    assert!(n.is_some());
    assert!(!h.last().chip_reset);
    assert!(h.radio.controller().is_powered_up());
    assert_eq!(h.radio.controller().state(), LinkState::Idle);

    let commands = h.chip().commands();
    assert!(in_order(commands, &init_words()));
    assert!(in_order(commands, &[0x82D9, 0xCA81, 0xCA83]));
    assert!(h.chip().is_receiving());
    assert!(h.chip().is_fill_enabled());
}

#[test]
fn init_is_not_sent_before_power_on_reset_seen() {
    let mut h = Harness::new();
    // Through the settle delay the chip sees no commands at all
    h.run(150);
    assert!(h.chip().commands().is_empty());
}

#[test]
fn channel_free_within_one_poll_period() {
    let mut h = powered_harness();
    let poll = u64::from(h.radio.controller().timing().poll_period);
    for _ in 0..3 {
        let n = h.run_until(poll, |h| h.last().link.channel_free);
        assert!(n.is_some());
        h.tick();
    }
}

// =============================================================================
// Watchdog and recovery
// =============================================================================

#[test]
fn dead_chip_forces_reset_within_watchdog() {
    let mut h = Harness::with(test_config(), SimChip::dead());
    let timing = *h.radio.controller().timing();
    let bound = u64::from(timing.settle + timing.powerup_watchdog) + 50;

    let n = h.run_until(bound, |h| h.radio.controller().state() == LinkState::Reset);
    assert!(n.is_some());
    assert!(h.last().chip_reset);
    assert!(!h.radio.controller().is_powered_up());
}

#[test]
fn dead_chip_retries_forever() {
    let mut h = Harness::with(test_config(), SimChip::dead());
    let timing = *h.radio.controller().timing();
    let cycle = u64::from(timing.settle + timing.powerup_watchdog + timing.reset_hold) + 10;

    let mut resets = 0;
    let mut in_reset = false;
    for _ in 0..(3 * cycle) {
        let out = h.tick();
        if out.chip_reset && !in_reset && h.ticks() > 1 {
            resets += 1;
        }
        in_reset = out.chip_reset;
    }
    assert!(resets >= 2, "only {resets} watchdog resets");
    assert!(!h.radio.controller().is_powered_up());
}

#[test]
fn chip_connected_during_reset_recovers() {
    let mut h = Harness::with(test_config(), SimChip::dead());
    let limit = 5_000;
    assert!(h
        .run_until(limit, |h| h.radio.controller().state() == LinkState::Reset)
        .is_some());
    h.chip_mut().set_alive(true);

    let n = h.power_up(limit);
    assert!(n.is_some());
    assert!(in_order(h.chip().commands(), &init_words()));
}

#[test]
fn power_on_reset_while_running_reinitializes() {
    let mut h = powered_harness();
    h.chip_mut().clear_commands();
    h.chip_mut().trigger_power_on_reset();

    let dropped = h.run_until(50, |h| !h.radio.controller().is_powered_up());
    assert!(dropped.is_some());

    assert!(h.power_up(POWER_UP_LIMIT).is_some());
    assert!(in_order(h.chip().commands(), &init_words()));
    assert!(h.chip().is_fill_enabled());
}

// =============================================================================
// Receive
// =============================================================================

#[test]
fn receives_frame_then_rearms_fifo() {
    let mut h = powered_harness();
    h.inputs.frame_length = 3;
    h.chip_mut().clear_commands();
    h.chip_mut().receive(&[0x11, 0x22, 0x33]);

    assert!(h.run_until(500, |h| h.received().len() == 3).is_some());
    assert_eq!(h.received(), &[0x11, 0x22, 0x33]);
    assert_eq!(h.radio.controller().rx_count(), 3);

    // Frame complete: the next status fetch drops it and re-arms sync
    let rearmed = h.run_until(500, |h| {
        h.radio.controller().rx_count() == 0 && h.radio.controller().state() == LinkState::Idle
    });
    assert!(rearmed.is_some());
    finish_instruction(&mut h);
    assert_eq!(h.chip().count_command(0xB000), 3);
    assert!(in_order(h.chip().commands(), &[0xB000, 0xB000, 0xB000, 0xCA81, 0xCA83]));
}

#[test]
fn frame_length_stops_reading() {
    let mut h = powered_harness();
    h.set_power_mode(PowerMode::ReceiveOnly);
    h.inputs.frame_length = 2;
    h.chip_mut().receive(&[0x01, 0x02, 0x03]);

    h.run(400);
    assert_eq!(h.received(), &[0x01, 0x02]);
    assert_eq!(h.radio.controller().rx_count(), 0);
}

#[test]
fn frame_length_capped_by_counter_bound() {
    let mut h = powered_harness();
    h.set_power_mode(PowerMode::ReceiveOnly);
    h.inputs.frame_length = u8::MAX;
    let frame: Vec<u8> = (0..25).collect();
    h.chip_mut().receive(&frame);

    h.run(1_500);
    let max = usize::from(test_config().max_frame_len);
    assert_eq!(&h.received()[..max], &frame[..max]);
}

#[test]
fn stalled_frame_abandoned_by_receiver_watchdog() {
    let mut h = powered_harness();
    h.set_power_mode(PowerMode::ReceiveOnly);
    h.inputs.frame_length = 10;
    h.chip_mut().receive(&[0xA1, 0xA2]);

    assert!(h.run_until(200, |h| h.received().len() == 2).is_some());
    assert_eq!(h.radio.controller().rx_count(), 2);
    h.chip_mut().clear_commands();

    let watchdog = u64::from(h.radio.controller().timing().rx_watchdog);
    let n = h.run_until(watchdog + 50, |h| h.radio.controller().rx_count() == 0);
    assert!(n.is_some());
    finish_instruction(&mut h);
    assert!(in_order(h.chip().commands(), &[0xCA81, 0xCA83]));
}

// =============================================================================
// Transmit
// =============================================================================

#[test]
fn transmits_single_byte() {
    let mut h = powered_harness();
    h.chip_mut().clear_commands();

    assert!(h.send(&[0x42], 500));
    assert_eq!(h.chip().transmitted(), &[0x42]);
    assert!(in_order(h.chip().commands(), &[0x8209, 0x8239, 0x0000, 0xB842]));

    // Back to receive once the frame ends
    let n = h.run_until(200, |h| {
        h.radio.controller().state() == LinkState::Idle && h.chip().is_fill_enabled()
    });
    assert!(n.is_some());
    assert!(h.chip().is_receiving());
    assert!(in_order(h.chip().commands(), &[0xB842, 0x82D9, 0xCA81, 0xCA83]));
}

#[test]
fn transmits_frame_in_order() {
    let mut h = powered_harness();
    let frame = [0xAA, 0x2D, 0xD4, 0x03, 0x10, 0x20, 0x30];
    assert!(h.send(&frame, 500));
    assert_eq!(h.chip().transmitted(), &frame);
}

#[test]
fn channel_not_free_until_first_byte_written() {
    let mut h = powered_harness();
    assert!(h.last().link.channel_free);

    h.inputs.frame_active = true;
    h.inputs.data_out = 0x42;
    h.inputs.write_enable = true;
    h.tick();
    h.inputs.write_enable = false;

    let mut ticks = 0;
    while h.radio.controller().state() != LinkState::Transmit {
        assert!(!h.last().link.channel_free);
        h.tick();
        ticks += 1;
        assert!(ticks < 500);
    }
    assert!(h.chip().count_command(0xB842) <= 1);
    h.inputs.frame_active = false;
}

#[test]
fn busy_channel_blocks_transmit() {
    let mut h = powered_harness();
    h.chip_mut().set_channel_busy(true);
    let poll = u64::from(h.radio.controller().timing().poll_period);

    // The next poll picks up the busy flag
    assert!(h.run_until(poll + 50, |h| h.radio.controller().status().is_channel_busy()).is_some());
    h.inputs.frame_active = true;
    h.inputs.data_out = 0x55;
    h.inputs.write_enable = true;
    for _ in 0..poll {
        let out = h.tick();
        assert!(!out.link.channel_free);
    }
    assert_eq!(h.chip().count_command(0x8209), 1);
    h.inputs.frame_active = false;
    h.inputs.write_enable = false;

    h.chip_mut().set_channel_busy(false);
    assert!(h.run_until(poll + 50, |h| h.last().link.channel_free).is_some());
}

#[test]
fn status_echo_reports_unready_status() {
    for echo in [false, true] {
        let config = rfm12_link::config::RadioConfig {
            status_echo: echo,
            ..test_config()
        };
        let mut h = Harness::with(config, SimChip::new());
        assert!(h.power_up(POWER_UP_LIMIT).is_some());
        start_frame(&mut h, 0x42);

        // An interrupt that is neither a reset nor a free transmit register
        h.chip_mut().trigger_external_interrupt();
        h.run(30);
        if echo {
            // External and FIFO-empty bits of the status high byte
            assert_eq!(h.received(), &[0x0A]);
        } else {
            assert!(h.received().is_empty());
        }
        assert!(h.chip().transmitted().is_empty());

        // Still waiting: the byte goes out once the register frees up
        let n = h.run_until(100, |h| h.chip().transmitted() == [0x42]);
        assert!(n.is_some());
        h.inputs.frame_active = false;
    }
}

#[test]
fn power_on_reset_while_waiting_to_transmit_reinitializes() {
    let mut h = powered_harness();
    start_frame(&mut h, 0x42);
    h.chip_mut().clear_commands();

    // Chip browns out before taking the first byte; the caller gives up
    h.chip_mut().trigger_power_on_reset();
    h.inputs.frame_active = false;
    let n = h.run_until(100, |h| !h.radio.controller().is_powered_up());
    assert!(n.is_some());

    assert!(h.power_up(POWER_UP_LIMIT).is_some());
    assert_eq!(h.radio.controller().state(), LinkState::Idle);
    assert!(in_order(h.chip().commands(), &init_words()));
    assert!(h.chip().is_receiving());
    assert!(h.chip().is_fill_enabled());
    assert!(h.chip().transmitted().is_empty());
}

#[test]
fn power_on_reset_while_waiting_reinitializes_with_frame_held() {
    let mut h = powered_harness();
    start_frame(&mut h, 0x42);

    h.chip_mut().trigger_power_on_reset();
    let n = h.run_until(100, |h| !h.radio.controller().is_powered_up());
    assert!(n.is_some());
    assert_ne!(h.radio.controller().state(), LinkState::TransmitWait);

    h.inputs.frame_active = false;
    assert!(h.power_up(POWER_UP_LIMIT).is_some());
    assert!(h.chip().is_receiving());
}

#[test]
fn withdrawn_frame_returns_to_receive() {
    let mut h = powered_harness();
    start_frame(&mut h, 0x42);
    assert!(h.chip().is_transmitting());

    h.inputs.frame_active = false;
    let n = h.run_until(100, |h| {
        h.radio.controller().state() == LinkState::Idle && h.chip().is_fill_enabled()
    });
    assert!(n.is_some());
    assert!(h.chip().is_receiving());
    assert!(!h.chip().is_transmitting());
    assert!(h.chip().transmitted().is_empty());
    assert!(h.run_until(50, |h| h.last().link.channel_free).is_some());
}

#[test]
fn silent_transmitter_forces_chip_reset() {
    let mut h = powered_harness();
    start_frame(&mut h, 0x42);
    h.chip_mut().set_alive(false);

    let watchdog = u64::from(h.radio.controller().timing().powerup_watchdog);
    let n = h.run_until(watchdog + 50, |h| h.last().chip_reset);
    assert!(n.is_some());
    assert_eq!(h.radio.controller().state(), LinkState::Reset);
    assert!(!h.radio.controller().is_powered_up());

    h.chip_mut().set_alive(true);
    h.inputs.frame_active = false;
    let hold = u64::from(h.radio.controller().timing().reset_hold);
    assert!(h.power_up(hold + POWER_UP_LIMIT).is_some());
    assert!(h.chip().is_receiving());
}

// =============================================================================
// Power modes
// =============================================================================

#[test]
fn receive_only_does_not_poll() {
    let mut h = powered_harness();
    let poll = u64::from(h.radio.controller().timing().poll_period);

    h.set_power_mode(PowerMode::ReceiveOnly);
    h.tick();
    h.chip_mut().clear_commands();
    h.run(5 * poll);
    assert_eq!(h.chip().count_command(0x0000), 0);

    h.set_power_mode(PowerMode::Active);
    h.run(5 * poll);
    let polls = h.chip().count_command(0x0000);
    assert!((4..=6).contains(&polls), "{polls} polls");
}

#[test]
fn shutdown_sleeps_and_wakes() {
    let mut h = powered_harness();
    h.set_power_mode(PowerMode::Shutdown);
    assert!(h
        .run_until(50, |h| h.radio.controller().state() == LinkState::Sleep)
        .is_some());
    finish_instruction(&mut h);
    assert_eq!(h.chip().count_command(0x8201), 1);

    h.run(10);
    assert!(!h.chip().is_receiving());
    for _ in 0..200 {
        assert!(!h.tick().link.channel_free);
    }

    // Reserved does not wake the chip
    h.set_power_mode(PowerMode::Reserved);
    h.run(200);
    assert_eq!(h.radio.controller().state(), LinkState::Sleep);

    h.set_power_mode(PowerMode::ReceiveOnly);
    let n = h.run_until(100, |h| {
        h.radio.controller().state() == LinkState::Idle && h.chip().is_fill_enabled()
    });
    assert!(n.is_some());
    assert!(h.chip().is_receiving());
    assert_eq!(h.chip().count_command(0x8201), 1);
}

#[test]
fn shutdown_before_power_up_waits_for_init() {
    let mut h = Harness::new();
    h.set_power_mode(PowerMode::Shutdown);
    let n = h.run_until(POWER_UP_LIMIT, |h| h.radio.controller().state() == LinkState::Sleep);
    assert!(n.is_some());
    assert!(in_order(h.chip().commands(), &init_words()));
}

// =============================================================================
// Invariants
// =============================================================================

/// Run `ticks` ticks, checking every `channel_free` against controller state
fn check_channel_free(h: &mut Harness, ticks: u64) {
    for _ in 0..ticks {
        let irq = h.chip().irq_line();
        let out = h.tick();
        if out.link.channel_free {
            let ctl = h.radio.controller();
            assert!(matches!(ctl.state(), LinkState::Idle | LinkState::Transmit));
            assert!(ctl.is_powered_up());
            assert!(!ctl.has_new_status());
            if ctl.state() == LinkState::Idle {
                let pending = irq && ctl.interrupts_enabled();
                assert!(!pending, "channel free with an interrupt pending");
            }
        }
    }
}

#[test]
fn channel_free_only_when_idle_or_transmitting() {
    let mut h = Harness::new();
    check_channel_free(&mut h, POWER_UP_LIMIT);
    h.chip_mut().receive(&[1, 2, 3, 4]);
    check_channel_free(&mut h, 400);
    assert!(h.send(&[9, 8, 7], 500));
    check_channel_free(&mut h, 200);

    h.set_power_mode(PowerMode::ReceiveOnly);
    h.chip_mut().receive(&[5, 6]);
    check_channel_free(&mut h, 300);
    h.chip_mut().trigger_external_interrupt();
    check_channel_free(&mut h, 100);
}

#[test]
fn data_valid_is_a_single_tick_pulse() {
    let mut h = powered_harness();
    h.inputs.frame_length = 4;
    h.chip_mut().receive(&[5, 6, 7, 8]);
    let mut previous = false;
    for _ in 0..600 {
        let valid = h.tick().link.data_valid;
        assert!(!(valid && previous));
        previous = valid;
    }
    assert_eq!(h.received(), &[5, 6, 7, 8]);
}
