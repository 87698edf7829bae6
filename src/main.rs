//! RFM12 Node Main Application
//!
//! Entry point for the STM32G474-based RFM12 link firmware.
//! Initializes hardware and spawns async tasks.

#![no_std]
#![no_main]

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Timer;
use heapless::Vec;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use rfm12_link::hal::gpio::{ChipReset, IrqLine, StatusLed};
use rfm12_link::hal::spi::SpiShiftPort;
use rfm12_link::hal::timer::LinkClock;
use rfm12_link::prelude::*;

/// A frame queued for transmission
type Frame = Vec<u8, TX_FRAME_CAPACITY>;

type Port = SpiShiftPort<Spi<'static, Blocking>, Output<'static>>;

/// Received bytes, oldest first
static RX_BYTES: Channel<CriticalSectionRawMutex, u8, RX_QUEUE_DEPTH> = Channel::new();

/// Frames waiting for the channel
static TX_FRAMES: Channel<CriticalSectionRawMutex, Frame, 4> = Channel::new();

static RADIO: StaticCell<Transceiver<Port>> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("RFM12 Node Firmware v{}", env!("CARGO_PKG_VERSION"));

    // Initialize STM32G474 peripherals with default clock configuration
    let p = embassy_stm32::init(embassy_stm32::Config::default());

    info!("Peripherals initialized");

    let led = StatusLed::new(Output::new(p.PA5, Level::Low, Speed::Low));

    // SPI1: PB3 = SCK, PB5 = MOSI (SDI), PB4 = MISO (SDO)
    let mut spi_config = spi::Config::default();
    spi_config.frequency = Hertz(SPI_FREQUENCY_HZ);
    let spi = Spi::new_blocking(p.SPI1, p.PB3, p.PB5, p.PB4, spi_config);
    let nsel = Output::new(p.PA4, Level::High, Speed::High);
    let nirq = IrqLine::new(Input::new(p.PA1, Pull::Up));
    let nres = ChipReset::new(Output::new(p.PA0, Level::Low, Speed::Low));

    info!("SPI1 initialized at {} Hz", SPI_FREQUENCY_HZ);

    let config = RadioConfig::default();
    let radio = match Transceiver::new(config, SpiShiftPort::new(spi, nsel)) {
        Ok(radio) => RADIO.init(radio),
        Err(e) => {
            defmt::error!("invalid radio configuration: {}", e);
            return;
        }
    };

    spawner.must_spawn(link_task(radio, nirq, nres));
    spawner.must_spawn(heartbeat_task(led));
    spawner.must_spawn(beacon_task());

    info!("Tasks spawned, entering main loop");

    loop {
        let byte = RX_BYTES.receive().await;
        info!("rx 0x{=u8:02X}", byte);
    }
}

/// Caller-side transmit handshake
///
/// Writes one byte per `channel_free` and ends the frame once the
/// channel is free after the last byte.
#[derive(Default)]
struct FrameWriter {
    frame: Option<Frame>,
    next: usize,
}

impl FrameWriter {
    /// Update `inputs` for this tick from the last outputs
    fn drive(&mut self, inputs: &mut LinkInputs, last: &LinkOutputs) {
        inputs.write_enable = false;

        if self.frame.is_none() {
            if !last.channel_free {
                return;
            }
            self.frame = TX_FRAMES.try_receive().ok();
            self.next = 0;
        }
        let Some(frame) = &self.frame else {
            return;
        };

        inputs.frame_active = true;
        if !last.channel_free {
            return;
        }
        if let Some(&byte) = frame.get(self.next) {
            inputs.data_out = byte;
            inputs.write_enable = true;
            self.next += 1;
        } else {
            inputs.frame_active = false;
            self.frame = None;
        }
    }
}

/// Link task - steps the transceiver at the link tick rate
///
/// The Embassy ticker runs at `bus_clock_hz`, so it replaces the
/// system clock divider and each tick is one `step`.
#[embassy_executor::task]
async fn link_task(radio: &'static mut Transceiver<Port>, nirq: IrqLine<'static>, mut nres: ChipReset<'static>) {
    let mut clock = LinkClock::from_rate(radio.config().bus_clock_hz);
    let mut inputs = LinkInputs::idle(MAX_FRAME_LEN);
    let mut writer = FrameWriter::default();
    let mut last = LinkOutputs::default();
    let mut was_powered = false;

    info!("link running at {}", clock);

    loop {
        clock.tick().await;

        writer.drive(&mut inputs, &last);
        let out = radio.step(&inputs, nirq.is_asserted());
        nres.drive(out.chip_reset);
        last = out.link;

        if let Some(byte) = out.link.received() {
            if RX_BYTES.try_send(byte).is_err() {
                warn!("rx queue full, dropping 0x{=u8:02X}", byte);
            }
        }

        let powered = radio.controller().is_powered_up();
        if powered != was_powered {
            info!("link {}", if powered { "up" } else { "down" });
            was_powered = powered;
        }
    }
}

/// Beacon task - queues a short frame periodically
#[embassy_executor::task]
async fn beacon_task() {
    let mut seq: u8 = 0;
    loop {
        Timer::after(Duration::from_secs(5)).await;
        match Frame::from_slice(&[0x2D, 0xD4, seq]) {
            Ok(frame) => TX_FRAMES.send(frame).await,
            Err(()) => warn!("beacon longer than {} bytes, skipped", TX_FRAME_CAPACITY),
        }
        seq = seq.wrapping_add(1);
    }
}

/// Heartbeat task - blinks LED to show system is running
#[embassy_executor::task]
async fn heartbeat_task(mut led: StatusLed<'static>) {
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(100)).await;
        led.toggle();
        Timer::after(Duration::from_millis(900)).await;
    }
}
