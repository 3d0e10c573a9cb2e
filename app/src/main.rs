#![no_main]
#![no_std]

#[macro_use]
extern crate log;

use core::sync::atomic::{AtomicU32, Ordering};
use cortex_m;
use cortex_m_rt::{entry, exception};
use embedded_hal::digital::v2::OutputPin;
use panic_halt as _;

use stm32f0xx_hal as hal;

use touch::mpr121::{Mpr121, DEFAULT_ADDRESS};
use touch::report::StatusReporter;
use touch::TouchEngine;

use crate::hal::i2c::I2c;
use crate::hal::pac;
use crate::hal::pac::interrupt;
use crate::hal::prelude::*;

mod logger;
mod serial;

/// Electrodes 0..3 are wired to the panel
const ACTIVE_CHANNELS: u16 = 0x000f;
static LABELS: [&str; 4] = ["Play", "Stop", "Prev", "Next"];

/// Debounce counts are in updates, so this sets how long confirmation takes
const UPDATE_PERIOD_MS: u32 = 10;
const REPORT_INTERVAL_MS: u32 = 500;
/// Time for the sensor's autoconfiguration to settle before seeding
const SETTLE_MS: u32 = 100;

static TIME: AtomicU32 = AtomicU32::new(0);

fn drive<P: OutputPin>(pin: &mut P, on: bool) {
    if on {
        pin.set_high().ok();
    } else {
        pin.set_low().ok();
    }
}

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut flash = dp.FLASH;
    let mut rcc = dp.RCC.configure().sysclk(48.mhz()).freeze(&mut flash);
    let gpioa = dp.GPIOA.split(&mut rcc);
    let gpiob = dp.GPIOB.split(&mut rcc);

    // A library requiring a critical section to set a gpio AF register is bad and I just won't.
    let fake_cs = unsafe { cortex_m::interrupt::CriticalSection::new() };

    let tx_pin = gpiob.pb6.into_alternate_af0(&fake_cs);
    let rx_pin = gpiob.pb7.into_alternate_af0(&fake_cs);
    let uart = hal::serial::Serial::usart1(dp.USART1, (tx_pin, rx_pin), 115200.bps(), &mut rcc);
    serial::uart1::init(uart, 4);
    logger::init();
    info!("mpr121-panel starting");

    let mut led0 = gpioa.pa0.into_push_pull_output(&fake_cs);
    let mut led1 = gpioa.pa1.into_push_pull_output(&fake_cs);
    let mut led2 = gpioa.pa2.into_push_pull_output(&fake_cs);
    let mut led3 = gpioa.pa3.into_push_pull_output(&fake_cs);

    let scl = gpiob
        .pb8
        .into_alternate_af1(&fake_cs)
        .internal_pull_up(&fake_cs, true)
        .set_open_drain(&fake_cs);
    let sda = gpiob
        .pb9
        .into_alternate_af1(&fake_cs)
        .internal_pull_up(&fake_cs, true)
        .set_open_drain(&fake_cs);
    let i2c = I2c::i2c1(dp.I2C1, (scl, sda), 100.khz(), &mut rcc);

    let mut syst = hal::timers::Timer::syst(cp.SYST, 1000.hz(), &mut rcc);
    syst.listen(&hal::timers::Event::TimeOut);

    let sensor = match Mpr121::new(i2c, DEFAULT_ADDRESS) {
        Ok(sensor) => sensor,
        Err(err) => {
            error!("mpr121 {:#04x} init failed: {:?}", DEFAULT_ADDRESS, err);
            panic!("no touch controller");
        }
    };

    let settle_from = TIME.load(Ordering::Relaxed);
    while TIME.load(Ordering::Relaxed).wrapping_sub(settle_from) < SETTLE_MS {}

    let mut engine = TouchEngine::new(sensor, DEFAULT_ADDRESS, ACTIVE_CHANNELS);
    let mut reporter = StatusReporter::new(REPORT_INTERVAL_MS, TIME.load(Ordering::Relaxed)).with_labels(&LABELS);
    let mut dropped = 0;

    let mut next_time = TIME.load(Ordering::Relaxed).wrapping_add(UPDATE_PERIOD_MS);

    loop {
        let time = TIME.load(Ordering::Relaxed);
        // Signed difference keeps working across the counter wrap
        if time.wrapping_sub(next_time) as i32 >= 0 {
            next_time = next_time.wrapping_add(UPDATE_PERIOD_MS);

            let changed = engine.update();
            if changed != 0 {
                for (n, (i, c)) in engine.active_channels().enumerate() {
                    if changed & (1 << i) != 0 {
                        info!("{}: {}", LABELS.get(n).unwrap_or(&"?"), if c.touched() { "Touch" } else { "Release" });
                    }
                }
            }

            drive(&mut led0, engine.is_touched(0));
            drive(&mut led1, engine.is_touched(1));
            drive(&mut led2, engine.is_touched(2));
            drive(&mut led3, engine.is_touched(3));

            reporter.report(time, &engine, &mut serial::uart1::writer()).ok();

            let lost = serial::uart1::dropped();
            if lost != dropped {
                warn!("console dropped {} bytes", lost.wrapping_sub(dropped));
                dropped = lost;
            }
        }
    }
}

#[exception]
fn SysTick() {
    let time = TIME.load(Ordering::Relaxed);
    TIME.store(time.wrapping_add(1), Ordering::Relaxed);
}
