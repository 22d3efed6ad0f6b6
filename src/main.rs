#![no_std]
#![no_main]

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;
use embedded_hal::digital::StatefulOutputPin;
use esp_backtrace as _;
use esp_bootloader_esp_idf::esp_app_desc;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::xtensa_lx_rt::entry;
use esp_println::println;
use systimer::{
    platform::esp32::{self, CORE},
    CallbackArg, Mode, TimerObject,
};

esp_app_desc!(); // defaults are fine

const HEARTBEAT_SLOT: usize = 0;
const REPORT_SLOT: usize = 1;

static HEARTBEAT: TimerObject = TimerObject::new(500);
static STARTUP_REPORT: TimerObject = TimerObject::new(3_000);
static HEARTBEATS: AtomicU32 = AtomicU32::new(0);

/// Status LED, shared with the heartbeat callback.
static LED: Mutex<RefCell<Option<Output<'static>>>> = Mutex::new(RefCell::new(None));

/// Routes `log` records from the timer core to the UART console.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn toggle<P: StatefulOutputPin>(pin: &mut P) {
    let _ = pin.toggle();
}

fn on_heartbeat(arg: CallbackArg) {
    let beats = unsafe { arg.as_ref::<AtomicU32>() };
    beats.fetch_add(1, Ordering::Relaxed);
    critical_section::with(|cs| {
        if let Some(led) = LED.borrow_ref_mut(cs).as_mut() {
            toggle(led);
        }
    });
}

fn on_startup_report(_: CallbackArg) {
    println!(
        "One-shot fired after {} heartbeats",
        HEARTBEATS.load(Ordering::Relaxed)
    );
}

#[entry]
fn main() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }

    println!("Initializing timers...");

    let led = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    critical_section::with(|cs| {
        LED.borrow_ref_mut(cs).replace(led);
    });

    if let Err(err) = esp32::init(peripherals.TIMG0, peripherals.TIMG1) {
        println!("Timer initialization failed: {}", err);
        loop {
            core::hint::spin_loop();
        }
    }

    let period = CORE.arm(
        HEARTBEAT_SLOT,
        &HEARTBEAT,
        Mode::Repeating,
        on_heartbeat,
        CallbackArg::from_ref(&HEARTBEATS),
    );
    println!("Heartbeat every {} ms on slot {}", period, HEARTBEAT_SLOT);

    let delay = CORE.arm(
        REPORT_SLOT,
        &STARTUP_REPORT,
        Mode::OneShot,
        on_startup_report,
        CallbackArg::NONE,
    );
    println!("Startup report in {} ms on slot {}", delay, REPORT_SLOT);

    // Everything else happens in interrupt context.
    loop {
        for _ in 0..10_000_000 {
            core::hint::spin_loop();
        }
        println!(
            "heartbeats: {}, report pending: {}",
            HEARTBEATS.load(Ordering::Relaxed),
            STARTUP_REPORT.is_armed()
        );
    }
}
