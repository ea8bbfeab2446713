#![no_std]
#![no_main]

use core::cell::RefCell;
use core::ops::Sub;

use rp_pico::entry;
use defmt::*;
use defmt_rtt as _;
use panic_probe as _;

use fugit::RateExtU32;

use rp_pico as bsp;
use embedded_hal::{
  digital::v2::{InputPin, OutputPin},
  PwmPin,
};

use bsp::hal as p_hal;

use rv3028c7_rtc::{RV3028, DateTimeAccess, Duration, NaiveDateTime, Timelike};

use p_hal::{
  Clock,
  clocks::init_clocks_and_plls,
  pac::{self, interrupt},
  sio::Sio,
  watchdog::Watchdog,
  gpio::{FunctionI2C, Pin, PullUp},
  pwm::{FreeRunning, Pwm3, Slice},
  Timer,
};
use cortex_m::interrupt::Mutex;

use pico_chime::{strikes_for_hour, AnalogOut, Chime, ChimeConfig, Failsafe, ToneGenerator, SINE};

const EXTERNAL_XTAL_FREQ_HZ: u32 = 12_000_000u32;

/// Local time is this many hours behind the RTC's UTC
const TZ_OFFSET_HOURS: i64 = 8;

const POLL_MS: u32 = 10;
/// How often to read the wall clock over I2C
const RTC_READ_MS: u64 = 200;

//===== PWM audio ===

/// 8-bit output: one PWM period per sample
const AUDIO_PWM_TOP: u16 = 255;
const AUDIO_PWM_DIV_INT: u8 = 11;
const AUDIO_PWM_DIV_FRAC: u8 = 2;
/// Actual rate of the PWM wrap interrupt at 125 MHz system clock
const AUDIO_SAMPLE_RATE_HZ: u32 = (125_000_000u64 * 16
  / ((AUDIO_PWM_TOP as u64 + 1) * (AUDIO_PWM_DIV_INT as u64 * 16 + AUDIO_PWM_DIV_FRAC as u64)))
  as u32;

static TONE: ToneGenerator = ToneGenerator::new(&SINE, AUDIO_SAMPLE_RATE_HZ, Failsafe::Armed);

static AUDIO_PWM: Mutex<RefCell<Option<Slice<Pwm3, FreeRunning>>>> = Mutex::new(RefCell::new(None));

/// GP22 duty cycle as an 8-bit DAC
struct PwmDac;

impl AnalogOut for PwmDac {
  fn write(&self, level: u8) {
    cortex_m::interrupt::free(|cs| {
      if let Some(pwm) = AUDIO_PWM.borrow(cs).borrow_mut().as_mut() {
        pwm.channel_a.set_duty(level as u16);
      }
    });
  }
}

static DAC: PwmDac = PwmDac;

#[entry]
fn main() -> ! {

  info!("Program start");
  let mut pac = pac::Peripherals::take().unwrap();
  let core = pac::CorePeripherals::take().unwrap();
  let mut watchdog = Watchdog::new(pac.WATCHDOG);
  let sio = Sio::new(pac.SIO);

  // External high-speed crystal on the pico board is 12Mhz
  let clocks = init_clocks_and_plls(
    EXTERNAL_XTAL_FREQ_HZ,
    pac.XOSC,
    pac.CLOCKS,
    pac.PLL_SYS,
    pac.PLL_USB,
    &mut pac.RESETS,
    &mut watchdog,
  )
    .ok()
    .unwrap();

  let mut delay = cortex_m::delay::Delay::new(core.SYST, clocks.system_clock.freq().to_Hz());
  let timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

  let pins = bsp::Pins::new(
    pac.IO_BANK0,
    pac.PADS_BANK0,
    sio.gpio_bank0,
    &mut pac.RESETS,
  );

  // Configure two pins as being I²C, not GPIO
  let sda_pin: Pin<_, FunctionI2C, PullUp> = pins.gpio2.reconfigure();
  let scl_pin: Pin<_, FunctionI2C, PullUp> = pins.gpio3.reconfigure();
  let i2c = p_hal::I2C::i2c1(
    pac.I2C1,
    sda_pin,
    scl_pin,
    400.kHz(),
    &mut pac.RESETS,
    &clocks.system_clock,
  );
  let mut rtc = RV3028::new(i2c);

  let mut led_pin = pins.led.into_push_pull_output();
  led_pin.set_high().unwrap();

  // active low, chimes the current hour on demand
  let debug_button = pins.gpio15.into_pull_up_input();

  println!("setup PWM audio: {} Hz", AUDIO_SAMPLE_RATE_HZ);
  let pwm_slices = p_hal::pwm::Slices::new(pac.PWM, &mut pac.RESETS);
  let mut pwm = pwm_slices.pwm3;
  pwm.set_top(AUDIO_PWM_TOP);
  pwm.set_div_int(AUDIO_PWM_DIV_INT);
  pwm.set_div_frac(AUDIO_PWM_DIV_FRAC);
  pwm.channel_a.output_to(pins.gpio22);
  pwm.channel_a.set_duty(pico_chime::NEUTRAL_LEVEL as u16);
  pwm.enable_interrupt();
  pwm.enable();
  cortex_m::interrupt::free(|cs| AUDIO_PWM.borrow(cs).replace(Some(pwm)));

  let mut chime = Chime::begin(&TONE, &DAC, ChimeConfig::default());

  unsafe {
    pac::NVIC::unmask(pac::Interrupt::PWM_IRQ_WRAP);
  }
  led_pin.set_low().unwrap();

  println!("enter loop...");
  let mut local_dt = NaiveDateTime::default();
  let mut last_rtc_read_ms = 0u64;
  let mut button_was_down = false;
  loop {
    let now_ms = timer.get_counter().ticks() / 1000;
    chime.update(now_ms);

    if now_ms.wrapping_sub(last_rtc_read_ms) >= RTC_READ_MS {
      last_rtc_read_ms = now_ms;
      match rtc.datetime() {
        Ok(rtc_dt) => {
          local_dt = rtc_dt.sub(Duration::hours(TZ_OFFSET_HOURS));
          if chime.maybe_chime(&local_dt, now_ms) {
            println!("chime {:02}:{:02}", local_dt.hour(), local_dt.minute());
          }
        }
        Err(_) => println!("ext rtc fail"),
      }
    }

    let button_down = debug_button.is_low().unwrap_or(false);
    if button_down && !button_was_down {
      let strikes = strikes_for_hour(local_dt.hour() as u8);
      println!("debug chime: {}", strikes);
      chime.play_debug_chime(strikes, now_ms);
    }
    button_was_down = button_down;

    if chime.is_playing() {
      let _ = led_pin.set_high();
    }
    else {
      let _ = led_pin.set_low();
    }

    delay.delay_ms(POLL_MS);
  }
}

//=== Interrupt manipulation ===

/// Sample clock: one tick of the tone generator per PWM period
#[allow(non_snake_case)]
#[interrupt]
fn PWM_IRQ_WRAP() {
  cortex_m::interrupt::free(|cs| {
    if let Some(pwm) = AUDIO_PWM.borrow(cs).borrow_mut().as_mut() {
      pwm.clear_interrupt();
    }
  });
  TONE.tick_into(&DAC);
}
