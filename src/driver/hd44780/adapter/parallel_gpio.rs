use core::{convert::Infallible, fmt::Display};

use embedded_hal::{
    delay::DelayNs,
    digital::{self, OutputPin, PinState},
    pwm::{self, SetDutyCycle},
};

use crate::driver::{DataWidth, DeviceHardwareTrait};

use super::{COMMAND_SETTLE_US, ENABLE_PULSE_US};

/// Stand-in for an optional line that is not wired, such as R/W tied to ground or a
/// backlight hard-wired on. Every operation succeeds and does nothing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoPin;

impl digital::ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

impl pwm::ErrorType for NoPin {
    type Error = Infallible;
}

impl SetDutyCycle for NoPin {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), Infallible> {
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
/// Errors raised by the pins of a directly wired display
pub enum ParallelBusError {
    /// A control or data line could not be driven
    Pin(digital::ErrorKind),
    /// The backlight PWM channel rejected the duty cycle
    Backlight(pwm::ErrorKind),
}

impl From<&ParallelBusError> for &'static str {
    fn from(err: &ParallelBusError) -> Self {
        match err {
            ParallelBusError::Pin(_) => "GPIO pin error",
            ParallelBusError::Backlight(_) => "Backlight PWM error",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ParallelBusError {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for ParallelBusError {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for ParallelBusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

fn pin_error<E: digital::Error>(err: E) -> ParallelBusError {
    ParallelBusError::Pin(err.kind())
}

fn backlight_error<E: pwm::Error>(err: E) -> ParallelBusError {
    ParallelBusError::Backlight(err.kind())
}

/// Data lines of the bus. On a 4-bit bus the pins are D4-D7, on an 8-bit bus D0-D7, lowest
/// bit first.
pub enum DataPins<D> {
    FourBit([D; 4]),
    EightBit([D; 8]),
}

/// The pins owned by a `ParallelGpioAdapter`, handed back by `release`.
pub struct ParallelGpioPins<RS, EN, D, RW, BL> {
    pub rs: RS,
    pub enable: EN,
    pub data: DataPins<D>,
    pub read_write: RW,
    pub backlight: BL,
}

/// Adapter driving the HD44780 bus directly from GPIO pins. R/W is optional and held low.
/// The backlight is optional and dimmed through a PWM channel.
pub struct ParallelGpioAdapter<RS, EN, D, RW, BL, DELAY>
where
    RS: OutputPin,
    EN: OutputPin,
    D: OutputPin,
    RW: OutputPin,
    BL: SetDutyCycle,
    DELAY: DelayNs,
{
    pins: ParallelGpioPins<RS, EN, D, RW, BL>,
    delay: DELAY,
}

impl<RS, EN, D, DELAY> ParallelGpioAdapter<RS, EN, D, NoPin, NoPin, DELAY>
where
    RS: OutputPin,
    EN: OutputPin,
    D: OutputPin,
    DELAY: DelayNs,
{
    /// Bus using data lines D4-D7.
    pub fn new_4bit(rs: RS, enable: EN, data: [D; 4], delay: DELAY) -> Self {
        Self::with_data_pins(rs, enable, DataPins::FourBit(data), delay)
    }

    /// Bus using data lines D0-D7.
    pub fn new_8bit(rs: RS, enable: EN, data: [D; 8], delay: DELAY) -> Self {
        Self::with_data_pins(rs, enable, DataPins::EightBit(data), delay)
    }

    fn with_data_pins(rs: RS, enable: EN, data: DataPins<D>, delay: DELAY) -> Self {
        Self {
            pins: ParallelGpioPins {
                rs,
                enable,
                data,
                read_write: NoPin,
                backlight: NoPin,
            },
            delay,
        }
    }
}

impl<RS, EN, D, RW, BL, DELAY> ParallelGpioAdapter<RS, EN, D, RW, BL, DELAY>
where
    RS: OutputPin,
    EN: OutputPin,
    D: OutputPin,
    RW: OutputPin,
    BL: SetDutyCycle,
    DELAY: DelayNs,
{
    /// Attach the R/W line. It is driven low for every write.
    pub fn with_read_write_pin<RW2: OutputPin>(
        self,
        read_write: RW2,
    ) -> ParallelGpioAdapter<RS, EN, D, RW2, BL, DELAY> {
        let ParallelGpioPins {
            rs,
            enable,
            data,
            backlight,
            ..
        } = self.pins;
        ParallelGpioAdapter {
            pins: ParallelGpioPins {
                rs,
                enable,
                data,
                read_write,
                backlight,
            },
            delay: self.delay,
        }
    }

    /// Attach a PWM channel driving the backlight.
    pub fn with_backlight<BL2: SetDutyCycle>(
        self,
        backlight: BL2,
    ) -> ParallelGpioAdapter<RS, EN, D, RW, BL2, DELAY> {
        let ParallelGpioPins {
            rs,
            enable,
            data,
            read_write,
            ..
        } = self.pins;
        ParallelGpioAdapter {
            pins: ParallelGpioPins {
                rs,
                enable,
                data,
                read_write,
                backlight,
            },
            delay: self.delay,
        }
    }

    fn set_mode(&mut self, rs_setting: bool) -> Result<(), ParallelBusError> {
        self.pins
            .rs
            .set_state(PinState::from(rs_setting))
            .map_err(pin_error)?;
        self.pins.read_write.set_low().map_err(pin_error)
    }

    /// Puts the lowest `count` bits of `value` on the data lines and latches them.
    fn write_bits(&mut self, value: u8, count: usize) -> Result<(), ParallelBusError> {
        let pins = match &mut self.pins.data {
            DataPins::FourBit(pins) => &mut pins[..],
            DataPins::EightBit(pins) => &mut pins[..],
        };
        for (bit, pin) in pins.iter_mut().take(count).enumerate() {
            pin.set_state(PinState::from((value >> bit) & 0x01 != 0))
                .map_err(pin_error)?;
        }
        self.pulse_enable()
    }

    fn pulse_enable(&mut self) -> Result<(), ParallelBusError> {
        self.pins.enable.set_low().map_err(pin_error)?;
        self.delay.delay_us(ENABLE_PULSE_US);
        self.pins.enable.set_high().map_err(pin_error)?;
        self.delay.delay_us(ENABLE_PULSE_US);
        self.pins.enable.set_low().map_err(pin_error)?;
        self.delay.delay_us(COMMAND_SETTLE_US);
        Ok(())
    }

    fn set_brightness(&mut self, intensity: u8) -> Result<(), ParallelBusError> {
        let max = u32::from(self.pins.backlight.max_duty_cycle());
        let width = max * u32::from(intensity.min(100)) / 100;
        self.pins
            .backlight
            .set_duty_cycle(width as u16)
            .map_err(backlight_error)
    }
}

impl<RS, EN, D, RW, BL, DELAY> DeviceHardwareTrait for ParallelGpioAdapter<RS, EN, D, RW, BL, DELAY>
where
    RS: OutputPin,
    EN: OutputPin,
    D: OutputPin,
    RW: OutputPin,
    BL: SetDutyCycle,
    DELAY: DelayNs,
{
    type Error = ParallelBusError;
    type Resources = (ParallelGpioPins<RS, EN, D, RW, BL>, DELAY);

    fn data_width(&self) -> DataWidth {
        match self.pins.data {
            DataPins::FourBit(_) => DataWidth::FourBit,
            DataPins::EightBit(_) => DataWidth::EightBit,
        }
    }

    /// Pin directions are fixed by the HAL types, so only the backlight needs setting up.
    /// It starts at full brightness.
    fn initialize(&mut self) -> Result<(), ParallelBusError> {
        self.set_brightness(100)
    }

    fn begin(&mut self) -> Result<(), ParallelBusError> {
        self.pins.rs.set_low().map_err(pin_error)?;
        self.pins.enable.set_low().map_err(pin_error)?;
        self.pins.read_write.set_low().map_err(pin_error)
    }

    fn write_nibble(&mut self, rs_setting: bool, value: u8) -> Result<(), ParallelBusError> {
        self.set_mode(rs_setting)?;
        self.write_bits(value, 4)
    }

    fn write_byte(&mut self, rs_setting: bool, value: u8) -> Result<(), ParallelBusError> {
        self.set_mode(rs_setting)?;
        match self.data_width() {
            DataWidth::FourBit => {
                self.write_bits(value >> 4, 4)?;
                self.write_bits(value, 4)
            }
            DataWidth::EightBit => self.write_bits(value, 8),
        }
    }

    fn enable_backlight(&mut self, intensity: u8) -> Result<(), ParallelBusError> {
        self.set_brightness(intensity)
    }

    fn disable_backlight(&mut self) -> Result<(), ParallelBusError> {
        self.set_brightness(0)
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Clears the backlight channel, then hands back the pins. The clear is best effort: a
    /// PWM error here is dropped so the pins are always returned.
    fn release(mut self) -> (ParallelGpioPins<RS, EN, D, RW, BL>, DELAY) {
        let _ = self.set_brightness(0);
        (self.pins, self.delay)
    }
}


#[cfg(test)]
mod tests {
    extern crate std;
    use super::bus_probe::*;
    use super::*;
    use crate::{
        driver::hd44780::{ControllerState, HD44780},
        CharacterDisplayError, DisplayConfig,
    };
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        digital::{Mock as PinMock, State as MockState, Transaction as PinTransaction},
    };
    use std::vec;
    use std::vec::Vec;

    struct RecordingDelay(Vec<u32>);

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.push(ns.div_ceil(1_000));
        }

        fn delay_us(&mut self, us: u32) {
            self.0.push(us);
        }
    }

    struct FailingPin;

    impl digital::ErrorType for FailingPin {
        type Error = digital::ErrorKind;
    }

    impl OutputPin for FailingPin {
        fn set_low(&mut self) -> Result<(), digital::ErrorKind> {
            Err(digital::ErrorKind::Other)
        }

        fn set_high(&mut self) -> Result<(), digital::ErrorKind> {
            Err(digital::ErrorKind::Other)
        }
    }

    #[test]
    fn test_parallel_begin_drives_control_lines_low() {
        let rs = PinMock::new(&[PinTransaction::set(MockState::Low)]);
        let enable = PinMock::new(&[PinTransaction::set(MockState::Low)]);
        let read_write = PinMock::new(&[PinTransaction::set(MockState::Low)]);
        let data: [PinMock; 4] = core::array::from_fn(|_| PinMock::new(&[]));

        let mut adapter = ParallelGpioAdapter::new_4bit(rs, enable, data, NoopDelay::new())
            .with_read_write_pin(read_write);
        assert!(adapter.begin().is_ok());

        let (mut pins, _delay) = adapter.release();
        pins.rs.done();
        pins.enable.done();
        pins.read_write.done();
        if let DataPins::FourBit(data) = &mut pins.data {
            data.iter_mut().for_each(|pin| pin.done());
        }
    }

    #[test]
    fn test_parallel_write_nibble_levels() {
        // nibble 0b0011 with RS = 0
        let rs = PinMock::new(&[PinTransaction::set(MockState::Low)]);
        let enable = PinMock::new(&[
            PinTransaction::set(MockState::Low),
            PinTransaction::set(MockState::High),
            PinTransaction::set(MockState::Low),
        ]);
        let levels = [MockState::High, MockState::High, MockState::Low, MockState::Low];
        let data: [PinMock; 4] =
            core::array::from_fn(|i| PinMock::new(&[PinTransaction::set(levels[i])]));

        let mut adapter = ParallelGpioAdapter::new_4bit(rs, enable, data, NoopDelay::new());
        assert!(adapter.write_nibble(false, 0x03).is_ok());

        let (mut pins, _delay) = adapter.release();
        pins.rs.done();
        pins.enable.done();
        if let DataPins::FourBit(data) = &mut pins.data {
            data.iter_mut().for_each(|pin| pin.done());
        }
    }

    #[test]
    fn test_parallel_write_byte_4bit_high_nibble_first() {
        let timeline = timeline();
        let (rs, enable, data) = pins_4bit(&timeline);
        let mut adapter = ParallelGpioAdapter::new_4bit(rs, enable, data, NoopDelay::new())
            .with_read_write_pin(ProbePin::new(Line::ReadWrite, &timeline));
        assert_eq!(adapter.data_width(), DataWidth::FourBit);

        assert!(adapter.write_byte(true, 0xDE).is_ok());
        assert!(adapter.write_byte(false, 0xAD).is_ok());
        assert_eq!(
            strobes(&timeline, 4),
            vec![(true, 0xD), (true, 0xE), (false, 0xA), (false, 0xD)]
        );
    }

    #[test]
    fn test_parallel_write_byte_8bit_single_strobe() {
        let timeline = timeline();
        let (rs, enable, data) = pins_8bit(&timeline);
        let mut adapter = ParallelGpioAdapter::new_8bit(rs, enable, data, NoopDelay::new());
        assert_eq!(adapter.data_width(), DataWidth::EightBit);

        assert!(adapter.write_byte(true, 0xA5).is_ok());
        assert!(adapter.write_byte(false, 0x38).is_ok());
        assert_eq!(strobes(&timeline, 8), vec![(true, 0xA5), (false, 0x38)]);
    }

    #[test]
    fn test_parallel_enable_pulse_timing() {
        let timeline = timeline();
        let (rs, enable, data) = pins_4bit(&timeline);
        let mut adapter =
            ParallelGpioAdapter::new_4bit(rs, enable, data, RecordingDelay(Vec::new()));
        assert!(adapter.write_nibble(false, 0x02).is_ok());
        adapter.delay_us(4_500);

        let (_pins, delay) = adapter.release();
        assert_eq!(delay.0, vec![1, 1, 100, 4_500]);
    }

    #[test]
    fn test_parallel_backlight_duty_cycle() {
        let timeline = timeline();
        let (rs, enable, data) = pins_4bit(&timeline);
        let mut adapter = ParallelGpioAdapter::new_4bit(rs, enable, data, NoopDelay::new())
            .with_backlight(ProbePwm { duties: Vec::new() });

        assert!(adapter.initialize().is_ok());
        assert!(adapter.enable_backlight(50).is_ok());
        assert!(adapter.enable_backlight(250).is_ok());
        assert!(adapter.enable_backlight(0).is_ok());
        assert!(adapter.disable_backlight().is_ok());

        let (pins, _delay) = adapter.release();
        assert_eq!(pins.backlight.duties, vec![1999, 999, 1999, 0, 0, 0]);
        // initialize touches no bus lines
        assert!(timeline.borrow().is_empty());
    }

    #[test]
    fn test_parallel_release_clears_backlight() {
        let timeline = timeline();
        let (rs, enable, data) = pins_4bit(&timeline);
        let mut adapter = ParallelGpioAdapter::new_4bit(rs, enable, data, NoopDelay::new())
            .with_backlight(ProbePwm { duties: Vec::new() });

        assert!(adapter.initialize().is_ok());
        assert!(adapter.enable_backlight(50).is_ok());

        let (pins, _delay) = adapter.release();
        assert_eq!(pins.backlight.duties, vec![1999, 999, 0]);
        // release sends nothing to the controller
        assert!(timeline.borrow().is_empty());
    }

    #[test]
    fn test_parallel_release_returns_pins_on_backlight_error() {
        let timeline = timeline();
        let (rs, enable, data) = pins_4bit(&timeline);
        let adapter = ParallelGpioAdapter::new_4bit(rs, enable, data, NoopDelay::new())
            .with_backlight(FailingPwm);
        let (pins, _delay) = adapter.release();
        assert_eq!(pins.backlight, FailingPwm);
    }

    #[test]
    fn test_parallel_without_backlight_is_noop() {
        let timeline = timeline();
        let (rs, enable, data) = pins_4bit(&timeline);
        let mut adapter = ParallelGpioAdapter::new_4bit(rs, enable, data, NoopDelay::new());
        assert!(adapter.initialize().is_ok());
        assert!(adapter.enable_backlight(70).is_ok());
        assert!(adapter.disable_backlight().is_ok());
        assert!(timeline.borrow().is_empty());
    }

    #[derive(Debug, PartialEq)]
    struct FailingPwm;

    impl pwm::ErrorType for FailingPwm {
        type Error = pwm::ErrorKind;
    }

    impl SetDutyCycle for FailingPwm {
        fn max_duty_cycle(&self) -> u16 {
            100
        }

        fn set_duty_cycle(&mut self, _duty: u16) -> Result<(), pwm::ErrorKind> {
            Err(pwm::ErrorKind::Other)
        }
    }

    #[test]
    fn test_parallel_backlight_error_fails_init() {
        let timeline = timeline();
        let (rs, enable, data) = pins_4bit(&timeline);
        let adapter = ParallelGpioAdapter::new_4bit(rs, enable, data, NoopDelay::new())
            .with_backlight(FailingPwm);
        let mut lcd = HD44780::new(adapter, DisplayConfig::new(16, 2));

        assert_eq!(
            lcd.init(),
            Err(CharacterDisplayError::ResourceUnavailable(
                ParallelBusError::Backlight(pwm::ErrorKind::Other)
            ))
        );
        assert_eq!(lcd.state(), ControllerState::Uninitialized);
        // the handshake never started
        assert!(timeline.borrow().is_empty());
    }

    #[test]
    fn test_parallel_pin_error_kind() {
        let timeline = timeline();
        let (_rs, enable, data) = pins_4bit(&timeline);
        let mut adapter = ParallelGpioAdapter::new_4bit(FailingPin, enable, data, NoopDelay::new());
        assert_eq!(
            adapter.write_byte(false, 0x01),
            Err(ParallelBusError::Pin(digital::ErrorKind::Other))
        );
        // nothing reached the bus
        assert!(timeline.borrow().is_empty());
    }

    #[test]
    fn test_parallel_bus_error_messages() {
        let err = ParallelBusError::Pin(digital::ErrorKind::Other);
        assert_eq!(std::format!("{}", err), "GPIO pin error");
        let err = ParallelBusError::Backlight(pwm::ErrorKind::Other);
        assert_eq!(std::format!("{}", err), "Backlight PWM error");
    }

    #[cfg(feature = "ufmt")]
    #[test]
    fn test_parallel_bus_error_udisplay() {
        struct Buffer(std::string::String);

        impl ufmt::uWrite for Buffer {
            type Error = Infallible;

            fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
                self.0.push_str(s);
                Ok(())
            }
        }

        let mut buffer = Buffer(std::string::String::new());
        assert!(ufmt::uwrite!(buffer, "{}", ParallelBusError::Backlight(pwm::ErrorKind::Other)).is_ok());
        assert_eq!(buffer.0, "Backlight PWM error");
    }
}
