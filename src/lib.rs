//! This Rust `embedded-hal`-based library is a simple way to control a [HD44780](https://en.wikipedia.org/wiki/Hitachi_HD44780_LCD_controller)
//! compatible character display in an embedded, `no_std` environment. Two ways of wiring the display are supported:
//!
//! - **Direct GPIO** - The RS and enable lines plus either 4 (D4-D7) or 8 (D0-D7) data lines are driven straight from
//!   microcontroller pins. The R/W line is optional and is held low when present; if it is not wired it should be tied
//!   to ground. The backlight is optional and can be dimmed through any PWM channel implementing `SetDutyCycle`.
//! - **PCF8574-based I2C adapter** - These adapters are ubiquitous on eBay and AliExpress and have no clear branding.
//!   The supported pin wiring uses 4 data pins on P4-P7 and the control lines on P0-P3, with the backlight on P3.
//!   The expander cannot dim the backlight, so it is always on.
//!
//! Key features include:
//! - Convenient high-level API for controlling the display
//! - Fixed-width, justified row output with `write_text`
//! - Support for custom characters
//! - `core::fmt::Write` implementation for easy use with the `write!` macro
//! - Compatible with the `embedded-hal` traits v1.0 and later
//! - Optional support for the `defmt` and `ufmt` logging frameworks
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! hd44780-character-display = { version = "0.1", features = ["defmt"] }
//! ```
//! The `features = ["defmt"]` line is optional and enables the `defmt` feature, which allows the library's errors to be used with the `defmt` logging
//! framework and emits debug records during initialization. Another optional feature is `features = ["ufmt"]`, which enables the `ufmt` feature,
//! allowing the `uwriteln!` and `uwrite!` macros to be used.
//!
//! Then create the display object for your wiring:
//! ```rust
//! use hd44780_character_display::{CharacterDisplayPCF8574T, CharacterDisplayParallel, LcdDisplayType};
//!
//! // board setup
//! let i2c = ...; // I2C peripheral
//! let delay = ...; // DelayNs implementation
//!
//! // PCF8574T adapter at the default address 0x27
//! let mut lcd = CharacterDisplayPCF8574T::new(i2c, LcdDisplayType::Lcd16x2.into(), delay);
//! // directly wired 4-bit bus
//! let mut lcd = CharacterDisplayParallel::new_4bit(rs, enable, [d4, d5, d6, d7], LcdDisplayType::Lcd20x4.into(), delay);
//! ```
//! An R/W pin or a PWM backlight are attached by building a `ParallelGpioAdapter` with `with_read_write_pin` and
//! `with_backlight`, then handing it to `BaseCharacterDisplay::from_device`.
//!
//! Initialize the display:
//! ```rust
//! if let Err(e) = lcd.init() {
//!    panic!("Error initializing LCD: {}", e);
//! }
//! ```
//! Use the display:
//! ```rust
//! lcd.clear()?.set_cursor(0, 0)?.write_text("Hello", Justify::Center)?;
//! // can also use the `core::fmt::write!` macro
//! use core::fmt::Write;
//!
//! write!(lcd, "T={}", 21)?;
//! ```
//! When done, `release` hands back the I2C bus or the pins together with the delay.
//!
#![no_std]
#![allow(dead_code, non_camel_case_types, non_upper_case_globals)]
use core::fmt::Display;

mod driver;
mod layout;

pub use driver::{
    hd44780::{
        adapter::{
            generic_pcf8574t::GenericPCF8574TAdapter,
            parallel_gpio::{DataPins, NoPin, ParallelBusError, ParallelGpioAdapter, ParallelGpioPins},
        },
        ControllerState, HD44780,
    },
    DataWidth, DeviceHardwareTrait,
};
pub use layout::{JustifiedText, Justify};

use embedded_hal::{delay::DelayNs, digital::OutputPin, i2c};

/// HD44780 based character display using a generic PCF8574T I2C adapter.
pub type CharacterDisplayPCF8574T<I2C, DELAY> =
    BaseCharacterDisplay<GenericPCF8574TAdapter<I2C, DELAY>>;

/// HD44780 based character display wired directly to GPIO pins.
pub type CharacterDisplayParallel<RS, EN, D, RW, BL, DELAY> =
    BaseCharacterDisplay<ParallelGpioAdapter<RS, EN, D, RW, BL, DELAY>>;

#[derive(Debug, PartialEq, Copy, Clone)]
/// Errors that can occur when using the display. `E` is the error type of the transport.
pub enum CharacterDisplayError<E> {
    /// A bus or pin write failed part way through an operation
    BusError(E),
    /// The transport could not claim its bus or pins
    ResourceUnavailable(E),
    /// Column is out of range
    ColumnOutOfRange,
    /// A custom character needs exactly 8 rows
    InvalidCharmapLength,
    /// The configured lines and columns cannot be addressed by the controller
    UnsupportedDisplayGeometry,
    /// The display has not been initialized
    NotInitialized,
    /// The display is already initialized
    AlreadyInitialized,
    /// Formatting error
    FormattingError(core::fmt::Error),
}

impl<E> From<core::fmt::Error> for CharacterDisplayError<E> {
    fn from(err: core::fmt::Error) -> Self {
        CharacterDisplayError::FormattingError(err)
    }
}

impl<E> From<&CharacterDisplayError<E>> for &'static str {
    fn from(err: &CharacterDisplayError<E>) -> Self {
        match err {
            CharacterDisplayError::BusError(_) => "Bus error",
            CharacterDisplayError::ResourceUnavailable(_) => "Resource unavailable",
            CharacterDisplayError::ColumnOutOfRange => "Column out of range",
            CharacterDisplayError::InvalidCharmapLength => "Invalid charmap length",
            CharacterDisplayError::UnsupportedDisplayGeometry => "Unsupported display geometry",
            CharacterDisplayError::NotInitialized => "Display not initialized",
            CharacterDisplayError::AlreadyInitialized => "Display already initialized",
            CharacterDisplayError::FormattingError(_) => "Formatting error",
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for CharacterDisplayError<E> {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<E> ufmt::uDisplay for CharacterDisplayError<E> {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<E> Display for CharacterDisplayError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

/// Character cell height of the controller font.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum DotSize {
    #[default]
    Dots5x8,
    /// Only honored on single line displays.
    Dots5x10,
}

#[cfg(feature = "defmt")]
impl defmt::Format for DotSize {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            DotSize::Dots5x8 => defmt::write!(fmt, "5x8"),
            DotSize::Dots5x10 => defmt::write!(fmt, "5x10"),
        }
    }
}

/// Geometry and font of the attached display.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct DisplayConfig {
    columns: u8,
    lines: u8,
    dot_size: DotSize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::new(16, 1)
    }
}

impl DisplayConfig {
    pub const fn new(columns: u8, lines: u8) -> Self {
        Self {
            columns,
            lines,
            dot_size: DotSize::Dots5x8,
        }
    }

    pub const fn with_columns(mut self, columns: u8) -> Self {
        self.columns = columns;
        self
    }

    pub const fn with_lines(mut self, lines: u8) -> Self {
        self.lines = lines;
        self
    }

    pub const fn with_dot_size(mut self, dot_size: DotSize) -> Self {
        self.dot_size = dot_size;
        self
    }

    pub const fn columns(&self) -> u8 {
        self.columns
    }

    pub const fn lines(&self) -> u8 {
        self.lines
    }

    pub const fn dot_size(&self) -> DotSize {
        self.dot_size
    }

    /// Whether every cell of this geometry has a DDRAM address. Rows 2 and 3 start at 0x14 and
    /// 0x54, so four line displays are limited to 20 columns.
    pub const fn is_supported(&self) -> bool {
        let lines_ok = self.lines >= 1 && self.lines <= 4;
        let columns_ok = self.columns >= 1 && self.columns <= 40;
        lines_ok && columns_ok && (self.lines <= 2 || self.columns <= 20)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
/// Common display sizes. Converts into a `DisplayConfig` with the 5x8 font.
pub enum LcdDisplayType {
    /// 8x2 display
    Lcd8x2,
    /// 16x1 display
    Lcd16x1,
    /// 16x2 display
    Lcd16x2,
    /// 20x2 display
    Lcd20x2,
    /// 20x4 display
    Lcd20x4,
    /// 40x2 display
    Lcd40x2,
}

impl From<&LcdDisplayType> for &'static str {
    fn from(display_type: &LcdDisplayType) -> Self {
        match display_type {
            LcdDisplayType::Lcd8x2 => "8x2",
            LcdDisplayType::Lcd16x1 => "16x1",
            LcdDisplayType::Lcd16x2 => "16x2",
            LcdDisplayType::Lcd20x2 => "20x2",
            LcdDisplayType::Lcd20x4 => "20x4",
            LcdDisplayType::Lcd40x2 => "40x2",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LcdDisplayType {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for LcdDisplayType {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for LcdDisplayType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

impl LcdDisplayType {
    /// Get the number of lines for the display type
    const fn lines(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd16x1 => 1,
            LcdDisplayType::Lcd20x4 => 4,
            _ => 2,
        }
    }

    /// Get the number of columns for the display type
    const fn columns(&self) -> u8 {
        match self {
            LcdDisplayType::Lcd8x2 => 8,
            LcdDisplayType::Lcd16x1 => 16,
            LcdDisplayType::Lcd16x2 => 16,
            LcdDisplayType::Lcd20x2 => 20,
            LcdDisplayType::Lcd20x4 => 20,
            LcdDisplayType::Lcd40x2 => 40,
        }
    }

    pub const fn config(&self) -> DisplayConfig {
        DisplayConfig::new(self.columns(), self.lines())
    }
}

impl From<LcdDisplayType> for DisplayConfig {
    fn from(display_type: LcdDisplayType) -> Self {
        display_type.config()
    }
}

/// A display session: the HD44780 controller together with the transport it talks through.
pub struct BaseCharacterDisplay<DEVICE>
where
    DEVICE: DeviceHardwareTrait,
{
    controller: HD44780<DEVICE>,
}

impl<I2C, DELAY> BaseCharacterDisplay<GenericPCF8574TAdapter<I2C, DELAY>>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    /// Create a new character display object with the default I2C address for the adapter.
    pub fn new(i2c: I2C, config: DisplayConfig, delay: DELAY) -> Self {
        Self::new_with_address(
            i2c,
            GenericPCF8574TAdapter::<I2C, DELAY>::default_i2c_address(),
            config,
            delay,
        )
    }

    /// Create a new character display object with a specific I2C address for the adapter.
    pub fn new_with_address(i2c: I2C, address: u8, config: DisplayConfig, delay: DELAY) -> Self {
        Self::from_device(GenericPCF8574TAdapter::new(i2c, address, delay), config)
    }
}

impl<RS, EN, D, DELAY> BaseCharacterDisplay<ParallelGpioAdapter<RS, EN, D, NoPin, NoPin, DELAY>>
where
    RS: OutputPin,
    EN: OutputPin,
    D: OutputPin,
    DELAY: DelayNs,
{
    /// Create a display on a 4-bit bus. `data` holds the pins wired to D4-D7.
    pub fn new_4bit(rs: RS, enable: EN, data: [D; 4], config: DisplayConfig, delay: DELAY) -> Self {
        Self::from_device(ParallelGpioAdapter::new_4bit(rs, enable, data, delay), config)
    }

    /// Create a display on an 8-bit bus. `data` holds the pins wired to D0-D7.
    pub fn new_8bit(rs: RS, enable: EN, data: [D; 8], config: DisplayConfig, delay: DELAY) -> Self {
        Self::from_device(ParallelGpioAdapter::new_8bit(rs, enable, data, delay), config)
    }
}

impl<DEVICE> BaseCharacterDisplay<DEVICE>
where
    DEVICE: DeviceHardwareTrait,
{
    /// Create a display on an already configured transport.
    pub fn from_device(device: DEVICE, config: DisplayConfig) -> Self {
        Self {
            controller: HD44780::new(device, config),
        }
    }

    /// Initialize the display. This must be called before using the display.
    pub fn init(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.controller.init()
    }

    /// returns the `DisplayConfig` used to create the display
    pub fn config(&self) -> &DisplayConfig {
        self.controller.config()
    }

    pub fn state(&self) -> ControllerState {
        self.controller.state()
    }

    /// returns the underlying controller, for register inspection
    pub fn controller(&self) -> &HD44780<DEVICE> {
        &self.controller
    }

    //--------------------------------------------------------------------------------------------------
    // high level commands, for the user!
    //--------------------------------------------------------------------------------------------------

    /// Clear the display
    pub fn clear(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.clear()?;
        Ok(self)
    }

    /// Set the cursor to the home position.
    pub fn home(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.home()?;
        Ok(self)
    }

    /// Set the cursor position at specified row and column. Rows and columns are zero-indexed.
    pub fn set_cursor(
        &mut self,
        row: u8,
        col: u8,
    ) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.set_cursor(row, col)?;
        Ok(self)
    }

    /// Write `text` justified within a full row, starting at the cursor.
    pub fn write_text(
        &mut self,
        text: &str,
        justify: Justify,
    ) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.write_text(text, justify)?;
        Ok(self)
    }

    /// Prints a string to the LCD at the current cursor position.
    pub fn print(&mut self, text: &str) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.print(text)?;
        Ok(self)
    }

    /// Write a single character code at the given position.
    pub fn write_raw(
        &mut self,
        value: u8,
        row: u8,
        col: u8,
    ) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.write_raw(value, row, col)?;
        Ok(self)
    }

    /// Create a new custom character.
    pub fn create_char(
        &mut self,
        location: u8,
        charmap: &[u8],
    ) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.create_char(location, charmap)?;
        Ok(self)
    }

    pub fn display(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.display()?;
        Ok(self)
    }

    pub fn no_display(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.no_display()?;
        Ok(self)
    }

    pub fn cursor(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.cursor()?;
        Ok(self)
    }

    pub fn no_cursor(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.no_cursor()?;
        Ok(self)
    }

    pub fn blink(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.blink()?;
        Ok(self)
    }

    pub fn no_blink(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.no_blink()?;
        Ok(self)
    }

    /// Scroll the display to the left.
    pub fn scroll_left(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.scroll_left()?;
        Ok(self)
    }

    /// Scroll the display to the right.
    pub fn scroll_right(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.scroll_right()?;
        Ok(self)
    }

    /// Set the text flow direction to left to right.
    pub fn left_to_right(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.left_to_right()?;
        Ok(self)
    }

    /// Set the text flow direction to right to left.
    pub fn right_to_left(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.right_to_left()?;
        Ok(self)
    }

    pub fn autoscroll(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.autoscroll()?;
        Ok(self)
    }

    pub fn no_autoscroll(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.no_autoscroll()?;
        Ok(self)
    }

    /// Turn the backlight on at `intensity` percent. Has no effect on adapters without dimming.
    pub fn enable_backlight(
        &mut self,
        intensity: u8,
    ) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.enable_backlight(intensity)?;
        Ok(self)
    }

    pub fn disable_backlight(&mut self) -> Result<&mut Self, CharacterDisplayError<DEVICE::Error>> {
        self.controller.disable_backlight()?;
        Ok(self)
    }

    /// Ends the session, returning the bus or pins and the delay.
    pub fn release(self) -> DEVICE::Resources {
        self.controller.release()
    }
}

/// Implement the `core::fmt::Write` trait for the display, allowing it to be used with the `write!` macro.
/// Text is written as-is at the cursor, like `print`.
impl<DEVICE> core::fmt::Write for BaseCharacterDisplay<DEVICE>
where
    DEVICE: DeviceHardwareTrait,
{
    fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
        if let Err(_e) = self.print(s) {
            return Err(core::fmt::Error);
        }
        Ok(())
    }
}

#[cfg(feature = "ufmt")]
/// Implement the `ufmt::uWrite` trait for the display, allowing it to be used with the `uwriteln!` and `uwrite!` macros.
impl<DEVICE> ufmt::uWrite for BaseCharacterDisplay<DEVICE>
where
    DEVICE: DeviceHardwareTrait,
{
    fn write_str(&mut self, s: &str) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.print(s)?;
        Ok(())
    }

    type Error = CharacterDisplayError<DEVICE::Error>;
}
