pub mod hd44780;

use core::fmt::Debug;

/// Width of the data bus between the transport and the HD44780 controller.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DataWidth {
    /// Four data lines (D4-D7). Every byte is sent as two nibbles, high nibble first.
    FourBit,
    /// Eight data lines (D0-D7). Every byte is sent in a single enable strobe.
    EightBit,
}

#[cfg(feature = "defmt")]
impl defmt::Format for DataWidth {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            DataWidth::FourBit => defmt::write!(fmt, "4-bit"),
            DataWidth::EightBit => defmt::write!(fmt, "8-bit"),
        }
    }
}

/// Trait for device hardware implementations. Embodies the physical signaling used to reach
/// the HD44780 controller: a direct GPIO bus or an I2C port expander. The transport owns no
/// protocol state; it only emits nibbles/bytes, strobes the enable line, and waits.
pub trait DeviceHardwareTrait {
    /// Error returned by the underlying bus or pins.
    type Error: Debug;

    /// The peripherals handed back to the caller by `release`.
    type Resources;

    /// returns the width of the data bus wired to the controller
    fn data_width(&self) -> DataWidth;

    /// Claims and configures the physical resources. Called exactly once, before `begin`.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Drives the control lines to their rest state before protocol traffic starts.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Writes the low nibble of `value` and pulses the enable line. If `rs_setting` is `true`,
    /// the data register is selected, otherwise the instruction register.
    fn write_nibble(&mut self, rs_setting: bool, value: u8) -> Result<(), Self::Error>;

    /// Writes a full byte. On a 4-bit bus the high nibble goes first.
    fn write_byte(&mut self, rs_setting: bool, value: u8) -> Result<(), Self::Error> {
        self.write_nibble(rs_setting, value >> 4)
            .and_then(|_| self.write_nibble(rs_setting, value & 0x0F))
    }

    /// Turns the backlight on at `intensity` percent. Values above 100 are capped.
    fn enable_backlight(&mut self, intensity: u8) -> Result<(), Self::Error>;

    fn disable_backlight(&mut self) -> Result<(), Self::Error>;

    /// Blocks for at least `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Gives back the owned peripherals. Consumes the transport, so it happens exactly once.
    fn release(self) -> Self::Resources;
}
