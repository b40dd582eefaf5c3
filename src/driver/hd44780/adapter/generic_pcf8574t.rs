use bitfield::bitfield;
use embedded_hal::{delay::DelayNs, i2c};

use crate::driver::{DataWidth, DeviceHardwareTrait};

use super::{I2C_ENABLE_PULSE_US, I2C_SETTLE_US};

// Pin mapping of the common PCF8574T backpack: control lines on P0-P3, HD44780 D4-D7 on P4-P7
bitfield! {
    pub struct GenericPCF8574TBitField(u8);
    impl Debug;
    pub rs, set_rs: 0, 0;
    pub rw, set_rw: 1, 1;
    pub enable, set_enable: 2, 2;
    pub backlight, set_backlight: 3, 3;
    pub data, set_data: 7, 4;
}

impl Clone for GenericPCF8574TBitField {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

/// Adapter based on the PCF8574T I2C GPIO expander interfacing with the HD44780 LCD controller
/// via a 4-bit interface. Every nibble costs three single-byte bus writes: data setup, enable
/// high, enable low. The backlight bit is held on in every byte; the expander cannot dim it.
pub struct GenericPCF8574TAdapter<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    bits: GenericPCF8574TBitField,
    i2c: I2C,
    address: u8,
    delay: DELAY,
}

impl<I2C, DELAY> GenericPCF8574TAdapter<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    pub fn new(i2c: I2C, address: u8, delay: DELAY) -> Self {
        let mut bits = GenericPCF8574TBitField(0);
        bits.set_backlight(1);
        Self {
            bits,
            i2c,
            address,
            delay,
        }
    }

    /// returns the default I2C address for the adapter
    pub fn default_i2c_address() -> u8 {
        0x27
    }

    /// returns configured i2c address
    pub fn i2c_address(&self) -> u8 {
        self.address
    }

    /// Returns the bitfield value last written to the expander
    pub fn bits(&self) -> u8 {
        self.bits.0
    }

    /// returns the i2c object. mostly used for testing
    pub(crate) fn i2c(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    fn write_bits_to_gpio(&mut self) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &[self.bits.0])?;
        self.delay.delay_us(I2C_SETTLE_US);
        Ok(())
    }
}

impl<I2C, DELAY> DeviceHardwareTrait for GenericPCF8574TAdapter<I2C, DELAY>
where
    I2C: i2c::I2c,
    DELAY: DelayNs,
{
    type Error = I2C::Error;
    type Resources = (I2C, DELAY);

    fn data_width(&self) -> DataWidth {
        DataWidth::FourBit
    }

    /// Writes the rest state (all lines low, backlight on) once. An absent or unresponsive
    /// expander fails here, before any protocol traffic.
    fn initialize(&mut self) -> Result<(), I2C::Error> {
        self.bits = GenericPCF8574TBitField(0);
        self.bits.set_backlight(1);
        self.write_bits_to_gpio()
    }

    fn begin(&mut self) -> Result<(), I2C::Error> {
        // the rest state is part of every byte written
        Ok(())
    }

    fn write_nibble(&mut self, rs_setting: bool, value: u8) -> Result<(), I2C::Error> {
        self.bits.set_rs(rs_setting as u8);
        self.bits.set_rw(0);
        self.bits.set_data(value & 0x0F);
        self.bits.set_enable(0);
        self.write_bits_to_gpio()?;

        self.bits.set_enable(1);
        self.write_bits_to_gpio()?;
        self.delay.delay_us(I2C_ENABLE_PULSE_US);

        self.bits.set_enable(0);
        self.write_bits_to_gpio()?;
        self.delay.delay_us(I2C_ENABLE_PULSE_US);
        Ok(())
    }

    fn enable_backlight(&mut self, _intensity: u8) -> Result<(), I2C::Error> {
        Ok(())
    }

    fn disable_backlight(&mut self) -> Result<(), I2C::Error> {
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn release(self) -> (I2C, DELAY) {
        (self.i2c, self.delay)
    }
}
