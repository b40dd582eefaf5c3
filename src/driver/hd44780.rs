// HD44780 Support
// This module provides the HD44780 command layer. The HD44780 struct owns a transport object
// implementing DeviceHardwareTrait and tracks the controller's write-only registers in memory.
// Every register change is followed by a resend of the full register value. The transport
// implementations live in the adapter module:
//      * GenericPCF8574TAdapter
//      * ParallelGpioAdapter
//

pub mod adapter;

use crate::{
    driver::{DataWidth, DeviceHardwareTrait},
    layout::{JustifiedText, Justify},
    CharacterDisplayError, DisplayConfig, DotSize,
};

// commands
const LCD_CMD_CLEARDISPLAY: u8 = 0x01; //  Clear display, set cursor position to zero
const LCD_CMD_RETURNHOME: u8 = 0x02; //  Set cursor position to zero
const LCD_CMD_ENTRYMODESET: u8 = 0x04; //  Sets the entry mode
const LCD_CMD_DISPLAYCONTROL: u8 = 0x08; //  Controls the display; does stuff like turning it off and on
const LCD_CMD_CURSORSHIFT: u8 = 0x10; //  Lets you move the cursor
const LCD_CMD_FUNCTIONSET: u8 = 0x20; //  Used to send the function to set to the display
const LCD_CMD_SETCGRAMADDR: u8 = 0x40; //  Used to set the CGRAM (character generator RAM) with characters
const LCD_CMD_SETDDRAMADDR: u8 = 0x80; //  Used to set the DDRAM (Display Data RAM)

// flags for display entry mode
const LCD_FLAG_ENTRYRIGHT: u8 = 0x00; //  Used to set text to flow from right to left
const LCD_FLAG_ENTRYLEFT: u8 = 0x02; //  Used to set text to flow from left to right
const LCD_FLAG_ENTRYSHIFTINCREMENT: u8 = 0x01; //  Used to 'right justify' text from the cursor
const LCD_FLAG_ENTRYSHIFTDECREMENT: u8 = 0x00; //  Used to 'left justify' text from the cursor

// flags for display on/off control
const LCD_FLAG_DISPLAYON: u8 = 0x04; //  Turns the display on
const LCD_FLAG_DISPLAYOFF: u8 = 0x00; //  Turns the display off
const LCD_FLAG_CURSORON: u8 = 0x02; //  Turns the cursor on
const LCD_FLAG_CURSOROFF: u8 = 0x00; //  Turns the cursor off
const LCD_FLAG_BLINKON: u8 = 0x01; //  Turns on the blinking cursor
const LCD_FLAG_BLINKOFF: u8 = 0x00; //  Turns off the blinking cursor

// flags for display/cursor shift
const LCD_FLAG_DISPLAYMOVE: u8 = 0x08; //  Flag for moving the display
const LCD_FLAG_CURSORMOVE: u8 = 0x00; //  Flag for moving the cursor
const LCD_FLAG_MOVERIGHT: u8 = 0x04; //  Flag for moving right
const LCD_FLAG_MOVELEFT: u8 = 0x00; //  Flag for moving left

// flags for function set
const LCD_FLAG_8BITMODE: u8 = 0x10; //  LCD 8 bit mode
const LCD_FLAG_4BITMODE: u8 = 0x00; //  LCD 4 bit mode
const LCD_FLAG_2LINE: u8 = 0x08; //  LCD 2 line mode
const LCD_FLAG_1LINE: u8 = 0x00; //  LCD 1 line mode
const LCD_FLAG_5x10_DOTS: u8 = 0x04; //  10 pixel high font mode
const LCD_FLAG_5x8_DOTS: u8 = 0x00; //  8 pixel high font mode

// timing, in microseconds. These are datasheet minimums.
const POWER_ON_DELAY_US: u32 = 50_000; //  >40ms after Vcc rises above 2.7V
const HANDSHAKE_RETRY_DELAY_US: u32 = 4_500; //  >4.1ms after the first two function set attempts
const HANDSHAKE_FINAL_DELAY_US: u32 = 150; //  >100us before the last attempt
const CLEAR_HOME_DELAY_US: u32 = 2_000; //  clear and home are slow commands

/// DDRAM base address of each row. Fixed by the HD44780 memory layout.
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Protocol state of the controller. The HD44780 is write-only, so this tracks what has
/// been sent, not what the hardware reports.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ControllerState {
    /// Nothing has been sent yet.
    Uninitialized,
    /// The transport is claimed and the interface-width handshake is in progress.
    Handshake,
    /// Initialization is complete; every operation is accepted.
    Ready,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ControllerState {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            ControllerState::Uninitialized => defmt::write!(fmt, "Uninitialized"),
            ControllerState::Handshake => defmt::write!(fmt, "Handshake"),
            ControllerState::Ready => defmt::write!(fmt, "Ready"),
        }
    }
}

pub struct HD44780<DEVICE>
where
    DEVICE: DeviceHardwareTrait,
{
    device: DEVICE,
    config: DisplayConfig,
    display_function: u8,
    display_control: u8,
    entry_mode: u8,
    state: ControllerState,
}

impl<DEVICE> HD44780<DEVICE>
where
    DEVICE: DeviceHardwareTrait,
{
    pub fn new(device: DEVICE, config: DisplayConfig) -> Self {
        let bit_mode = match device.data_width() {
            DataWidth::FourBit => LCD_FLAG_4BITMODE,
            DataWidth::EightBit => LCD_FLAG_8BITMODE,
        };
        Self {
            device,
            config,
            display_function: bit_mode | LCD_FLAG_1LINE | LCD_FLAG_5x8_DOTS,
            display_control: 0,
            entry_mode: 0,
            state: ControllerState::Uninitialized,
        }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// The last function set value sent (or to be sent) to the controller.
    pub fn display_function(&self) -> u8 {
        self.display_function
    }

    pub fn display_control(&self) -> u8 {
        self.display_control
    }

    pub fn entry_mode(&self) -> u8 {
        self.entry_mode
    }

    /// returns the transport. mostly used for testing
    pub(crate) fn device(&mut self) -> &mut DEVICE {
        &mut self.device
    }

    /// Runs the power-on handshake. The first call claims the transport resources. If the
    /// handshake fails part way, calling `init` again repeats the handshake only.
    pub fn init(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        match self.state {
            ControllerState::Ready => return Err(CharacterDisplayError::AlreadyInitialized),
            ControllerState::Uninitialized => {
                if !self.config.is_supported() {
                    return Err(CharacterDisplayError::UnsupportedDisplayGeometry);
                }
                self.device
                    .initialize()
                    .map_err(CharacterDisplayError::ResourceUnavailable)?;
                self.state = ControllerState::Handshake;
            }
            ControllerState::Handshake => {}
        }

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "HD44780 handshake: {}x{} on {} bus",
            self.config.columns(),
            self.config.lines(),
            self.device.data_width()
        );

        self.handshake()?;
        self.state = ControllerState::Ready;

        #[cfg(feature = "defmt")]
        defmt::debug!("HD44780 ready, function set {=u8:#x}", self.display_function);
        Ok(())
    }

    fn handshake(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        if self.config.lines() > 1 {
            self.display_function |= LCD_FLAG_2LINE;
        }
        // the 10 pixel font is only available on single line displays
        if self.config.dot_size() == DotSize::Dots5x10 && self.config.lines() == 1 {
            self.display_function |= LCD_FLAG_5x10_DOTS;
        }

        self.device.delay_us(POWER_ON_DELAY_US);
        self.device.begin().map_err(CharacterDisplayError::BusError)?;

        match self.device.data_width() {
            DataWidth::FourBit => {
                // HD44780 datasheet figure 24: three attempts at 8-bit mode bring the
                // controller to a known state, then switch to the 4-bit interface
                self.write_nibble(0x03)?;
                self.device.delay_us(HANDSHAKE_RETRY_DELAY_US);
                self.write_nibble(0x03)?;
                self.device.delay_us(HANDSHAKE_RETRY_DELAY_US);
                self.write_nibble(0x03)?;
                self.device.delay_us(HANDSHAKE_FINAL_DELAY_US);
                self.write_nibble(0x02)?;
            }
            DataWidth::EightBit => {
                // HD44780 datasheet figure 23
                self.send_command(LCD_CMD_FUNCTIONSET | self.display_function)?;
                self.device.delay_us(HANDSHAKE_RETRY_DELAY_US);
                self.send_command(LCD_CMD_FUNCTIONSET | self.display_function)?;
                self.device.delay_us(HANDSHAKE_FINAL_DELAY_US);
                self.send_command(LCD_CMD_FUNCTIONSET | self.display_function)?;
            }
        }

        // now set the number of lines and font size
        self.send_command(LCD_CMD_FUNCTIONSET | self.display_function)?;

        self.display_control = LCD_FLAG_DISPLAYON | LCD_FLAG_CURSOROFF | LCD_FLAG_BLINKOFF;
        self.send_command(LCD_CMD_DISPLAYCONTROL | self.display_control)?;

        self.clear_display()?;

        self.entry_mode = LCD_FLAG_ENTRYLEFT | LCD_FLAG_ENTRYSHIFTDECREMENT;
        self.send_command(LCD_CMD_ENTRYMODESET | self.entry_mode)
    }

    fn ensure_ready(&self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        if self.state != ControllerState::Ready {
            return Err(CharacterDisplayError::NotInitialized);
        }
        Ok(())
    }

    fn write_nibble(&mut self, value: u8) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.device
            .write_nibble(false, value)
            .map_err(CharacterDisplayError::BusError)
    }

    fn send_command(&mut self, command: u8) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.device
            .write_byte(false, command)
            .map_err(CharacterDisplayError::BusError)
    }

    fn send_data(&mut self, value: u8) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.device
            .write_byte(true, value)
            .map_err(CharacterDisplayError::BusError)
    }

    fn clear_display(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.send_command(LCD_CMD_CLEARDISPLAY)?;
        self.device.delay_us(CLEAR_HOME_DELAY_US);
        Ok(())
    }

    fn set_display_control_flag(
        &mut self,
        flag: u8,
        on: bool,
    ) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        if on {
            self.display_control |= flag;
        } else {
            self.display_control &= !flag;
        }
        self.send_command(LCD_CMD_DISPLAYCONTROL | self.display_control)
    }

    fn set_entry_mode_flag(
        &mut self,
        flag: u8,
        on: bool,
    ) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        if on {
            self.entry_mode |= flag;
        } else {
            self.entry_mode &= !flag;
        }
        self.send_command(LCD_CMD_ENTRYMODESET | self.entry_mode)
    }

    /// Clear the display and return the cursor to the origin.
    pub fn clear(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        self.clear_display()
    }

    /// Set the cursor to the home position.
    pub fn home(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        self.send_command(LCD_CMD_RETURNHOME)?;
        self.device.delay_us(CLEAR_HOME_DELAY_US);
        Ok(())
    }

    /// Set the cursor position. Rows and columns are zero-indexed. A row past the last line
    /// is clamped to the last line; a column past the last column is rejected.
    pub fn set_cursor(
        &mut self,
        row: u8,
        col: u8,
    ) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        if col >= self.config.columns() {
            return Err(CharacterDisplayError::ColumnOutOfRange);
        }
        let last_row = self.config.lines() - 1;
        let row = if row > last_row {
            #[cfg(feature = "defmt")]
            defmt::warn!("row {=u8} clamped to {=u8}", row, last_row);
            last_row
        } else {
            row
        };

        self.send_command(LCD_CMD_SETDDRAMADDR | (ROW_OFFSETS[row as usize] + col))
    }

    /// Writes `text` padded or truncated to exactly one row width, starting at the cursor.
    pub fn write_text(
        &mut self,
        text: &str,
        justify: Justify,
    ) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        for byte in JustifiedText::new(text, self.config.columns() as usize, justify) {
            self.send_data(byte)?;
        }
        Ok(())
    }

    /// Writes `text` as-is at the cursor.
    pub fn print(&mut self, text: &str) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        for c in text.chars() {
            self.send_data(c as u8)?;
        }
        Ok(())
    }

    /// Moves the cursor and writes one raw character code, typically a custom glyph index.
    pub fn write_raw(
        &mut self,
        value: u8,
        row: u8,
        col: u8,
    ) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_cursor(row, col)?;
        self.send_data(value)
    }

    /// Programs one of the 8 CGRAM glyph slots. `location` is masked to 0-7 and `charmap`
    /// must hold exactly 8 rows. Leaves the address counter in CGRAM, so call `set_cursor`
    /// before writing text again.
    pub fn create_char(
        &mut self,
        location: u8,
        charmap: &[u8],
    ) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        if charmap.len() != 8 {
            return Err(CharacterDisplayError::InvalidCharmapLength);
        }
        self.send_command(LCD_CMD_SETCGRAMADDR | ((location & 0x7) << 3))?;
        for &charmap_byte in charmap {
            self.send_data(charmap_byte)?;
        }
        Ok(())
    }

    pub fn display(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_display_control_flag(LCD_FLAG_DISPLAYON, true)
    }

    pub fn no_display(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_display_control_flag(LCD_FLAG_DISPLAYON, false)
    }

    pub fn cursor(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_display_control_flag(LCD_FLAG_CURSORON, true)
    }

    pub fn no_cursor(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_display_control_flag(LCD_FLAG_CURSORON, false)
    }

    pub fn blink(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_display_control_flag(LCD_FLAG_BLINKON, true)
    }

    pub fn no_blink(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_display_control_flag(LCD_FLAG_BLINKON, false)
    }

    /// Shift the whole display one position left without touching DDRAM.
    pub fn scroll_left(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        self.send_command(LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVELEFT)
    }

    /// Shift the whole display one position right without touching DDRAM.
    pub fn scroll_right(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.ensure_ready()?;
        self.send_command(LCD_CMD_CURSORSHIFT | LCD_FLAG_DISPLAYMOVE | LCD_FLAG_MOVERIGHT)
    }

    pub fn left_to_right(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_entry_mode_flag(LCD_FLAG_ENTRYLEFT, true)
    }

    pub fn right_to_left(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_entry_mode_flag(LCD_FLAG_ENTRYLEFT, false)
    }

    pub fn autoscroll(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_entry_mode_flag(LCD_FLAG_ENTRYSHIFTINCREMENT, true)
    }

    pub fn no_autoscroll(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.set_entry_mode_flag(LCD_FLAG_ENTRYSHIFTINCREMENT, false)
    }

    pub fn enable_backlight(
        &mut self,
        intensity: u8,
    ) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.device
            .enable_backlight(intensity)
            .map_err(CharacterDisplayError::BusError)
    }

    pub fn disable_backlight(&mut self) -> Result<(), CharacterDisplayError<DEVICE::Error>> {
        self.device
            .disable_backlight()
            .map_err(CharacterDisplayError::BusError)
    }

    /// Tears down the session and hands the transport's peripherals back.
    pub fn release(self) -> DEVICE::Resources {
        #[cfg(feature = "defmt")]
        defmt::debug!("HD44780 released in state {}", self.state);
        self.device.release()
    }
}
