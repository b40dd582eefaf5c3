pub mod generic_pcf8574t;
pub mod parallel_gpio;

// enable strobe timing for a directly wired bus, in microseconds
const ENABLE_PULSE_US: u32 = 1; //  enable pulse must be >450ns
const COMMAND_SETTLE_US: u32 = 100; //  commands need >37us to settle

// timing for the I2C expander, in microseconds
const I2C_SETTLE_US: u32 = 100; //  after every byte written to the expander
const I2C_ENABLE_PULSE_US: u32 = 5; //  after each edge of the enable bit
