//! Minimal driver for the NXP MPR121 capacitive touch controller.
//!
//! Only what is needed to get filtered electrode data out of the part: reset, a sane
//! filter configuration, autoconfiguration of the charge current/time, and reads of the
//! filtered, baseline and touch status registers. The on-chip touch detection is left
//! running but [`TouchEngine`](crate::TouchEngine) does its own debouncing from the
//! filtered data.

use core::fmt::Debug;

use embedded_hal::blocking::i2c::{Write, WriteRead};

use crate::{SampleSource, CHANNEL_MASK, MAX_CHANNELS};

/// Address with ADDR tied to GND. VDD, SDA and SCL select 0x5B, 0x5C and 0x5D.
pub const DEFAULT_ADDRESS: u8 = 0x5a;

mod reg {
    pub const TOUCH_STATUS_L: u8 = 0x00;
    pub const FILTERED_DATA_0L: u8 = 0x04;
    pub const BASELINE_0: u8 = 0x1e;
    pub const MHDR: u8 = 0x2b;
    pub const NHDR: u8 = 0x2c;
    pub const NCLR: u8 = 0x2d;
    pub const FDLR: u8 = 0x2e;
    pub const MHDF: u8 = 0x2f;
    pub const NHDF: u8 = 0x30;
    pub const NCLF: u8 = 0x31;
    pub const FDLF: u8 = 0x32;
    pub const NHDT: u8 = 0x33;
    pub const NCLT: u8 = 0x34;
    pub const FDLT: u8 = 0x35;
    pub const TOUCH_TH_0: u8 = 0x41;
    pub const RELEASE_TH_0: u8 = 0x42;
    pub const DEBOUNCE: u8 = 0x5b;
    pub const CONFIG1: u8 = 0x5c;
    pub const CONFIG2: u8 = 0x5d;
    pub const ECR: u8 = 0x5e;
    pub const AUTOCONFIG0: u8 = 0x7b;
    pub const UP_LIMIT: u8 = 0x7d;
    pub const LOW_LIMIT: u8 = 0x7e;
    pub const TARGET_LIMIT: u8 = 0x7f;
    pub const SOFT_RESET: u8 = 0x80;
}

/// CONFIG2 reads back this value after a soft reset
const CONFIG2_RESET: u8 = 0x24;
/// Baseline tracking on (5 MSBs), all 12 electrodes enabled
const ECR_RUN: u8 = 0x80 | MAX_CHANNELS as u8;
/// Baseline tracking on, autoconfig enabled, retry on failure
const AUTOCONFIG0_VALUE: u8 = 0x0b;

const TOUCH_THRESHOLD: u8 = 12;
const RELEASE_THRESHOLD: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error<E> {
    /// The underlying bus transaction failed
    Bus(E),
    /// Nothing answering like an MPR121 at this address
    NotFound(u8),
    InvalidChannel(u8),
}

pub struct Mpr121<I2C> {
    i2c: I2C,
    address: u8,
    last: [u16; MAX_CHANNELS],
}

impl<I2C, E> Mpr121<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    /// Reset and configure the controller, leaving it in run mode
    pub fn new(i2c: I2C, address: u8) -> Result<Self, Error<E>> {
        let mut dev = Self {
            i2c,
            address,
            last: [0; MAX_CHANNELS],
        };
        dev.init()?;
        Ok(dev)
    }

    fn init(&mut self) -> Result<(), Error<E>> {
        self.write_register(reg::SOFT_RESET, 0x63)?;
        self.write_register(reg::ECR, 0x00)?;

        if self.read_register(reg::CONFIG2)? != CONFIG2_RESET {
            return Err(Error::NotFound(self.address));
        }

        self.write_thresholds(TOUCH_THRESHOLD, RELEASE_THRESHOLD)?;

        // Baseline filter: rising, falling and touched
        for (r, v) in [
            (reg::MHDR, 0x01),
            (reg::NHDR, 0x01),
            (reg::NCLR, 0x0e),
            (reg::FDLR, 0x00),
            (reg::MHDF, 0x01),
            (reg::NHDF, 0x05),
            (reg::NCLF, 0x01),
            (reg::FDLF, 0x00),
            (reg::NHDT, 0x00),
            (reg::NCLT, 0x00),
            (reg::FDLT, 0x00),
        ] {
            self.write_register(r, v)?;
        }

        self.write_register(reg::DEBOUNCE, 0x00)?;
        // 16uA charge current, 0.5us charge time, 4 sample first filter
        self.write_register(reg::CONFIG1, 0x10)?;
        self.write_register(reg::CONFIG2, 0x20)?;

        // Autoconfig limits for a 3.3V supply
        self.write_register(reg::AUTOCONFIG0, AUTOCONFIG0_VALUE)?;
        self.write_register(reg::UP_LIMIT, 200)?;
        self.write_register(reg::TARGET_LIMIT, 180)?;
        self.write_register(reg::LOW_LIMIT, 130)?;

        self.write_register(reg::ECR, ECR_RUN)?;
        debug!("mpr121 {:#04x} configured", self.address);
        Ok(())
    }

    /// Set the on-chip touch/release thresholds for all electrodes
    ///
    /// The part only accepts configuration writes in stop mode, so the electrode
    /// configuration is saved and restored around the write.
    pub fn set_thresholds(&mut self, touch: u8, release: u8) -> Result<(), Error<E>> {
        let ecr = self.read_register(reg::ECR)?;
        self.write_register(reg::ECR, 0x00)?;
        self.write_thresholds(touch, release)?;
        self.write_register(reg::ECR, ecr)
    }

    fn write_thresholds(&mut self, touch: u8, release: u8) -> Result<(), Error<E>> {
        for i in 0..MAX_CHANNELS as u8 {
            self.write_register(reg::TOUCH_TH_0 + 2 * i, touch)?;
            self.write_register(reg::RELEASE_TH_0 + 2 * i, release)?;
        }
        Ok(())
    }

    /// 10-bit filtered electrode reading
    pub fn filtered_data(&mut self, channel: u8) -> Result<u16, Error<E>> {
        if channel as usize >= MAX_CHANNELS {
            return Err(Error::InvalidChannel(channel));
        }
        Ok(self.read_register16(reg::FILTERED_DATA_0L + 2 * channel)? & 0x03ff)
    }

    /// Baseline value; the register holds the top 8 of 10 bits
    pub fn baseline_data(&mut self, channel: u8) -> Result<u16, Error<E>> {
        if channel as usize >= MAX_CHANNELS {
            return Err(Error::InvalidChannel(channel));
        }
        Ok((self.read_register(reg::BASELINE_0 + channel)? as u16) << 2)
    }

    /// Touch status bits as judged by the controller itself
    pub fn touched(&mut self) -> Result<u16, Error<E>> {
        Ok(self.read_register16(reg::TOUCH_STATUS_L)? & CHANNEL_MASK)
    }

    pub fn read_register(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(Error::Bus)?;
        Ok(buf[0])
    }

    fn read_register16(&mut self, register: u8) -> Result<u16, Error<E>> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(Error::Bus)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(Error::Bus)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release the bus
    pub fn free(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> SampleSource for Mpr121<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    /// Falls back to the last good reading if the bus misbehaves. Channels past the last
    /// electrode read as 0.
    fn read(&mut self, channel: u8) -> u16 {
        let idx = channel as usize;
        if idx >= MAX_CHANNELS {
            warn!("mpr121 {:#04x} has no ch{}", self.address, channel);
            return 0;
        }

        match self.filtered_data(channel) {
            Ok(value) => {
                self.last[idx] = value;
                value
            }
            Err(err) => {
                warn!("mpr121 {:#04x} ch{} read failed: {:?}", self.address, channel, err);
                self.last[idx]
            }
        }
    }
}
