// Copyright 2025 LWC Bench Contributors
// SPDX-License-Identifier: Apache-2.0

//! 16-bit register access over the Linux i2c-dev interface.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

/// `I2C_SLAVE` ioctl request from `<linux/i2c-dev.h>`.
const I2C_SLAVE: u16 = 0x0703;

/// Big-endian 16-bit register read/write on one device.
pub trait RegisterBus {
    /// Read the register at `register`.
    fn read_register(&mut self, register: u8) -> io::Result<u16>;

    /// Write `value` to the register at `register`.
    fn write_register(&mut self, register: u8, value: u16) -> io::Result<()>;
}

/// A device on `/dev/i2c-<bus>`.
#[derive(Debug)]
pub struct LinuxI2cBus {
    file: File,
    path: PathBuf,
    address: u16,
}

impl LinuxI2cBus {
    /// Open bus `bus` and select the device at `address`.
    pub fn open(bus: u8, address: u16) -> io::Result<Self> {
        let path = PathBuf::from(format!("/dev/i2c-{}", bus));
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        #[allow(unsafe_code)]
        let ret = unsafe {
            libc::ioctl(
                file.as_raw_fd(),
                I2C_SLAVE as _,
                libc::c_ulong::from(address),
            )
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            file,
            path,
            address,
        })
    }

    /// Device node path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Selected device address.
    pub fn address(&self) -> u16 {
        self.address
    }
}

impl RegisterBus for LinuxI2cBus {
    fn read_register(&mut self, register: u8) -> io::Result<u16> {
        self.file.write_all(&[register])?;
        let mut buf = [0u8; 2];
        self.file.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn write_register(&mut self, register: u8, value: u16) -> io::Result<()> {
        let [hi, lo] = value.to_be_bytes();
        self.file.write_all(&[register, hi, lo])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_bus_fails() {
        let err = LinuxI2cBus::open(250, 0x40).unwrap_err();
        assert!(matches!(
            err.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
        ));
    }
}
