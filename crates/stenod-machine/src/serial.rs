use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::transport::Transport;

/// A serial device configured for the Stenura link: 9600 8N1, canonical
/// mode off, XON/XOFF disabled. Reads time out after ~100 ms so worker
/// loops can poll their stop flag instead of blocking forever.
pub struct SerialPort {
    file: File,
}

impl SerialPort {
    pub fn open(path: impl AsRef<Path>, baud: u32) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        configure(&file, baud)?;
        Ok(Self { file })
    }
}

fn configure(file: &File, baud: u32) -> io::Result<()> {
    let fd = file.as_raw_fd();
    let speed = match baud {
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported baud rate {other}"),
            ))
        }
    };

    // SAFETY: fd is a valid open descriptor owned by `file` for the
    // duration of these calls; termios is fully initialized by
    // tcgetattr before being modified and written back.
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut termios) != 0 {
            return Err(io::Error::last_os_error());
        }

        libc::cfmakeraw(&mut termios);
        termios.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);
        termios.c_cflag &= !(libc::PARENB | libc::CSTOPB | libc::CSIZE);
        termios.c_cflag |= libc::CS8 | libc::CLOCAL | libc::CREAD;
        // VMIN=0 / VTIME=1: reads return within 100 ms when idle.
        termios.c_cc[libc::VMIN] = 0;
        termios.c_cc[libc::VTIME] = 1;

        if libc::cfsetispeed(&mut termios, speed) != 0
            || libc::cfsetospeed(&mut termios, speed) != 0
        {
            return Err(io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
            return Err(io::Error::last_os_error());
        }
        libc::tcflush(fd, libc::TCIOFLUSH);
    }
    Ok(())
}

impl Transport for SerialPort {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        (&self.file).read(buf)
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut file = &self.file;
        file.write_all(buf)?;
        file.flush()
    }
}
