use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    /// Stentura-family request/response protocol over serial.
    Stenura,
    /// Gemini PR byte stream over serial.
    Gemini,
}

#[derive(Debug, Parser)]
#[command(name = "stenod", version, about = "Stenography translation daemon")]
pub struct Args {
    /// Serial device of the steno machine.
    #[arg(short, long, default_value = "/dev/ttyS0")]
    pub device: PathBuf,

    /// JSON dictionaries, loaded in order; later files win on conflict.
    #[arg(short = 'j', long = "dictionary", required = true)]
    pub dictionaries: Vec<PathBuf>,

    /// Wire protocol spoken by the machine.
    #[arg(long, value_enum, default_value_t = Protocol::Stenura)]
    pub protocol: Protocol,

    /// Serial baud rate.
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,
}
