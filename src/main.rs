use std::num::NonZeroUsize;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use rusb::UsbContext;
use tracing::{debug, error};

// USB HID POS:
//
// Scales speaking the USB HID Point of Sale usage model deliver their state
// as fixed-layout HID reports, per the USB standard document "HID Point of
// Sale Usage Tables" V1.02:
// https://www.usb.org/sites/default/files/pos1_02.pdf
//
// A weight report is six bytes: report id, status, unit code, a signed
// base-ten exponent, and a little-endian 16-bit magnitude. The scale keeps
// streaming reports while it stabilizes; only the Settled status carries a
// final weight.

pub mod constants;
pub mod decoder;
pub mod device;
pub mod devices;
pub mod error;
pub mod server;
pub mod tools;

use crate::decoder::Weight;
use crate::device::usb::UsbScale;
use crate::devices::ScaleRegistry;
use crate::error::{Result, ScaleError};
use crate::server::WeighSession;
use crate::tools::find_nth_scale;

/// Read weight from a USB scale.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Index of scale to read (the first scale has index 1)
    #[arg(short, long, default_value_t = NonZeroUsize::MIN)]
    index: NonZeroUsize,

    /// The `zero' command will request the scale to reset to zero
    /// (not supported by all scales)
    #[arg(value_enum)]
    command: Option<Action>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Zero,
}

/// Resolve the requested scale and run one weighing session against it.
fn run(args: &Args) -> Result<Weight> {
    let registry = ScaleRegistry::from_environment();

    let context = rusb::Context::new().map_err(ScaleError::from_transfer)?;
    let devices = context.devices().map_err(ScaleError::from_transfer)?;
    debug!("Enumerated {} USB devices.", devices.len());

    let device = find_nth_scale(devices.iter(), &registry, args.index.get())?;

    let mut scale = UsbScale::open(&device)?;
    let session = WeighSession::new(args.command == Some(Action::Zero));
    session.run(&mut scale)
}

fn main() -> ExitCode {
    let args = Args::parse();
    tools::initialize_logging(false);

    match run(&args) {
        Ok(weight) => {
            // The weight is the program's one line of output on stdout;
            // everything else goes to stderr.
            println!("{}", weight);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
