use tracing::{debug, warn};
use tracing_subscriber::FmtSubscriber;

use crate::devices::{DeviceAddressKey, EnumeratedDevice, ScaleRegistry};
use crate::error::ScaleError;

/// Initializes the global logging facility.
///
/// If `RUST_LOG` is not set, this function will set the global default logging level to `info`,
/// and for `usbscale` it will set the `debug` logging level.
///
/// Log messages are formatted and printed to standard error by `tracing_subscriber::FmtSubscriber`,
/// keeping standard output free for the weight itself.
///
/// # Panics
///
/// Panics if the initialization was unsuccessful, likely because a global subscriber was already
/// installed by another call to try_init.
pub fn initialize_logging(json_output: bool) {
    // set default logging levels:
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info,usbscale=debug");
    }
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json_output {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Find the nth distinct scale among the enumerated USB devices.
///
/// Indexing is 1-based: the first physical scale found has index 1. Each
/// device shows up in the enumeration once per interface, so entries whose
/// bus/address key repeats the previous match are skipped rather than
/// counted again. A device whose descriptor cannot be read is skipped too,
/// since the other devices on the bus may still be readable scales.
#[tracing::instrument(skip(devices, registry))]
pub fn find_nth_scale<D: EnumeratedDevice>(
    devices: impl IntoIterator<Item = D>,
    registry: &ScaleRegistry,
    index: usize,
) -> Result<D, ScaleError> {
    let mut current_index = 0usize;
    let mut last_key: Option<DeviceAddressKey> = None;

    for device in devices {
        let descriptor = match device.descriptor() {
            Ok(d) => d,
            Err(e) => {
                warn!("Failed to get device descriptor: {}. Skipping this device.", e);
                continue;
            }
        };

        if !registry.is_known_scale(descriptor.vendor_id, descriptor.product_id) {
            continue;
        }

        // Skip this entry if it's the same physical device as the last one.
        let key = device.address_key();
        if last_key == Some(key) {
            continue;
        }
        last_key = Some(key);

        current_index += 1;
        debug!("Found scale {} ({}).", descriptor, key);
        if current_index == index {
            return Ok(device);
        }
    }

    if index == 1 {
        Err(ScaleError::NoScaleFound)
    } else {
        Err(ScaleError::ScaleIndexNotFound(index))
    }
}
