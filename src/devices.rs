use derive_more::Display;
use rusb::UsbContext;
use tracing::warn;

use crate::constants::{BUILTIN_SCALES, EXTRA_IDS_ENV};

/// Identifier for a USB scale model: a vendor ID (vid) and a product ID
/// (pid) pair.
#[derive(Debug, Display, Eq, PartialEq, Clone, Copy)]
#[display(fmt = "{:04x}:{:04x}", vendor_id, product_id)]
pub struct ScaleDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Bus number and device address of one enumerated device.
///
/// Enumeration lists a device once per interface, so consecutive entries
/// with the same key are the same physical scale.
#[derive(Debug, Display, Eq, PartialEq, Clone, Copy)]
#[display(fmt = "bus {} device {}", bus, address)]
pub struct DeviceAddressKey {
    pub bus: u8,
    pub address: u8,
}

/// The set of scale models this process recognizes.
///
/// Immutable once built. Duplicate entries are harmless since lookup is
/// existence-based.
#[derive(Debug, Clone)]
pub struct ScaleRegistry {
    entries: Vec<ScaleDescriptor>,
}

impl ScaleRegistry {
    /// The compiled-in scale table.
    pub fn builtin() -> Self {
        ScaleRegistry {
            entries: BUILTIN_SCALES
                .iter()
                .map(|&(vendor_id, product_id)| ScaleDescriptor {
                    vendor_id,
                    product_id,
                })
                .collect(),
        }
    }

    /// The compiled-in table plus any IDs listed in `USBSCALE_EXTRA_IDS`.
    ///
    /// Malformed entries are skipped with a warning; a bad environment
    /// variable never prevents the built-in scales from being found.
    pub fn from_environment() -> Self {
        let mut registry = Self::builtin();
        if let Ok(extra) = std::env::var(EXTRA_IDS_ENV) {
            for entry in extra.split(',').filter(|s| !s.trim().is_empty()) {
                match parse_id_pair(entry) {
                    Some(descriptor) => registry.entries.push(descriptor),
                    None => warn!(
                        "Ignoring malformed {} entry: {:?} (expected vid:pid hex pair).",
                        EXTRA_IDS_ENV, entry
                    ),
                }
            }
        }
        registry
    }

    /// Check whether a vendor/product pair is a known scale.
    pub fn is_known_scale(&self, vendor_id: u16, product_id: u16) -> bool {
        self.entries.contains(&ScaleDescriptor {
            vendor_id,
            product_id,
        })
    }
}

fn parse_id_pair(entry: &str) -> Option<ScaleDescriptor> {
    let (vid, pid) = entry.trim().split_once(':')?;
    Some(ScaleDescriptor {
        vendor_id: u16::from_str_radix(vid, 16).ok()?,
        product_id: u16::from_str_radix(pid, 16).ok()?,
    })
}

/// The identifying fields the device matcher needs from one enumerated USB
/// device.
pub trait EnumeratedDevice {
    /// Vendor and product IDs from the device descriptor. Reading the
    /// descriptor can fail per device without failing the whole scan.
    fn descriptor(&self) -> rusb::Result<ScaleDescriptor>;

    /// Bus/address pair used to detect duplicate listings of the same
    /// physical device.
    fn address_key(&self) -> DeviceAddressKey;
}

impl<T: UsbContext> EnumeratedDevice for rusb::Device<T> {
    fn descriptor(&self) -> rusb::Result<ScaleDescriptor> {
        self.device_descriptor().map(|desc| ScaleDescriptor {
            vendor_id: desc.vendor_id(),
            product_id: desc.product_id(),
        })
    }

    fn address_key(&self) -> DeviceAddressKey {
        DeviceAddressKey {
            bus: self.bus_number(),
            address: self.address(),
        }
    }
}
