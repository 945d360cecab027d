use std::fmt::{Debug, Error, Formatter};
use std::time::Duration;

use rusb::{Device, DeviceHandle, UsbContext};
use tracing::{debug, warn};

use crate::constants::{
    CONTROL_REPORT_SIZE, FALLBACK_ENDPOINT, TARE_ENDPOINT, WEIGH_REPORT_SIZE,
};
use crate::error::{Result, ScaleError};
use crate::server::ScaleTransport;

/// An opened USB scale: claimed interface, resolved inbound endpoint.
///
/// The handle is owned exclusively for the session's duration; dropping it
/// releases the interface and, where the platform supports kernel drivers,
/// reattaches the one we detached.
pub struct UsbScale<T: UsbContext> {
    handle: DeviceHandle<T>,
    endpoint_in: u8,
}

impl<T: UsbContext> Debug for UsbScale<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        write!(f, "UsbScale {{ endpoint_in: {:#04x} }}", self.endpoint_in)
    }
}

impl<T: UsbContext> UsbScale<T> {
    /// Open a scale found by the device matcher and prepare it for I/O.
    ///
    /// Opening requires permission to access the device; if you get the
    /// permission denied error, check your udev rules.
    pub fn open(device: &Device<T>) -> Result<Self> {
        let mut handle = device.open().map_err(ScaleError::from_transfer)?;

        // A kernel HID driver usually owns the scale already. Auto-detach
        // makes libusb detach it while the interface is claimed and
        // reattach it on release; platforms without the concept report
        // NotSupported, which is a no-op for us.
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(e) => warn!("Could not enable kernel driver auto-detach: {}.", e),
        }

        handle
            .claim_interface(0)
            .map_err(ScaleError::from_transfer)?;

        let endpoint_in = first_endpoint_address(device);
        debug!("Using inbound endpoint {:#04x}.", endpoint_in);

        Ok(UsbScale {
            handle,
            endpoint_in,
        })
    }
}

impl<T: UsbContext> ScaleTransport for UsbScale<T> {
    fn read_report(
        &mut self,
        buf: &mut [u8; WEIGH_REPORT_SIZE],
        timeout: Duration,
    ) -> Result<usize> {
        self.handle
            .read_interrupt(self.endpoint_in, buf, timeout)
            .map_err(ScaleError::from_transfer)
    }

    fn send_control(
        &mut self,
        report: &[u8; CONTROL_REPORT_SIZE],
        timeout: Duration,
    ) -> Result<()> {
        let written = self
            .handle
            .write_interrupt(TARE_ENDPOINT, report, timeout)
            .map_err(ScaleError::from_transfer)?;
        debug!("Sent control report, {} bytes transferred.", written);
        Ok(())
    }
}

impl<T: UsbContext> Drop for UsbScale<T> {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release_interface(0) {
            debug!("Failed to release interface: {}.", e);
        }
    }
}

/// Fetch the bEndpointAddress of the device's first endpoint (first
/// interface, first alternate setting), the endpoint scales deliver weight
/// reports on. Devices vary, so this is read from the active configuration
/// rather than assumed; if the descriptor cannot be introspected, fall back
/// to the conventional address.
fn first_endpoint_address<T: UsbContext>(device: &Device<T>) -> u8 {
    let config = match device.config_descriptor(0) {
        Ok(config) => config,
        Err(e) => {
            warn!(
                "Failed to read config descriptor: {}. Falling back to endpoint {:#04x}.",
                e, FALLBACK_ENDPOINT
            );
            return FALLBACK_ENDPOINT;
        }
    };

    config
        .interfaces()
        .next()
        .and_then(|interface| interface.descriptors().next())
        .and_then(|setting| setting.endpoint_descriptors().next())
        .map(|endpoint| endpoint.address())
        .unwrap_or(FALLBACK_ENDPOINT)
}
