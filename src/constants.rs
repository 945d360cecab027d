use std::time::Duration;

/// Vendor and product IDs of every scale model this tool recognizes.
///
/// Each entry is a `(vendor_id, product_id)` pair, so the USB product
/// 1446:6a73 becomes `(0x1446, 0x6a73)`.
pub static BUILTIN_SCALES: [(u16, u16); 10] = [
    // Stamps.com Model 510 5LB Scale
    (0x1446, 0x6a73),
    // USPS (Elane) PS311 "XM Elane Elane UParcel 30lb"
    (0x7b7c, 0x0100),
    // Stamps.com Stainless Steel 5 lb. Digital Scale
    (0x2474, 0x0550),
    // Stamps.com Stainless Steel 35 lb. Digital Scale
    (0x2474, 0x3550),
    // Mettler Toledo
    (0x0eb8, 0xf000),
    // SANFORD Dymo 10 lb USB Postal Scale
    (0x6096, 0x0158),
    // Fairbanks Scales SCB-R9000
    (0x0b67, 0x555e),
    // Dymo-CoStar Corp. M25 Digital Postal Scale
    (0x0922, 0x8004),
    // DYMO 1772057 Digital Postal Scale
    (0x0922, 0x8003),
    // Pitney Bowes 10lb scale 397-B (X.J. Group XJ-6K809)
    (0x0d8f, 0x0200),
];

/// Environment variable holding extra scale IDs as comma-separated
/// `vid:pid` hex pairs, e.g. `USBSCALE_EXTRA_IDS=0922:8009,1446:6a78`.
pub static EXTRA_IDS_ENV: &str = "USBSCALE_EXTRA_IDS";

/// Length in bytes of a weight report.
pub const WEIGH_REPORT_SIZE: usize = 6;

/// Length in bytes of a control report.
pub const CONTROL_REPORT_SIZE: usize = 2;

/// Tare request: byte 0 is the command code, byte 1 a bitmask where the
/// lowest bit is Enforced Zero Return and the second bit is Zero Scale.
pub static TARE_REPORT: [u8; CONTROL_REPORT_SIZE] = [0x02, 0x02];

/// Number of successful reads to discard before decoding, on top of the one
/// unconditional discard after opening. The first weighing result the scale
/// returns may still belong to the previous weighing cycle.
pub const DEFAULT_PRIMING_READS: usize = 1;

/// Timeout applied to every interrupt transfer.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(10);

/// Interrupt OUT endpoint that accepts tare requests.
pub const TARE_ENDPOINT: u8 = rusb::constants::LIBUSB_ENDPOINT_OUT | 0x02;

/// Inbound endpoint assumed when config-descriptor introspection is
/// unavailable.
pub const FALLBACK_ENDPOINT: u8 =
    rusb::constants::LIBUSB_ENDPOINT_IN | rusb::constants::LIBUSB_RECIPIENT_INTERFACE;
