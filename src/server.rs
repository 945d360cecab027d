use std::time::Duration;

use tracing::{debug, info, warn};

use crate::constants::{
    CONTROL_REPORT_SIZE, DEFAULT_PRIMING_READS, TARE_REPORT, TRANSFER_TIMEOUT, WEIGH_REPORT_SIZE,
};
use crate::decoder::{decode, ScaleStatus, Weight, WeighOutcome};
use crate::error::Result;

/// Transfer operations a weigh session needs from an opened scale.
///
/// The production implementation drives interrupt transfers through rusb;
/// tests script the reports instead.
pub trait ScaleTransport {
    /// Read one weight report into `buf`, blocking up to `timeout`.
    fn read_report(&mut self, buf: &mut [u8; WEIGH_REPORT_SIZE], timeout: Duration) -> Result<usize>;

    /// Send one control report to the scale, blocking up to `timeout`.
    fn send_control(&mut self, report: &[u8; CONTROL_REPORT_SIZE], timeout: Duration) -> Result<()>;
}

/// One weighing session over one opened scale.
///
/// Runs the scale's status state machine to completion: optional tare,
/// priming discards, then read and decode until the scale settles or
/// reports an error.
#[derive(Debug)]
pub struct WeighSession {
    tare: bool,
    priming_reads: usize,
    timeout: Duration,
}

impl WeighSession {
    pub fn new(tare: bool) -> Self {
        WeighSession {
            tare,
            priming_reads: DEFAULT_PRIMING_READS,
            timeout: TRANSFER_TIMEOUT,
        }
    }

    /// Override the number of priming reads discarded before decoding.
    pub fn with_priming_reads(mut self, priming_reads: usize) -> Self {
        self.priming_reads = priming_reads;
        self
    }

    /// Override the per-transfer timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the session to its terminal outcome.
    ///
    /// Returns the settled weight, or the first fatal error. Transient
    /// scale states (zeroing, weighing, under/over range) keep the loop
    /// running and are surfaced as log messages, once per status change.
    #[tracing::instrument(skip(scale))]
    pub fn run<T: ScaleTransport>(&self, scale: &mut T) -> Result<Weight> {
        let mut buf = [0u8; WEIGH_REPORT_SIZE];

        if self.tare {
            // Not all scales honor a zero request; proceed to weighing
            // either way.
            match scale.send_control(&TARE_REPORT, self.timeout) {
                Ok(()) => info!("Tared the scale."),
                Err(e) => warn!("Tare request failed: {}. Continuing without tare.", e),
            }
        }

        // The first packet after opening tends to carry data from a prior
        // weighing cycle. Grab and drop one packet now; a failure here is
        // no worse than not having asked.
        if let Err(e) = scale.read_report(&mut buf, self.timeout) {
            debug!("Initial discard read failed: {}.", e);
        }

        info!("Entering read loop.");

        let mut last_status: Option<ScaleStatus> = None;
        let mut remaining_discards = self.priming_reads;

        loop {
            let len = scale.read_report(&mut buf, self.timeout)?;
            debug!("Received {} bytes: {:02x?}", len, &buf[..]);

            if remaining_discards > 0 {
                remaining_discards -= 1;
                continue;
            }

            let (outcome, status) = decode(&buf, last_status);
            last_status = status;

            match outcome {
                WeighOutcome::Settled(weight) => return Ok(weight),
                WeighOutcome::Retry { advisory } => {
                    if let Some(message) = advisory {
                        info!("{}", message);
                    }
                }
                WeighOutcome::Fatal(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScaleError;

    /// Scripted transport: pops one canned result per read, records control
    /// reports.
    struct FakeScale {
        reports: Vec<Result<[u8; WEIGH_REPORT_SIZE]>>,
        tare_result: Result<()>,
        tare_requests: Vec<[u8; CONTROL_REPORT_SIZE]>,
    }

    impl FakeScale {
        fn new(reports: Vec<Result<[u8; WEIGH_REPORT_SIZE]>>) -> Self {
            FakeScale {
                reports,
                tare_result: Ok(()),
                tare_requests: vec![],
            }
        }

        fn failing_tare(mut self) -> Self {
            self.tare_result = Err(ScaleError::Transfer(rusb::Error::Pipe));
            self
        }
    }

    impl ScaleTransport for FakeScale {
        fn read_report(
            &mut self,
            buf: &mut [u8; WEIGH_REPORT_SIZE],
            _timeout: Duration,
        ) -> Result<usize> {
            if self.reports.is_empty() {
                // A scale that stops talking looks like a timeout.
                return Err(ScaleError::Transfer(rusb::Error::Timeout));
            }
            let report = self.reports.remove(0)?;
            *buf = report;
            Ok(report.len())
        }

        fn send_control(
            &mut self,
            report: &[u8; CONTROL_REPORT_SIZE],
            _timeout: Duration,
        ) -> Result<()> {
            self.tare_requests.push(*report);
            self.tare_result
        }
    }

    // A packet left over from a previous weighing cycle; decoding it would
    // be fatal, so a passing session proves it was discarded.
    const STALE: [u8; WEIGH_REPORT_SIZE] = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    const WEIGHING: [u8; WEIGH_REPORT_SIZE] = [0x03, 0x03, 0x02, 0x00, 0x00, 0x00];
    const SETTLED_100G: [u8; WEIGH_REPORT_SIZE] = [0x03, 0x04, 0x02, 0x00, 0x64, 0x00];
    const FAULT: [u8; WEIGH_REPORT_SIZE] = [0x03, 0x01, 0x00, 0x00, 0x00, 0x00];

    #[test]
    fn settles_after_priming_discards() {
        let mut scale = FakeScale::new(vec![
            Ok(STALE),
            Ok(STALE),
            Ok(WEIGHING),
            Ok(SETTLED_100G),
        ]);
        let weight = WeighSession::new(false).run(&mut scale).unwrap();
        assert_eq!(weight.value, 100.0);
        assert_eq!(weight.unit, "g");
    }

    #[test]
    fn fault_terminates_without_a_weight() {
        let mut scale = FakeScale::new(vec![Ok(STALE), Ok(STALE), Ok(FAULT), Ok(SETTLED_100G)]);
        let result = WeighSession::new(false).run(&mut scale);
        assert_eq!(result, Err(ScaleError::ScaleFault));
        // The settled report after the fault must never be reached.
        assert_eq!(scale.reports.len(), 1);
    }

    #[test]
    fn failed_tare_still_produces_a_weight() {
        let mut scale =
            FakeScale::new(vec![Ok(STALE), Ok(STALE), Ok(SETTLED_100G)]).failing_tare();
        let weight = WeighSession::new(true).run(&mut scale).unwrap();
        assert_eq!(weight.value, 100.0);
        assert_eq!(scale.tare_requests, vec![TARE_REPORT]);
    }

    #[test]
    fn successful_tare_sends_the_zero_report() {
        let mut scale = FakeScale::new(vec![Ok(STALE), Ok(STALE), Ok(SETTLED_100G)]);
        WeighSession::new(true).run(&mut scale).unwrap();
        assert_eq!(scale.tare_requests, vec![[0x02, 0x02]]);
    }

    #[test]
    fn no_tare_report_without_the_flag() {
        let mut scale = FakeScale::new(vec![Ok(STALE), Ok(STALE), Ok(SETTLED_100G)]);
        WeighSession::new(false).run(&mut scale).unwrap();
        assert!(scale.tare_requests.is_empty());
    }

    #[test]
    fn transfer_failure_in_the_loop_is_fatal() {
        let mut scale = FakeScale::new(vec![
            Ok(STALE),
            Ok(STALE),
            Ok(WEIGHING),
            Err(ScaleError::Transfer(rusb::Error::Io)),
        ]);
        let result = WeighSession::new(false).run(&mut scale);
        assert_eq!(result, Err(ScaleError::Transfer(rusb::Error::Io)));
    }

    #[test]
    fn timeout_ends_the_session() {
        // Three reads succeed (discards), then the scale goes silent.
        let mut scale = FakeScale::new(vec![Ok(STALE), Ok(STALE), Ok(WEIGHING)]);
        let result = WeighSession::new(false).run(&mut scale);
        assert_eq!(result, Err(ScaleError::Transfer(rusb::Error::Timeout)));
    }

    #[test]
    fn initial_discard_failure_is_tolerated() {
        // The unconditional first discard errors; the session recovers and
        // still settles.
        let mut scale = FakeScale::new(vec![
            Err(ScaleError::Transfer(rusb::Error::Pipe)),
            Ok(STALE),
            Ok(SETTLED_100G),
        ]);
        let weight = WeighSession::new(false).run(&mut scale).unwrap();
        assert_eq!(weight.value, 100.0);
    }

    #[test]
    fn extra_priming_reads_are_honored() {
        let mut scale = FakeScale::new(vec![
            Ok(STALE),
            Ok(STALE),
            Ok(STALE),
            Ok(STALE),
            Ok(SETTLED_100G),
        ]);
        let weight = WeighSession::new(false)
            .with_priming_reads(3)
            .run(&mut scale)
            .unwrap();
        assert_eq!(weight.value, 100.0);
    }

    #[test]
    fn transient_statuses_keep_the_loop_running() {
        let zeroed: [u8; WEIGH_REPORT_SIZE] = [0x03, 0x02, 0x02, 0x00, 0x00, 0x00];
        let under_zero: [u8; WEIGH_REPORT_SIZE] = [0x03, 0x05, 0x02, 0x00, 0x00, 0x00];
        let mut scale = FakeScale::new(vec![
            Ok(STALE),
            Ok(STALE),
            Ok(zeroed),
            Ok(WEIGHING),
            Ok(WEIGHING),
            Ok(under_zero),
            Ok(WEIGHING),
            Ok(SETTLED_100G),
        ]);
        let weight = WeighSession::new(false).run(&mut scale).unwrap();
        assert_eq!(weight.value, 100.0);
    }
}
