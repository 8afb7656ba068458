use std::fmt;
use std::panic::Location;

use crate::driver::{Driver, error_code};
use crate::error::DriverError;

use super::{Diagnostic, DiagnosticSink, LogSink};

/// Upper bound on error-queue pops per drain.
///
/// A lost context may keep reporting errors indefinitely.
const MAX_DRAIN: usize = 64;

/// What a wrapped call does when the driver reported errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum ErrorPolicy {
    /// Report and hand the call's value back; execution continues.
    #[default]
    LogAndContinue,
    /// Report, then escalate the first error to the caller.
    AbortOnError,
}

/// Result of a guarded call before the policy is applied.
#[derive(Debug)]
pub struct Guarded<T> {
    pub value: T,
    /// First error drained after the call, if any.
    pub failure: Option<DriverError>,
}

impl<T> Guarded<T> {
    pub fn is_clean(&self) -> bool {
        self.failure.is_none()
    }

    /// Converts into a result regardless of policy.
    pub fn into_result(self) -> Result<T, DriverError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}

/// Diagnostics context: error-queue bracketing plus the reporting policy.
pub struct Diagnostics {
    policy: ErrorPolicy,
    sink: Box<dyn DiagnosticSink>,
    reported: u64,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("policy", &self.policy)
            .field("reported", &self.reported)
            .finish_non_exhaustive()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(ErrorPolicy::default())
    }
}

impl Diagnostics {
    /// Creates a context reporting through `LogSink`.
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            sink: Box::new(LogSink),
            reported: 0,
        }
    }

    /// Replaces the sink.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ErrorPolicy) {
        self.policy = policy;
    }

    /// Total diagnostics delivered to the sink.
    pub fn reported(&self) -> u64 {
        self.reported
    }

    /// Runs `f` with a clean error queue and reports what it left behind.
    pub fn guard<D, T>(
        &mut self,
        driver: &mut D,
        call: &str,
        location: &'static Location<'static>,
        f: impl FnOnce(&mut D) -> T,
    ) -> Guarded<T>
    where
        D: Driver + ?Sized,
    {
        let stale = drain(driver);
        if !stale.is_empty() {
            log::trace!("discarded {} stale driver error(s) before {call}", stale.len());
        }

        let value = f(driver);

        let mut failure = None;
        for code in drain(driver) {
            let diagnostic = Diagnostic {
                call: call.to_string(),
                code,
                location,
            };
            self.sink.report(&diagnostic);
            self.reported += 1;
            if failure.is_none() {
                failure = Some(DriverError::from(diagnostic));
            }
        }

        Guarded { value, failure }
    }

    /// Applies the policy to a guarded result.
    pub fn settle<T>(&self, guarded: Guarded<T>) -> Result<T, DriverError> {
        match (self.policy, guarded.failure) {
            (ErrorPolicy::AbortOnError, Some(err)) => Err(err),
            _ => Ok(guarded.value),
        }
    }
}

fn drain<D: Driver + ?Sized>(driver: &mut D) -> Vec<u32> {
    let mut codes = Vec::new();
    for _ in 0..MAX_DRAIN {
        match driver.get_error() {
            error_code::NO_ERROR => break,
            code => codes.push(code),
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::driver::{RecordingDriver, error_code};

    #[test]
    fn stale_errors_are_cleared_before_the_call() {
        let mut gl = RecordingDriver::new();
        gl.inject_error(error_code::INVALID_ENUM);

        let sink = MemorySink::new();
        let mut diag = Diagnostics::new(ErrorPolicy::LogAndContinue).with_sink(sink.clone());
        let guarded = diag.guard(&mut gl, "noop", Location::caller(), |_| ());

        assert!(guarded.is_clean());
        assert!(sink.is_empty());
    }

    #[test]
    fn every_pending_code_is_reported_with_call_and_location() {
        let mut gl = RecordingDriver::new();
        let sink = MemorySink::new();
        let mut diag = Diagnostics::new(ErrorPolicy::LogAndContinue).with_sink(sink.clone());

        let here = Location::caller();
        let guarded = diag.guard(&mut gl, "glDrawArrays", here, |gl| {
            gl.inject_error(error_code::INVALID_OPERATION);
            gl.inject_error(error_code::OUT_OF_MEMORY);
            7
        });

        assert_eq!(guarded.value, 7);
        let failure = guarded.failure.as_ref().unwrap();
        assert_eq!(failure.code, error_code::INVALID_OPERATION);
        assert_eq!(failure.call, "glDrawArrays");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].code, error_code::OUT_OF_MEMORY);
        assert_eq!(records[0].location, here);
        assert_eq!(diag.reported(), 2);
    }

    #[test]
    fn log_and_continue_keeps_the_value() {
        let mut gl = RecordingDriver::new();
        let mut diag = Diagnostics::new(ErrorPolicy::LogAndContinue).with_sink(MemorySink::new());
        let guarded = diag.guard(&mut gl, "x", Location::caller(), |gl| {
            gl.inject_error(error_code::INVALID_VALUE);
            "value"
        });
        assert_eq!(diag.settle(guarded).unwrap(), "value");
    }

    #[test]
    fn abort_on_error_escalates() {
        let mut gl = RecordingDriver::new();
        let mut diag = Diagnostics::new(ErrorPolicy::AbortOnError).with_sink(MemorySink::new());
        let guarded = diag.guard(&mut gl, "x", Location::caller(), |gl| {
            gl.inject_error(error_code::INVALID_VALUE);
        });
        let err = diag.settle(guarded).unwrap_err();
        assert_eq!(err.code, error_code::INVALID_VALUE);
    }

    #[test]
    fn into_result_ignores_the_policy() {
        let mut gl = RecordingDriver::new();
        let mut diag = Diagnostics::new(ErrorPolicy::LogAndContinue).with_sink(MemorySink::new());

        let clean = diag.guard(&mut gl, "x", Location::caller(), |_| 3);
        assert_eq!(clean.into_result().unwrap(), 3);

        let failed = diag.guard(&mut gl, "x", Location::caller(), |gl| {
            gl.inject_error(error_code::OUT_OF_MEMORY);
        });
        assert_eq!(failed.into_result().unwrap_err().code, error_code::OUT_OF_MEMORY);
    }

    #[test]
    fn policy_can_be_switched_at_runtime() {
        let mut gl = RecordingDriver::new();
        let mut diag = Diagnostics::default().with_sink(MemorySink::new());
        assert_eq!(diag.policy(), ErrorPolicy::LogAndContinue);

        diag.set_policy(ErrorPolicy::AbortOnError);
        let guarded = diag.guard(&mut gl, "x", Location::caller(), |gl| {
            gl.inject_error(error_code::INVALID_ENUM);
        });
        assert!(diag.settle(guarded).is_err());
    }

    #[test]
    fn drain_is_bounded() {
        let mut gl = RecordingDriver::new();
        for _ in 0..(MAX_DRAIN + 10) {
            gl.inject_error(error_code::INVALID_ENUM);
        }
        assert_eq!(drain(&mut gl).len(), MAX_DRAIN);
        assert_eq!(gl.pending_errors(), 10);
    }
}
