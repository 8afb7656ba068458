use std::panic::Location;

use crate::diagnostics::{Diagnostics, ErrorPolicy, Guarded};
use crate::driver::Driver;
use crate::error::DriverError;

/// Owns the driver and the diagnostics context.
///
/// This type is the low-level rendering context handed to every component:
/// - forwards calls to the driver with error-queue bracketing
/// - applies the diagnostics policy to the outcome
/// - exposes the driver for inspection (tests, version queries)
pub struct Gpu<D: Driver> {
    driver: D,
    diagnostics: Diagnostics,
}

impl<D: Driver> Gpu<D> {
    /// Wraps a driver whose context is ready for use.
    pub fn new(mut driver: D, diagnostics: Diagnostics) -> Self {
        log::info!("graphics driver: {}", driver.version());
        log::debug!("diagnostics policy: {:?}", diagnostics.policy());
        Self {
            driver,
            diagnostics,
        }
    }

    /// Wraps a driver with log-backed diagnostics and the given policy.
    pub fn with_policy(driver: D, policy: ErrorPolicy) -> Self {
        Self::new(driver, Diagnostics::new(policy))
    }

    /// Issues `f` against the driver under the diagnostics policy.
    ///
    /// `call` names the wrapped call in diagnostics; the source location is
    /// taken from the caller.
    #[track_caller]
    pub fn call<T>(&mut self, call: &str, f: impl FnOnce(&mut D) -> T) -> Result<T, DriverError> {
        let location = Location::caller();
        let guarded = self.diagnostics.guard(&mut self.driver, call, location, f);
        self.diagnostics.settle(guarded)
    }

    /// Like `call`, but returns the raw failure signal regardless of policy.
    #[track_caller]
    pub fn probe<T>(&mut self, call: &str, f: impl FnOnce(&mut D) -> T) -> Guarded<T> {
        let location = Location::caller();
        self.diagnostics.guard(&mut self.driver, call, location, f)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.diagnostics.policy()
    }

    /// Unwraps the driver, dropping the diagnostics context.
    pub fn into_driver(self) -> D {
        self.driver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::driver::{RecordingDriver, error_code};

    #[test]
    fn call_reports_the_caller_location() {
        let sink = MemorySink::new();
        let mut gpu = Gpu::new(
            RecordingDriver::new(),
            Diagnostics::new(ErrorPolicy::LogAndContinue).with_sink(sink.clone()),
        );

        let line = line!() + 1;
        let res = gpu.call("glBindVertexArray", |gl| {
            gl.inject_error(error_code::INVALID_OPERATION)
        });

        assert!(res.is_ok());
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location.line(), line);
        assert_eq!(records[0].location.file(), file!());
    }

    #[test]
    fn strict_policy_returns_the_error() {
        let mut gpu = Gpu::new(
            RecordingDriver::new(),
            Diagnostics::new(ErrorPolicy::AbortOnError).with_sink(MemorySink::new()),
        );
        let err = gpu
            .call("glClear", |gl| gl.inject_error(error_code::INVALID_VALUE))
            .unwrap_err();
        assert_eq!(err.call, "glClear");
    }

    #[test]
    fn policy_changes_through_the_diagnostics_context() {
        let mut gpu = Gpu::new(
            RecordingDriver::new(),
            Diagnostics::new(ErrorPolicy::LogAndContinue).with_sink(MemorySink::new()),
        );
        gpu.diagnostics_mut().set_policy(ErrorPolicy::AbortOnError);
        assert_eq!(gpu.policy(), ErrorPolicy::AbortOnError);

        let res = gpu.call("glClear", |gl| gl.inject_error(error_code::INVALID_VALUE));
        assert!(res.is_err());
        assert_eq!(gpu.diagnostics().reported(), 1);

        // Everything pending was drained by the call.
        let mut driver = gpu.into_driver();
        assert_eq!(driver.get_error(), error_code::NO_ERROR);
    }

    #[test]
    fn probe_ignores_policy() {
        let mut gpu = Gpu::new(
            RecordingDriver::new(),
            Diagnostics::new(ErrorPolicy::LogAndContinue).with_sink(MemorySink::new()),
        );
        let guarded = gpu.probe("glClear", |gl| gl.inject_error(error_code::INVALID_VALUE));
        assert!(!guarded.is_clean());
    }
}
