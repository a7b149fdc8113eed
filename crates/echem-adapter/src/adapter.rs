//! The `DeviceAdapter` implementation itself. Talking
//! to the real instrument means exchanging frames over the
//! manufacturer's wire protocol, which is out of scope here; `link`
//! stands in for that transport.

use crate::kinds::EchemKind;
use crate::outcome::EchemOutcome;
use crate::params::EchemParams;
use crate::technique;
use benchqueue_core::{DeviceAdapter, EngineError, ExecuteOutcome};
use std::time::Duration;
use tracing::trace;

/// The transport boundary a real implementation would fill in with the
/// instrument's actual wire protocol library. Kept minimal and
/// in-process here since that library is out of scope for this crate.
pub trait EchemLink: Send + Sync {
    fn open(&mut self) -> Result<(), String>;
    fn close(&mut self);
    fn ping(&mut self) -> bool;
}

/// A link that never fails to open and always reports alive, standing
/// in for a real instrument so the adapter contract can be exercised
/// end to end without hardware.
#[derive(Default)]
pub struct LoopbackLink {
    open: bool,
}

impl EchemLink for LoopbackLink {
    fn open(&mut self) -> Result<(), String> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn ping(&mut self) -> bool {
        self.open
    }
}

pub struct EchemAdapter<L: EchemLink = LoopbackLink> {
    link: L,
    connected: bool,
}

impl<L: EchemLink> EchemAdapter<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            connected: false,
        }
    }
}

impl EchemAdapter<LoopbackLink> {
    pub fn loopback() -> Self {
        Self::new(LoopbackLink::default())
    }
}

impl<L: EchemLink + 'static> DeviceAdapter for EchemAdapter<L> {
    type Kind = EchemKind;
    type Params = EchemParams;
    type Outcome = EchemOutcome;

    fn connect(&mut self) -> Result<(), EngineError> {
        self.link
            .open()
            .map_err(EngineError::InvalidParameter)?;
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.link.close();
        self.connected = false;
    }

    fn test_liveness(&mut self) -> bool {
        self.link.ping()
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn execute(&mut self, kind: Self::Kind, params: &Self::Params) -> ExecuteOutcome<Self::Outcome> {
        if !self.link.ping() {
            self.connected = false;
            return ExecuteOutcome::LinkFailure;
        }

        match technique::run(kind, params, |step, total| {
            trace!(technique = kind.name(), step, total, "technique step");
        }) {
            Ok(outcome) => ExecuteOutcome::Success(outcome),
            Err(message) => ExecuteOutcome::CommandFailed(message),
        }
    }

    fn name_of_kind(&self, kind: Self::Kind) -> &'static str {
        kind.name()
    }

    fn cooldown_for_kind(&self, kind: Self::Kind) -> Duration {
        match kind {
            // The potentiostat needs a moment to relax between sweeps.
            EchemKind::ImpedanceSpectroscopy => Duration::from_millis(50),
            EchemKind::CyclicVoltammetry => Duration::from_millis(20),
            _ => Duration::ZERO,
        }
    }
}
