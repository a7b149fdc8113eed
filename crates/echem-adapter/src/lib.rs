//! Worked-example `DeviceAdapter` for an electrochemistry instrument:
//! open-circuit voltage, impedance spectroscopy, cyclic voltammetry,
//! and galvanostatic charge. Exists only to exercise the adapter
//! contract end to end; the physics are illustrative.

mod adapter;
mod kinds;
mod outcome;
mod params;
mod technique;

pub use adapter::{EchemAdapter, EchemLink, LoopbackLink};
pub use kinds::EchemKind;
pub use outcome::{EchemOutcome, ImpedancePoint};
pub use params::EchemParams;
