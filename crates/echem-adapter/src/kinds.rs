//! Command-kind enumeration for the electrochemistry instrument.

/// The four techniques this adapter knows how to run. Each has its own
/// parameter and outcome shape, carried through the engine's generic
/// `Params`/`Outcome` associated types as variants of [`crate::EchemParams`]
/// and [`crate::EchemOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EchemKind {
    OpenCircuitVoltage,
    ImpedanceSpectroscopy,
    CyclicVoltammetry,
    GalvanostaticCharge,
}

impl EchemKind {
    pub fn name(self) -> &'static str {
        match self {
            EchemKind::OpenCircuitVoltage => "open_circuit_voltage",
            EchemKind::ImpedanceSpectroscopy => "impedance_spectroscopy",
            EchemKind::CyclicVoltammetry => "cyclic_voltammetry",
            EchemKind::GalvanostaticCharge => "galvanostatic_charge",
        }
    }
}
