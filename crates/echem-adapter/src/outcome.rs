//! Per-technique results, wrapped in one enum mirroring [`crate::EchemParams`].

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpedancePoint {
    pub freq_hz: f64,
    pub real_ohm: f64,
    pub imag_ohm: f64,
}

#[derive(Debug, Clone)]
pub enum EchemOutcome {
    OpenCircuitVoltage {
        voltage_v: f64,
    },
    ImpedanceSpectroscopy {
        points: Vec<ImpedancePoint>,
    },
    CyclicVoltammetry {
        peak_current_a: f64,
        peak_voltage_v: f64,
    },
    GalvanostaticCharge {
        final_voltage_v: f64,
        elapsed_s: u32,
    },
}
