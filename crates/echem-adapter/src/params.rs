//! Per-technique parameters, wrapped in one enum so the adapter's
//! `Params` associated type stays a single concrete type.

#[derive(Debug, Clone)]
pub enum EchemParams {
    OpenCircuitVoltage { settle_time_ms: u32 },
    ImpedanceSpectroscopy {
        start_freq_hz: f64,
        end_freq_hz: f64,
        points: u32,
    },
    CyclicVoltammetry {
        start_v: f64,
        vertex_v: f64,
        scan_rate_mv_s: f64,
        cycles: u32,
    },
    GalvanostaticCharge {
        current_a: f64,
        cutoff_voltage_v: f64,
        max_duration_s: u32,
    },
}
