//! The device adapter contract.
//!
//! An adapter owns its wire-protocol state and is the only code in the
//! process allowed to talk to the physical device. The engine calls an
//! adapter exclusively from the worker thread and never interprets the
//! `Params`/`Outcome` types it carries — it only moves them around.

use crate::error::{EngineError, ExecuteOutcome};
use std::time::Duration;

/// Capability table a concrete device must provide.
///
/// `Kind` is the adapter's command-kind enumeration (commonly a plain
/// `enum` with a derived `Copy`). `Params` and `Outcome` carry whatever
/// shape each kind needs; cloning and dropping them is ordinary Rust
/// ownership, which is why there is no `create_params`/`free_params`/
/// `copy_result` trio here (see `DESIGN.md`).
pub trait DeviceAdapter: Send + Sync + 'static {
    type Kind: Copy + Eq + std::hash::Hash + Send + Sync + std::fmt::Debug + 'static;
    type Params: Clone + Send + 'static;
    type Outcome: Send + 'static;

    /// Open the underlying link. Called by the connection supervisor,
    /// never concurrently with `execute`.
    fn connect(&mut self) -> std::result::Result<(), EngineError>;

    /// Best-effort close; never reported as fatal.
    fn disconnect(&mut self);

    /// Active probe independent of the last command's result.
    fn test_liveness(&mut self) -> bool;

    /// Cheap snapshot, no I/O implied.
    fn is_connected(&self) -> bool;

    /// Perform one command. May block for as long as the device needs.
    /// The worker holds no internal lock while this runs.
    fn execute(&mut self, kind: Self::Kind, params: &Self::Params) -> ExecuteOutcome<Self::Outcome>;

    /// Stable, human-readable name for a kind. Must cover every variant
    /// up to the adapter's `COUNT` sentinel.
    fn name_of_kind(&self, kind: Self::Kind) -> &'static str;

    /// Sleep duration the worker should observe after a successful
    /// dispatch of this kind, before dequeuing the next command.
    fn cooldown_for_kind(&self, kind: Self::Kind) -> Duration {
        let _ = kind;
        Duration::ZERO
    }

    /// Whether this adapter can serve a kind while disconnected (e.g. a
    /// command that only touches local/cached state). Default: no kind
    /// is out-of-band; everything parks until reconnection.
    fn supports_raw(&self, kind: Self::Kind) -> bool {
        let _ = kind;
        false
    }

    /// Out-of-band execution path for kinds where `supports_raw` is
    /// true. Default implementation is unreachable in practice because
    /// the worker only calls it when `supports_raw` returned true.
    fn execute_raw(
        &mut self,
        kind: Self::Kind,
        params: &Self::Params,
    ) -> std::result::Result<ExecuteOutcome<Self::Outcome>, EngineError> {
        let _ = (kind, params);
        Err(EngineError::InvalidParameter(
            "adapter does not support raw execution".into(),
        ))
    }
}
