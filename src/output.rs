//! Result summary of a successful compression run.

use serde::{Deserialize, Serialize};

/// What a completed run achieved. Serialisable so front-ends (and the CLI's
/// `--json` mode) can render it however they like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionReport {
    /// Strategy label, e.g. "lossless cleanup".
    pub strategy: String,
    /// Size of the input document in bytes.
    pub input_bytes: u64,
    /// Size of the produced document in bytes.
    pub output_bytes: u64,
    /// Wall-clock duration of the whole run.
    pub duration_ms: u64,
}

impl CompressionReport {
    /// Size reduction as a percentage of the input; negative when the
    /// "compressed" output grew.
    pub fn savings_percent(&self) -> f64 {
        if self.input_bytes == 0 {
            return 0.0;
        }
        let input = self.input_bytes as f64;
        (input - self.output_bytes as f64) / input * 100.0
    }
}
