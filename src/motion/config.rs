// Motion search profiles.
//
// The reference profile uses the thresholds and attempt budget of the classic
// ZMBV encoder. Other profiles stay decodable by any ZMBV decoder but may pick
// different vectors.

/// Largest vector component the encoder ever emits.
pub const MAX_SEARCH_RADIUS: i32 = 10;

/// Tuning parameters for the per-block vector search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Name for display purposes.
    pub name: &'static str,
    /// Sampling step (both axes) of the coarse reject pass.
    pub coarse_stride: usize,
    /// Candidates whose coarse mismatch count reaches this are rejected, and a
    /// best score below it ends the search.
    pub threshold: usize,
    /// Full-resolution compares allowed per block.
    pub detailed_attempts: usize,
}

impl SearchConfig {
    /// Reference encoder behaviour.
    pub const REFERENCE: SearchConfig = SearchConfig {
        name: "reference",
        coarse_stride: 4,
        threshold: 4,
        detailed_attempts: 64,
    };

    /// Every coarse survivor gets a full compare.
    pub const EXHAUSTIVE: SearchConfig = SearchConfig {
        name: "exhaustive",
        coarse_stride: 4,
        threshold: 4,
        detailed_attempts: usize::MAX,
    };
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Look up a profile by name.
pub fn config_for_name(name: &str) -> Option<SearchConfig> {
    match name {
        "reference" => Some(SearchConfig::REFERENCE),
        "exhaustive" => Some(SearchConfig::EXHAUSTIVE),
        _ => None,
    }
}
