pub mod intervals;
pub mod rhythm;

pub use intervals::{compute_intervals, mean_heart_rate, Intervals};
pub use rhythm::{classify_rhythm, rr_coefficient_of_variation, RhythmLabel};
