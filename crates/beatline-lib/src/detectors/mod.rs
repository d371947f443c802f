pub mod ecg;
pub mod segment;

pub use ecg::{detect_r_peaks, refractory_samples};
pub use segment::{segment_beat, segment_beats, BeatContext, BeatSegments, Segment};
