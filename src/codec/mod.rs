pub mod h265;

// Re-export common types
pub use h265::{SequenceParameterSetInfo, SequenceParser};
