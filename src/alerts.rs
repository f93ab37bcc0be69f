pub mod classifier;

pub use classifier::{classify, display_type, AlertAppearance, SeverityTier};
