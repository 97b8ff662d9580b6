pub mod analyzer;
pub mod classifier;

pub use analyzer::FreshnessAnalyzer;
pub use classifier::{load_classifier, Classifier};
