pub mod decoder;
pub mod preprocess;

pub use decoder::{decode, Image, ImageSource};
pub use preprocess::{PreprocessedTensor, Preprocessor};
