pub mod model_download;

pub use model_download::{ensure_model, BootstrapError};
