mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::SyntheticBackend;
pub use result::FrameDetection;
