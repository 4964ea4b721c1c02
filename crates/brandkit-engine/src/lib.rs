pub mod archive;
pub mod brand;
pub mod captions;
pub mod config;
pub mod generation;
pub mod prompt;
pub mod session;
pub mod text;

mod util;

pub use config::{Pacing, ProfileThresholds, StudioConfig};
pub use session::Studio;
