pub use crate::app::App;
pub use vizallas_types::error::{ClResult, Error};
pub use vizallas_types::types::Timestamp;

pub use tracing::{debug, error, info, warn};

// vim: ts=4
