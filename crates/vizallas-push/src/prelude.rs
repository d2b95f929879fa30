pub use vizallas_core::prelude::*;

// vim: ts=4
