//! Error handling for the cache engine
//!
//! Every filesystem call site wraps its native error through [`io_error`],
//! so the operation name and path travel with the failure. A missing path is
//! matched at the call site and never becomes an error.

mod conversions;
mod recovery;
mod types;

pub use conversions::io_error;
pub use types::*;
