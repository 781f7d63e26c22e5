//! Token models and the live session store.

pub mod session;
pub mod token;

pub use session::*;
pub use token::{record::*, secret::*};
