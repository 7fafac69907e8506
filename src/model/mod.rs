mod common;
mod matches;
mod member;
mod stats;
mod sync;

pub use common::*;
pub use matches::*;
pub use member::*;
pub use stats::*;
pub use sync::*;
