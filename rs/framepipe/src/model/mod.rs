mod frame;
mod time_base;
mod timestamp;

pub use frame::*;
pub use time_base::*;
pub use timestamp::*;
