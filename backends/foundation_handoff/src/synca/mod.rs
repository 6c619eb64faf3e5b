mod drops;
mod queue;
mod signals;
mod threads;

pub use drops::*;
pub use queue::*;
pub use signals::*;
pub use threads::*;
