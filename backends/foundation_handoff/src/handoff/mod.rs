mod consumer;
mod envelope;
mod pipeline;
mod producer;

pub use consumer::*;
pub use envelope::*;
pub use pipeline::*;
pub use producer::*;
