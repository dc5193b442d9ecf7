mod bitmap;

pub use bitmap::*;
