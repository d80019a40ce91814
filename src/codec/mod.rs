pub mod h264;

pub use h264::{classify, is_header, NalHeader, Observer};
