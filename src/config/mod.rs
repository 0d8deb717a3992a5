pub mod sense;

pub use sense::SenseConfig;
