// Adapters layer: concrete implementations of the domain ports (filesystem storage, console transport).

pub mod console;
pub mod storage;
