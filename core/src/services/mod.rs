pub mod cleanup;
pub mod log;
pub mod timer;
