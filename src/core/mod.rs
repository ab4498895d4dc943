pub mod command;
pub mod job;
