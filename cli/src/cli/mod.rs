pub mod commands;
pub mod support;
