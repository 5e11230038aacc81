pub mod config;
pub mod nuke;
pub mod publish;
pub mod purge;
pub mod run;
pub mod status;
pub mod subscribe;
