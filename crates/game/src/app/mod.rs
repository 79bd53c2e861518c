mod bootstrap;
mod config;
mod demo_world;
mod loop_runner;
mod persist;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
