// Library entry for the host crate: oracle transport, configuration and the
// text front-end around `qfleet_core`. Integration tests and the `qfleet`
// binary depend on it as a library.

pub mod config;
pub mod game;
pub mod network;
pub mod network_protocol;
pub mod remote_oracle;
pub mod visualize;
