pub mod check;
pub mod completion;
pub mod config;
pub mod metrics;
pub mod pack;
pub mod show;
pub mod tree;
pub mod unpack;
