pub mod app;
pub mod canvas;
pub mod channels;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod events;
pub mod experiment_log;
pub mod geometry;
pub mod grid;
pub mod protocol;
pub mod view;
// cmd and reports are binary modules (see main.rs).
