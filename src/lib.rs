//! Progressive wavefront path tracer. Each frame is a fixed sequence of
//! compute stages over double-buffered ray sets, run on the host thread pool
//! or on a wgpu device.

pub mod accel;
pub mod config;
pub mod device;
pub mod domain;
pub mod error;
pub mod integrator;
pub mod kernels;
pub mod math;
pub mod render;
