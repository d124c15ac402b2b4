//! Network module for packet interception and shaping.
//!
//! This module contains components for capturing, rate limiting and
//! reinjecting network traffic using WinDivert.

pub mod core;
pub mod processing;
pub mod shaping;
