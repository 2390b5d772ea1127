//! Static configuration for omniforge

pub mod defaults;
