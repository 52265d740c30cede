// src/config/mod.rs
pub mod digest;
