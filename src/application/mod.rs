//! Application layer - DTOs, ports, and the services that orchestrate turns

pub mod dto;
pub mod ports;
pub mod services;
