pub mod bridge_flow;
pub mod capture_flow;
pub mod relay_security;
