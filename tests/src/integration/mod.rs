//! Cross-subsystem scenarios.

mod adapter_flow;
mod audit_flow;
mod credential_flow;
mod identity_flow;
mod role_flow;
