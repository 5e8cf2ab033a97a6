//! End-to-end scenarios over small but realistic architecture descriptions.

mod alu;
mod encoding;
mod resources;
