//! Persona-configured Telegram companion.
//!
//! A companion is an LLM-backed chat persona bridged to Telegram. The
//! library provides the configuration model, the agent seam, and the output
//! interception layer (sanitization, free-tier quota, speech fan-out); the
//! binary wires them to a teloxide dispatcher.

pub mod companion;
pub mod config;
