//! Assembly pipeline, rule tables, and the checks run over finished scripts.

pub mod archive;
pub mod assembler;
#[cfg(feature = "batch")]
pub mod batch;
pub mod components;
pub mod config;
pub mod context;
pub mod enforcer;
pub mod episodes;
pub mod extraction;
pub mod pipeline;
pub mod rules;
pub mod tracker;
pub mod validator;
