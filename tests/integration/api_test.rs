//! API endpoint integration tests
//!
//! Drives the full router in process: in-memory store, mock LLM, real JWT auth.

#![allow(dead_code)]

mod assignments;
mod common;
mod conversations;
mod messages;
mod stream;
mod transcripts;
