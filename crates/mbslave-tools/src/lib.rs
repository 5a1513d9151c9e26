//! Shared helpers for the mbslave command line tools.

#![forbid(unsafe_code)]

pub mod common;
