//! Shared fixtures for the unit tests: event builders, scripted streams and
//! recording doubles for the time and shutdown seams.
mod common;
mod mock;

pub(crate) use common::*;
pub(crate) use mock::*;
