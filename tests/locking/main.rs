//! Lock protocol integration tests.
//!
//! Exercises acquisition, retry timing, cancellation and handle semantics
//! against in-memory and scripted stores.

mod acquire;
