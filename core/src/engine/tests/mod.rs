//! Tests for the engine
//!
//! Organized by combinator / adapter

mod generator_tests;
mod helpers;
mod iter_for_tests;
