//! Tests for model declarations, parameter namespacing and line shapes

mod builder_tests;
mod shape_tests;
