//! Tests for the Levenberg-Marquardt solver on plain least-squares problems

mod lm_tests;
