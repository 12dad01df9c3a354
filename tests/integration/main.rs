//! Integration tests for edge-kelly

mod config_test;
mod kelly_test;
mod validator_test;
