#![cfg(test)]

pub mod common;
pub mod http_tests;
pub mod lifecycle_tests;
