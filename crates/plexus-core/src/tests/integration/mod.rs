#![cfg(test)]

pub mod common;
pub mod framework_tests;
pub mod plugins;
