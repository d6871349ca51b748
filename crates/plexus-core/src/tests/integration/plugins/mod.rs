#![cfg(test)]

pub mod discovery;
pub mod lifecycle;
pub mod services;
