#[cfg(test)]
mod manager_tests;
