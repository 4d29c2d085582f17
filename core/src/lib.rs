pub mod dashboard;
pub mod error;
pub mod estimator;
pub mod local;
pub mod models;
pub mod port;
pub mod remote;

#[cfg(test)]
mod test_support;
