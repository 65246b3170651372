pub mod executor;
pub mod reqwest_executor;
