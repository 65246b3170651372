pub mod authenticating;
pub mod synthesize;
