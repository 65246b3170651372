pub mod common;

mod client_flow;
