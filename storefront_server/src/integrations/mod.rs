pub mod momo;

pub use momo::{payment_result_from, MomoGateway};
