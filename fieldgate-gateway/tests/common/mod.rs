#![allow(dead_code)]

pub mod fake_broker;
pub mod mock_app;
