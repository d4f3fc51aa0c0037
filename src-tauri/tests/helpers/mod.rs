// Each integration test binary pulls in the helpers it needs.
#![allow(dead_code)]

pub mod fakes;
pub mod polling;
