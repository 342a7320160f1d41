#![allow(dead_code)]

pub mod schedule;
pub mod world;
