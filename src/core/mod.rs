pub mod adapter;
pub mod controller;
pub mod error;
pub mod persona;
