//! Pages and askama views served through the dispatcher.

pub mod pages;
pub mod views;
