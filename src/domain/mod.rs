//! Domain types: model hierarchy, renderable values, display locales.

pub mod locale;
pub mod types;
pub mod value;
