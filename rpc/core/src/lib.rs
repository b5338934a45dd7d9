pub mod api;
pub mod model;

pub use api::ChainApi;
pub use model::*;
