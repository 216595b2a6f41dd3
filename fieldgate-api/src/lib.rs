pub mod models;
pub mod protocols;
pub mod resource;

pub use models::*;
pub use resource::ResourceName;
