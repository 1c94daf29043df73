pub mod identity;
pub mod resource;
pub mod response;
