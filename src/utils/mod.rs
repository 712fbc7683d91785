pub mod clock;
pub mod resource;
