pub mod creation;
pub mod dto;
pub mod id;
pub mod lifecycle;
