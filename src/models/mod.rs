pub mod domain;
pub mod dto;
pub mod prompt;
pub mod shape;
