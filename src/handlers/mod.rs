pub mod pages;
pub mod student;
pub mod upload;
