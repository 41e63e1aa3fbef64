pub mod credit;
pub mod translation;
