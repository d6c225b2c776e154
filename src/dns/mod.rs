pub mod packet;
pub mod types;
