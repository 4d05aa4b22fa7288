pub mod health;
pub mod quota;
