pub mod quota;
pub mod subscription;
