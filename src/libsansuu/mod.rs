pub mod bank;
pub mod error;
pub mod review;
pub mod session;
pub mod shitsumon;
