pub mod config;
pub mod facts;
pub mod fs_util;
pub mod gateway;
