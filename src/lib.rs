pub mod db;
pub mod grade;
pub mod ipc;
pub mod store;
