pub mod remote_table;
pub mod tables;
