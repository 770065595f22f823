pub mod data_access_facade;
pub mod solver_data;
