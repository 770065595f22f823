pub mod event_dto;
pub mod table_dto;
pub mod workflow_config_dto;
