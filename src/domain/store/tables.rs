//! Names of the key-value tables shared with the collaborators.

pub const AVAILABLE_REGIONS_TABLE: &str = "available_regions_table";
pub const CARBON_REGION_TABLE: &str = "carbon_region_table";
pub const DATACENTER_REGION_TABLE: &str = "datacenter_region_table";
pub const PERFORMANCE_REGION_TABLE: &str = "performance_region_table";
pub const WORKFLOW_INSTANCE_TABLE: &str = "workflow_instance_table";
pub const DEPLOYMENT_MANAGER_RESOURCE_TABLE: &str = "deployment_manager_resource_table";
pub const DEPLOYMENT_MANAGER_WORKFLOW_INFO_TABLE: &str = "deployment_manager_workflow_info_table";
pub const WORKFLOW_PLACEMENT_SOLVER_STAGING_AREA_TABLE: &str = "workflow_placement_solver_staging_area_table";
pub const WORKFLOW_PLACEMENT_DECISION_TABLE: &str = "workflow_placement_decision_table";
