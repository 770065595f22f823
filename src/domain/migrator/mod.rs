pub mod deployment_migrator;
pub mod redeploy;
