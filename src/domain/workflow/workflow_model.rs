use crate::domain::workflow::dag::Dag;
use crate::domain::workflow::indexer::{InstanceIndexer, RegionIndexer};
use crate::domain::workflow::region::Region;
use crate::domain::workflow::workflow_config::WorkflowConfig;
use crate::error::{Error, Result};

/// Region index per instance index.
pub type Deployment = Vec<usize>;

/// Index-based view of one workflow, shared read-only by every solver component.
#[derive(Debug, Clone)]
pub struct WorkflowModel {
    pub config: WorkflowConfig,
    pub instances: InstanceIndexer,
    pub regions: RegionIndexer,
    region_list: Vec<Region>,
    pub dag: Dag,
    pub entry_point: usize,
    pub home_region: usize,
    /// Sorted region indices per instance.
    permitted: Vec<Vec<usize>>,
    /// MB, addressed `[instance][region]`.
    memory_mb: Vec<Vec<f64>>,
}

impl WorkflowModel {
    /// Indexes instances and regions, builds the DAG and resolves the permitted
    /// regions of every instance against `available_regions`.
    ///
    /// The home region is always indexed first, so its index is `0`.
    pub fn build(config: WorkflowConfig, available_regions: &[Region]) -> Result<Self> {
        let instances = InstanceIndexer::new(config.instances.iter().map(|instance| instance.name.id.clone()));

        let mut region_list = vec![config.home_region.clone()];
        for region in available_regions {
            if !region_list.contains(region) {
                region_list.push(region.clone());
            }
        }
        let regions = RegionIndexer::new(region_list.iter().map(Region::key));

        let mut edges = Vec::new();
        for (from, to) in config.edges() {
            edges.push((instances.value_to_index(&from)?, instances.value_to_index(&to)?));
        }
        let dag = Dag::new(&instances, &edges)?;
        let entry_point = instances.value_to_index(&config.entry_point)?;

        let mut permitted = Vec::with_capacity(instances.len());
        let mut memory_mb = Vec::with_capacity(instances.len());
        for instance in instances.indices() {
            let name = &config.instances[instance].name;
            let allowed = config.permitted_regions(instance, &region_list);
            if allowed.is_empty() {
                return Err(Error::ConfigInvalid(format!("instance '{}' has no permitted region", name)));
            }
            if !allowed.contains(&config.home_region) {
                return Err(Error::ConfigInvalid(format!("home region {} is not permitted for instance '{}'", config.home_region, name)));
            }

            let mut indices = allowed.iter().map(|region| regions.region_index(region)).collect::<Result<Vec<_>>>()?;
            indices.sort_unstable();
            permitted.push(indices);

            memory_mb.push(region_list.iter().map(|region| config.memory_mb(instance, &region.provider)).collect());
        }

        Ok(WorkflowModel { config, instances, regions, region_list, dag, entry_point, home_region: 0, permitted, memory_mb })
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn region_count(&self) -> usize {
        self.region_list.len()
    }

    pub fn region(&self, index: usize) -> &Region {
        &self.region_list[index]
    }

    pub fn instance_name(&self, instance: usize) -> &str {
        self.config.instances[instance].name.as_str()
    }

    pub fn permitted_regions(&self, instance: usize) -> &[usize] {
        &self.permitted[instance]
    }

    pub fn is_permitted(&self, instance: usize, region: usize) -> bool {
        self.permitted[instance].binary_search(&region).is_ok()
    }

    pub fn is_valid_deployment(&self, deployment: &[usize]) -> bool {
        deployment.len() == self.instance_count() && deployment.iter().enumerate().all(|(instance, &region)| self.is_permitted(instance, region))
    }

    pub fn home_deployment(&self) -> Deployment {
        vec![self.home_region; self.instance_count()]
    }

    /// Regions every instance may run in, in index order.
    pub fn regions_permitted_for_all(&self) -> Vec<usize> {
        (0..self.region_count()).filter(|&region| self.instances.indices().all(|instance| self.is_permitted(instance, region))).collect()
    }

    pub fn memory_mb(&self, instance: usize, region: usize) -> f64 {
        self.memory_mb[instance][region]
    }
}
