use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::workflow_config_dto::ProviderRegionDto;
use crate::error::Error;

/// A provider-qualified region, written `"<provider>:<region>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region {
    pub provider: String,
    pub region: String,
}

impl Region {
    pub fn new(provider: impl Into<String>, region: impl Into<String>) -> Self {
        Region { provider: provider.into(), region: region.into() }
    }

    /// Key used by every region-keyed table.
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn to_dto(&self) -> ProviderRegionDto {
        ProviderRegionDto { provider: self.provider.clone(), region: self.region.clone() }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.region)
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(':') {
            Some((provider, region)) if !provider.is_empty() && !region.is_empty() => Ok(Region::new(provider, region)),
            _ => Err(Error::InvalidParameter(format!("'{}' is not of the form <provider>:<region>", value))),
        }
    }
}

impl From<&ProviderRegionDto> for Region {
    fn from(dto: &ProviderRegionDto) -> Self {
        Region::new(dto.provider.clone(), dto.region.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_key_round_trip() {
        let region: Region = "aws:eu-central-1".parse().unwrap();
        assert_eq!(region, Region::new("aws", "eu-central-1"));
        assert_eq!(region.key(), "aws:eu-central-1");
    }

    #[test]
    fn test_region_rejects_malformed_keys() {
        assert!("eu-central-1".parse::<Region>().is_err());
        assert!(":eu-central-1".parse::<Region>().is_err());
        assert!("aws:".parse::<Region>().is_err());
    }
}
