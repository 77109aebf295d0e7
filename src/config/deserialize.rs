// ABOUTME: Custom serde deserializers for config file fields.
// ABOUTME: Validates resource names, image references, ranges, and step lists.

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::types::{ImageRef, Ipv4Cidr, ResourceName};

pub fn deserialize_resource_name<'de, D>(deserializer: D) -> Result<Option<ResourceName>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| ResourceName::new(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_image_ref<'de, D>(deserializer: D) -> Result<Option<ImageRef>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| ImageRef::parse(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_cidr<'de, D>(deserializer: D) -> Result<Option<Ipv4Cidr>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|s| Ipv4Cidr::parse(&s).map_err(serde::de::Error::custom))
        .transpose()
}

pub fn deserialize_steps<'de, D>(deserializer: D) -> Result<Option<NonEmpty<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Vec<String>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(steps) => NonEmpty::from_vec(steps)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("steps list cannot be empty")),
    }
}
