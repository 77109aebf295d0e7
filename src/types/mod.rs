// ABOUTME: Validated domain types shared by config, state, and provisioning steps.
// ABOUTME: Resource names, image references, and IPv4 address ranges.

mod cidr;
mod image_ref;
mod resource_name;

pub use cidr::{Ipv4Cidr, ParseCidrError};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use resource_name::{ResourceName, ResourceNameError};
