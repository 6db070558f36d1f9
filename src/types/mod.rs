// ABOUTME: Validated domain types shared by templates, deployment, and the API client.
// ABOUTME: Service names, image references, port mappings, and volume mounts.

mod image_ref;
mod mapping;
mod service_name;

pub use image_ref::{ImageRef, ParseImageRefError};
pub(crate) use mapping::parse_port;
pub use mapping::{ParseMappingError, PortMapping, VolumeMount, VolumeSource};
pub use service_name::{ServiceName, ServiceNameError};
