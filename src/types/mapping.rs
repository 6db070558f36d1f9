// ABOUTME: Port mapping and volume mount declarations for platform services.
// ABOUTME: Parsed from compose-style "host:container" and "source:/path" strings.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseMappingError {
    #[error("expected \"host:container\", got \"{0}\"")]
    PortFormat(String),

    #[error("invalid port number: \"{0}\"")]
    PortNumber(String),

    #[error("expected \"source:/container/path\", got \"{0}\"")]
    VolumeFormat(String),

    #[error("container path must be absolute: \"{0}\"")]
    RelativeContainerPath(String),
}

/// Host port published to a container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    pub host_port: u16,
    pub container_port: u16,
}

impl PortMapping {
    pub fn parse(input: &str) -> Result<Self, ParseMappingError> {
        let (host, container) = input
            .trim()
            .split_once(':')
            .ok_or_else(|| ParseMappingError::PortFormat(input.to_string()))?;

        Ok(Self {
            host_port: parse_port(host)?,
            container_port: parse_port(container)?,
        })
    }
}

/// Parse a single port number, as used by `containerHttpPort`.
pub(crate) fn parse_port(input: &str) -> Result<u16, ParseMappingError> {
    input
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| ParseMappingError::PortNumber(input.to_string()))
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_port, self.container_port)
    }
}

/// Where a volume's data lives on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VolumeSource {
    /// Named volume managed by the platform.
    Named(String),
    /// Bind mount of an absolute host path.
    HostPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeMount {
    pub source: VolumeSource,
    pub container_path: String,
}

impl VolumeMount {
    pub fn parse(input: &str) -> Result<Self, ParseMappingError> {
        let (source, target) = input
            .trim()
            .split_once(':')
            .filter(|(source, target)| !source.is_empty() && !target.is_empty())
            .ok_or_else(|| ParseMappingError::VolumeFormat(input.to_string()))?;

        if !target.starts_with('/') {
            return Err(ParseMappingError::RelativeContainerPath(target.to_string()));
        }

        let source = if source.starts_with('/') {
            VolumeSource::HostPath(source.to_string())
        } else {
            VolumeSource::Named(source.to_string())
        };

        Ok(Self {
            source,
            container_path: target.to_string(),
        })
    }
}
