use crate::error::{ModelError, Result};

/// Endpoint declared on a resource. Once the host allocates it, the endpoint
/// is reachable on `localhost` at the declared port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EndpointSpec {
    name: String,
    scheme: String,
    port: u16,
    is_internal: bool,
}

impl EndpointSpec {
    pub fn new(
        name: impl Into<String>,
        scheme: impl Into<String>,
        port: u16,
    ) -> Result<Self> {
        let name = name.into();
        let scheme = scheme.into().to_ascii_lowercase();

        if name.is_empty() {
            return Err(ModelError::InvalidEndpoint {
                name,
                reason: "endpoint name must not be empty",
            });
        }
        if scheme.is_empty()
            || !scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(ModelError::InvalidEndpoint {
                name,
                reason: "scheme must be a valid URL scheme",
            });
        }
        if port == 0 {
            return Err(ModelError::InvalidEndpoint {
                name,
                reason: "port must be non-zero",
            });
        }

        Ok(Self {
            name,
            scheme,
            port,
            is_internal: false,
        })
    }

    /// Marks the endpoint as only reachable from inside the host network.
    pub fn internal(mut self) -> Self {
        self.is_internal = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_internal(&self) -> bool {
        self.is_internal
    }

    pub fn allocated_url(&self) -> String {
        format!("{}://localhost:{}", self.scheme, self.port)
    }
}
