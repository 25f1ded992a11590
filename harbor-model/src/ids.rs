use uuid::Uuid;

/// Unique id assigned to a resource when it is registered with the
/// notification channel. Rendered as `{name}-{suffix}` so log lines stay
/// readable while two registrations of the same name never collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ResourceId(String);

impl ResourceId {
    pub fn for_name(name: &str) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        ResourceId(format!("{name}-{}", &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceId;

    #[test]
    fn ids_carry_the_resource_name_and_differ() {
        let first = ResourceId::for_name("apiservice");
        let second = ResourceId::for_name("apiservice");

        assert!(first.as_str().starts_with("apiservice-"));
        assert_eq!(first.as_str().len(), "apiservice-".len() + 8);
        assert_ne!(first, second);
    }
}
