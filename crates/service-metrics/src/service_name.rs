use crate::MetricsError;
use prometheus_client::encoding::{EncodeLabelValue, LabelValueEncoder};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter, Write};
use std::str::FromStr;
use std::sync::Arc;

/// The name of the instrumented service, used as the `service` label on every metric.
///
/// Cloning is cheap; all clones share the same allocation.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ServiceName(Arc<str>);

impl ServiceName {
    /// Creates a new service name.
    ///
    /// ## Errors
    /// Returns [`MetricsError::EmptyServiceName`] if the name is empty or only whitespace.
    pub fn new<S: AsRef<str>>(name: S) -> Result<Self, MetricsError> {
        let name = name.as_ref();
        if name.trim().is_empty() {
            return Err(MetricsError::EmptyServiceName);
        }

        Ok(Self(Arc::from(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ServiceName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl EncodeLabelValue for ServiceName {
    fn encode(&self, encoder: &mut LabelValueEncoder) -> Result<(), std::fmt::Error> {
        encoder.write_str(self.as_str())
    }
}

impl FromStr for ServiceName {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceName::new(s)
    }
}

impl TryFrom<String> for ServiceName {
    type Error = MetricsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ServiceName::new(value)
    }
}

impl Serialize for ServiceName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServiceName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        ServiceName::new(s).map_err(de::Error::custom)
    }
}

impl PartialEq<&str> for ServiceName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str().eq(*other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_are_rejected() {
        assert!(matches!(
            ServiceName::new(""),
            Err(MetricsError::EmptyServiceName)
        ));
        assert!(matches!(
            ServiceName::new("  \t"),
            Err(MetricsError::EmptyServiceName)
        ));
    }

    #[test]
    fn parse_works() {
        let name: ServiceName = "orders".parse().expect("valid service name");
        assert_eq!(name, "orders");
        assert_eq!(name.to_string(), "orders");
    }

    #[test]
    fn deserialize_rejects_empty_name() {
        let valid: ServiceName = serde_yaml::from_str("orders").expect("Deserialization failed");
        assert_eq!(valid, "orders");

        let invalid: Result<ServiceName, _> = serde_yaml::from_str("''");
        assert!(invalid.is_err());
    }
}
