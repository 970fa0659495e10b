//! Target cloud provider selection
//!
//! The provider only influences the system instructions sent to the model
//! (default region and resource-group conventions) and the example request
//! shown in the input field.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    #[default]
    Aws,
    Azure,
    Google,
}

impl CloudProvider {
    pub fn label(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "AWS",
            CloudProvider::Azure => "Azure",
            CloudProvider::Google => "Google",
        }
    }

    /// Provider-specific conventions appended to the generation prompt.
    pub fn conventions(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "- For AWS, default to the 'us-east-1' region.",
            CloudProvider::Azure => "- For Azure, include a resource group.",
            CloudProvider::Google => {
                "- For Google, include a project and default to the 'us-central1' region."
            }
        }
    }

    /// Example request pre-filled in the input field.
    pub fn example_request(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "An S3 bucket for logging and a t3.small EC2 instance",
            CloudProvider::Azure => {
                "An Azure Storage Account and a Standard_B1s virtual machine"
            }
            CloudProvider::Google => {
                "A Google Cloud Storage bucket and an e2-micro compute engine instance"
            }
        }
    }

    /// Providers in selection order.
    pub fn all() -> [CloudProvider; 3] {
        [CloudProvider::Aws, CloudProvider::Azure, CloudProvider::Google]
    }

    /// The next provider in selection order, wrapping around.
    pub fn next(&self) -> CloudProvider {
        match self {
            CloudProvider::Aws => CloudProvider::Azure,
            CloudProvider::Azure => CloudProvider::Google,
            CloudProvider::Google => CloudProvider::Aws,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventions_mention_provider_defaults() {
        assert!(CloudProvider::Aws.conventions().contains("us-east-1"));
        assert!(CloudProvider::Azure.conventions().contains("resource group"));
        assert!(CloudProvider::Google.conventions().contains("us-central1"));
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut p = CloudProvider::Aws;
        for _ in 0..3 {
            p = p.next();
        }
        assert_eq!(p, CloudProvider::Aws);
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&CloudProvider::Azure).unwrap();
        assert_eq!(json, "\"azure\"");
        let back: CloudProvider = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CloudProvider::Azure);
    }
}
