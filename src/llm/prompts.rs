use crate::provider::CloudProvider;

/// System instructions for drafting a configuration from a plain-language
/// request. The provider only changes the trailing conventions line.
pub fn generation_system(provider: CloudProvider) -> String {
    format!(
        r#"You are a Terraform code generation expert for {label}.
Generate a complete, valid, and secure Terraform HCL configuration based on the user's request.
The configuration must be a single block of HCL code.
Do not include any explanations, markdown, or text outside of the code block.
Use appropriate resource names and tags.
{conventions}"#,
        label = provider.label(),
        conventions = provider.conventions(),
    )
}

pub const CORRECTION_SYSTEM: &str = "You are a Terraform code correction expert. \
The user will provide HCL code and a validation error. Fix the code to resolve the error. \
Only return the complete, corrected HCL code block without explanations.";

/// User content for the correction request: the failing code and the
/// validator's own diagnostics, both already sanitized by the caller.
pub fn correction_request(code: &str, verdict_message: &str) -> String {
    format!(
        "**Terraform Code with Errors:**\n```hcl\n{}\n```\n\n**Validation Error:**\n```\n{}\n```\nPlease provide the corrected code.",
        code, verdict_message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_system_carries_provider_conventions() {
        let aws = generation_system(CloudProvider::Aws);
        assert!(aws.contains("AWS"));
        assert!(aws.contains("us-east-1"));

        let google = generation_system(CloudProvider::Google);
        assert!(google.contains("us-central1"));
    }

    #[test]
    fn test_correction_request_fences_both_sections() {
        let req = correction_request("resource \"x\" \"y\" {}", "Error: bad block");
        assert!(req.contains("```hcl\nresource \"x\" \"y\" {}\n```"));
        assert!(req.contains("Error: bad block"));
    }
}
