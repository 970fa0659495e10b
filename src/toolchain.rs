//! Terraform toolchain provisioning
//!
//! Downloads a pinned terraform release for the host platform, unpacks it
//! into the per-user data directory, and caches the absolute executable path
//! for the process lifetime. The cache is explicitly invalidatable so a
//! deleted binary can be re-provisioned, and settable so tests (and the
//! `--terraform-bin` override) can substitute a path without touching the
//! network.

use anyhow::{Context, Result};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// Pinned release; bumped deliberately, not tracked automatically.
pub const TERRAFORM_VERSION: &str = "1.8.5";

static RESOLVED: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

fn cache() -> &'static Mutex<Option<PathBuf>> {
    RESOLVED.get_or_init(|| Mutex::new(None))
}

/// Absolute path to a terraform executable, downloading and unpacking the
/// pinned release on first call. Subsequent calls return the cached path as
/// long as the file still exists.
pub async fn resolve() -> Result<PathBuf> {
    if let Ok(guard) = cache().lock() {
        if let Some(path) = guard.as_ref() {
            if path.is_file() {
                return Ok(path.clone());
            }
        }
    }

    let path = ensure_installed().await?;
    if let Ok(mut guard) = cache().lock() {
        *guard = Some(path.clone());
    }
    Ok(path)
}

/// Forget the cached executable path. The next `resolve` re-checks the
/// filesystem and re-downloads if needed.
pub fn invalidate() {
    if let Ok(mut guard) = cache().lock() {
        *guard = None;
    }
}

/// Substitute an already-provisioned executable (CLI override, tests).
pub fn set_resolved(path: PathBuf) {
    if let Ok(mut guard) = cache().lock() {
        *guard = Some(path);
    }
}

/// Peek at the cached path without provisioning.
pub fn resolved() -> Option<PathBuf> {
    cache().lock().ok().and_then(|guard| guard.clone())
}

fn executable_name() -> &'static str {
    if cfg!(windows) {
        "terraform.exe"
    } else {
        "terraform"
    }
}

fn install_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Could not determine data directory")?;
    Ok(base
        .join("terranaut")
        .join(format!("terraform_{}", TERRAFORM_VERSION)))
}

/// Map the host platform onto HashiCorp's release artifact naming.
fn platform_artifact(version: &str) -> Result<String> {
    let os = match std::env::consts::OS {
        "linux" => "linux",
        "macos" => "darwin",
        "windows" => "windows",
        other => anyhow::bail!("Unsupported operating system for terraform: {}", other),
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => anyhow::bail!("Unsupported architecture for terraform: {}", other),
    };
    Ok(format!("terraform_{}_{}_{}.zip", version, os, arch))
}

fn release_url(version: &str) -> Result<String> {
    Ok(format!(
        "https://releases.hashicorp.com/terraform/{}/{}",
        version,
        platform_artifact(version)?
    ))
}

async fn ensure_installed() -> Result<PathBuf> {
    let dir = install_dir()?;
    let exe = dir.join(executable_name());
    if exe.is_file() {
        return Ok(exe);
    }

    let url = release_url(TERRAFORM_VERSION)?;
    let client = reqwest::Client::builder()
        .user_agent(format!("terranaut/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to download terraform from {}", url))?
        .error_for_status()
        .with_context(|| format!("Terraform release not available at {}", url))?;

    let bytes = response
        .bytes()
        .await
        .context("Failed to read terraform release archive")?;

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes.as_ref()))
        .context("Terraform release archive is not a valid zip")?;
    archive
        .extract(&dir)
        .with_context(|| format!("Failed to unpack terraform into {}", dir.display()))?;

    if !exe.is_file() {
        anyhow::bail!(
            "Terraform archive did not contain the expected executable: {}",
            exe.display()
        );
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&exe)
            .with_context(|| format!("Failed to stat {}", exe.display()))?
            .permissions()
            .mode();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(mode | 0o111))
            .with_context(|| format!("Failed to mark {} executable", exe.display()))?;
    }

    Ok(exe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_artifact_shape() {
        let artifact = platform_artifact("1.8.5").unwrap();
        assert!(artifact.starts_with("terraform_1.8.5_"));
        assert!(artifact.ends_with(".zip"));
    }

    #[test]
    fn test_release_url_points_at_hashicorp() {
        let url = release_url("1.8.5").unwrap();
        assert!(url.starts_with("https://releases.hashicorp.com/terraform/1.8.5/"));
    }

    #[test]
    fn test_set_and_invalidate_cached_path() {
        let fake = PathBuf::from("/tmp/fake-terraform");
        set_resolved(fake.clone());
        assert_eq!(resolved(), Some(fake));
        invalidate();
        assert_eq!(resolved(), None);
    }
}
