//! Host-side credential capability.
//!
//! The application never owns the API key. It asks the host whether a key is
//! selected, asks the host to run its selection flow, and reads the key only
//! at the moment a provider handle is built.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Key-selection capability provided by the environment the app runs in.
#[async_trait]
pub trait KeyCapability: Send + Sync {
    /// Whether a usable credential is currently selected.
    async fn has_selected_key(&self) -> bool;

    /// Runs the host's interactive selection flow. Completion says nothing
    /// about the outcome; callers re-check with [`has_selected_key`].
    ///
    /// [`has_selected_key`]: KeyCapability::has_selected_key
    async fn open_key_selection(&self) -> Result<()>;

    /// The credential itself, read fresh on every call.
    async fn selected_key(&self) -> Option<String>;
}

const KEY_FILE_TEMPLATE: &str = "\
# Paste your Gemini API key on the first non-comment line, save, then press
# \"Select API Key\" again. Billing must be enabled on the Google Cloud project:
# https://ai.google.dev/gemini-api/docs/billing
";

/// Resolves the key from an environment variable, then from a key file.
#[derive(Debug, Clone, Default)]
pub struct HostKeyStore {
    env_var: Option<String>,
    key_file: Option<PathBuf>,
}

impl HostKeyStore {
    pub fn new(env_var: Option<String>, key_file: Option<PathBuf>) -> Self {
        Self {
            env_var: env_var.filter(|name| !name.trim().is_empty()),
            key_file,
        }
    }

    pub fn key_file(&self) -> Option<&Path> {
        self.key_file.as_deref()
    }

    fn read_key(&self) -> Option<String> {
        if let Some(name) = &self.env_var {
            if let Ok(value) = std::env::var(name) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }

        let path = self.key_file.as_ref()?;
        let text = fs::read_to_string(path).ok()?;
        parse_key_file(&text)
    }
}

#[async_trait]
impl KeyCapability for HostKeyStore {
    async fn has_selected_key(&self) -> bool {
        self.read_key().is_some()
    }

    async fn open_key_selection(&self) -> Result<()> {
        let Some(path) = &self.key_file else {
            tracing::warn!(
                env_var = self.env_var.as_deref().unwrap_or_default(),
                "no key file configured; set the API key environment variable and restart"
            );
            return Ok(());
        };

        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, KEY_FILE_TEMPLATE)?;
        }

        tracing::info!(path = %path.display(), "opening API key file");
        if let Err(err) = open_with_shell(path) {
            tracing::warn!("could not open key file: {err}");
        }
        Ok(())
    }

    async fn selected_key(&self) -> Option<String> {
        self.read_key()
    }
}

fn parse_key_file(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToOwned::to_owned)
}

#[cfg(target_os = "windows")]
fn to_wide_null(value: &std::ffi::OsStr) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    value
        .encode_wide()
        .chain(std::iter::once(0))
        .collect::<Vec<u16>>()
}

#[cfg(target_os = "windows")]
fn open_with_shell(path: &Path) -> anyhow::Result<()> {
    let operation = to_wide_null(std::ffi::OsStr::new("open"));
    let file = to_wide_null(path.as_os_str());

    let result = unsafe {
        windows_sys::Win32::UI::Shell::ShellExecuteW(
            std::ptr::null_mut(),
            operation.as_ptr(),
            file.as_ptr(),
            std::ptr::null(),
            std::ptr::null(),
            windows_sys::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL,
        )
    };
    let result_code = result as isize;
    if result_code <= 32 {
        return Err(anyhow::anyhow!(
            "ShellExecuteW failed (code: {result_code}) for {}",
            path.display()
        ));
    }

    Ok(())
}

#[cfg(not(target_os = "windows"))]
fn open_with_shell(path: &Path) -> anyhow::Result<()> {
    tracing::info!(
        path = %path.display(),
        "edit this file to select an API key"
    );
    Ok(())
}
