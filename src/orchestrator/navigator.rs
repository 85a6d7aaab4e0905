use crate::error::{Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

/// Receives the resolved appliance URL after a successful connect.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, url: &Url) -> Result<()>;
}

/// Opens the URL in the system's default browser.
pub struct BrowserNavigator;

impl BrowserNavigator {
    fn command(url: &Url) -> Command {
        #[cfg(target_os = "macos")]
        {
            let mut cmd = Command::new("open");
            cmd.arg(url.as_str());
            cmd
        }

        #[cfg(target_os = "windows")]
        {
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url.as_str()]);
            cmd
        }

        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url.as_str());
            cmd
        }
    }
}

#[async_trait]
impl Navigator for BrowserNavigator {
    async fn navigate(&self, url: &Url) -> Result<()> {
        let status = Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| Error::Config(format!("Failed to launch browser: {}", e)))?;

        if !status.success() {
            return Err(Error::Config(format!(
                "Browser launcher exited with {} for {}",
                status, url
            )));
        }
        Ok(())
    }
}
