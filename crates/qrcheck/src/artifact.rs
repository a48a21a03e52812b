//! Obtaining the rendered code as bytes.
//!
//! Two channels share one contract: given a creation that has already
//! been triggered and observed, produce exactly one [`Artifact`]. The
//! channel only changes how the bytes are obtained, never what the
//! application is asked to do.

use crate::error::{Result, ScenarioError};
use crate::page_model::PageModel;
use async_trait::async_trait;
use qrcheck_browser::WaitConfig;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How an artifact was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Download,
    Capture,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Download => f.write_str("download"),
            Channel::Capture => f.write_str("capture"),
        }
    }
}

/// A file the browser wrote for us. The file is deleted when this value
/// is dropped, whatever the outcome of the scenario that holds it.
#[derive(Debug)]
pub struct DownloadedFile {
    path: PathBuf,
}

impl DownloadedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file. Partial reads are never used.
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

impl Drop for DownloadedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "download removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove download"),
        }
    }
}

/// The rendered output of one creation action.
#[derive(Debug)]
pub enum Artifact {
    /// Bytes on disk, owned (and cleaned up) by the scenario.
    DownloadedFile(DownloadedFile),
    /// Bytes captured straight into memory.
    CapturedImage(Vec<u8>),
}

impl Artifact {
    #[must_use]
    pub fn channel(&self) -> Channel {
        match self {
            Artifact::DownloadedFile(_) => Channel::Download,
            Artifact::CapturedImage(_) => Channel::Capture,
        }
    }

    /// Consumes the artifact into its image-container bytes. A downloaded
    /// file is read fully, then deleted.
    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Artifact::DownloadedFile(file) => Ok(file.read().await?),
            Artifact::CapturedImage(bytes) => Ok(bytes),
        }
    }
}

/// A strategy for acquiring the artifact of an already-triggered creation.
#[async_trait]
pub trait Acquisition: Send + Sync {
    fn channel(&self) -> Channel;

    async fn acquire(&self, page: &PageModel) -> Result<Artifact>;
}

/// Clicks the download control and waits for the file to land in `dir`.
#[derive(Debug, Clone)]
pub struct DownloadChannel {
    dir: PathBuf,
    wait: WaitConfig,
}

impl DownloadChannel {
    pub fn new(dir: impl Into<PathBuf>, wait: WaitConfig) -> Self {
        Self {
            dir: dir.into(),
            wait,
        }
    }
}

#[async_trait]
impl Acquisition for DownloadChannel {
    fn channel(&self) -> Channel {
        Channel::Download
    }

    async fn acquire(&self, page: &PageModel) -> Result<Artifact> {
        // The listener is registered before the click goes out, and the
        // wait and the click are then driven together.
        let watch = page.driver().expect_download(&self.dir).await?;
        let (path, ()) = tokio::try_join!(
            async { watch.wait(self.wait).await.map_err(ScenarioError::from) },
            page.trigger_download(),
        )?;

        debug!(path = %path.display(), "download materialized");
        Ok(Artifact::DownloadedFile(DownloadedFile::new(path)))
    }
}

/// Waits for the generated element, then screenshots just that element.
#[derive(Debug, Clone)]
pub struct CaptureChannel {
    wait: WaitConfig,
}

impl CaptureChannel {
    #[must_use]
    pub fn new(wait: WaitConfig) -> Self {
        Self { wait }
    }
}

#[async_trait]
impl Acquisition for CaptureChannel {
    fn channel(&self) -> Channel {
        Channel::Capture
    }

    async fn acquire(&self, page: &PageModel) -> Result<Artifact> {
        page.wait_for_generated_visible(self.wait).await?;
        let bytes = page.capture_region().await?;
        debug!(len = bytes.len(), "generated code captured");
        Ok(Artifact::CapturedImage(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_model::Locators;
    use crate::testing::{FakeDriver, fake_model};
    use std::time::Duration;

    fn quick() -> WaitConfig {
        WaitConfig::new(Duration::from_millis(100), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn download_is_armed_before_the_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FakeDriver::new();
        driver.serve_download(b"png-bytes".to_vec());
        let model = fake_model(&driver);

        let artifact = DownloadChannel::new(dir.path(), quick())
            .acquire(&model)
            .await
            .unwrap();

        assert_eq!(
            driver.events(),
            vec![
                "arm-download".to_string(),
                "click:#button-download-qr-code-png".to_string()
            ]
        );
        assert_eq!(artifact.channel(), Channel::Download);
        assert_eq!(artifact.into_bytes().await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn download_file_is_deleted_after_use() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FakeDriver::new();
        driver.serve_download(b"png-bytes".to_vec());
        let model = fake_model(&driver);

        let artifact = DownloadChannel::new(dir.path(), quick())
            .acquire(&model)
            .await
            .unwrap();
        let path = match &artifact {
            Artifact::DownloadedFile(file) => file.path().to_path_buf(),
            Artifact::CapturedImage(_) => panic!("expected a file"),
        };
        assert!(path.exists());

        drop(artifact);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_download_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FakeDriver::new();
        let model = fake_model(&driver);

        let result = DownloadChannel::new(dir.path(), quick())
            .acquire(&model)
            .await;
        assert!(matches!(
            result,
            Err(ScenarioError::Timeout { condition, .. }) if condition == "download materialized"
        ));
        // The click went through; the browser simply never reported a file.
        assert_eq!(
            driver.clicks(),
            vec![Locators::default().download_button]
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn capture_waits_for_the_generated_element() {
        let driver = FakeDriver::new();
        driver.set_screenshot(vec![1, 2, 3]);
        let model = fake_model(&driver);

        let hidden = CaptureChannel::new(quick()).acquire(&model).await;
        assert!(matches!(hidden, Err(ScenarioError::Timeout { .. })));

        driver.show(&Locators::default().generated_image);
        let artifact = CaptureChannel::new(quick()).acquire(&model).await.unwrap();
        assert_eq!(artifact.channel(), Channel::Capture);
        assert_eq!(artifact.into_bytes().await.unwrap(), vec![1, 2, 3]);
        assert_eq!(
            driver.screenshots(),
            vec![Locators::default().generated_image]
        );
    }
}
