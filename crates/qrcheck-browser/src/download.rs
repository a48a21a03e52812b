//! Download materialization tracking.
//!
//! A [`DownloadWatch`] is created *before* the action that starts a
//! download. Its event stream buffers from the moment of registration, so
//! a download that completes before anyone polls the watch is still seen.

use crate::error::{BrowserError, Result};
use crate::wait::WaitConfig;
use futures::StreamExt;
use futures::stream::BoxStream;
use std::path::PathBuf;
use tracing::debug;

/// Progress signals relevant to download materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSignal {
    /// The browser accepted a download and assigned it `guid`.
    Started {
        /// Browser-assigned download id (also the on-disk file name).
        guid: String,
        /// File name the server suggested.
        suggested_filename: String,
    },
    /// All bytes of `guid` were written to the download directory.
    Completed {
        /// Browser-assigned download id.
        guid: String,
    },
    /// The browser gave up on `guid`.
    Canceled {
        /// Browser-assigned download id.
        guid: String,
    },
}

/// A registered wait for the next completed download.
pub struct DownloadWatch {
    dir: PathBuf,
    events: BoxStream<'static, DownloadSignal>,
}

impl std::fmt::Debug for DownloadWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadWatch")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl DownloadWatch {
    /// Wraps an already-registered signal stream. Completed downloads are
    /// expected at `dir/<guid>`.
    pub fn new(dir: impl Into<PathBuf>, events: BoxStream<'static, DownloadSignal>) -> Self {
        Self {
            dir: dir.into(),
            events,
        }
    }

    /// Resolves to the path of the first completed download.
    ///
    /// # Errors
    ///
    /// `WaitTimeout` when nothing completes within `config.timeout`;
    /// `DownloadFailed` when the download is cancelled or the stream ends.
    pub async fn wait(mut self, config: WaitConfig) -> Result<PathBuf> {
        let dir = self.dir.clone();
        let events = &mut self.events;

        let outcome = tokio::time::timeout(config.timeout, async move {
            while let Some(signal) = events.next().await {
                match signal {
                    DownloadSignal::Started {
                        guid,
                        suggested_filename,
                    } => {
                        debug!(%guid, %suggested_filename, "download started");
                    }
                    DownloadSignal::Completed { guid } => return Ok(dir.join(guid)),
                    DownloadSignal::Canceled { guid } => {
                        return Err(BrowserError::DownloadFailed(format!(
                            "download {guid} was cancelled"
                        )));
                    }
                }
            }
            Err(BrowserError::DownloadFailed(
                "download event stream closed".to_string(),
            ))
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(_elapsed) => Err(BrowserError::WaitTimeout {
                condition: "download materialized".to_string(),
                timeout: config.timeout,
            }),
        }
    }
}
