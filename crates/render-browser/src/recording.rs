//! Records a page's CDP screencast frames to a WebM file on disk (§4.D: "the
//! session owns one browser context with video recording enabled ... producing
//! one video file per page").
//!
//! Chrome's screencast API streams individual JPEG frames rather than an encoded
//! video, so the recorder pipes them into an `ffmpeg` subprocess reading an MJPEG
//! stream on stdin and writing VP8/WebM on stdout.

use std::process::Stdio;

use base64::Engine;
use chromiumoxide::cdp::browser_protocol::page::{
    ScreencastFrameAckParams, StartScreencastFormat, StartScreencastParams,
    StopScreencastParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{BrowserError, BrowserResult};

pub struct VideoRecorder {
    output_path: std::path::PathBuf,
    ffmpeg: Child,
    frame_task: JoinHandle<()>,
    stop_tx: oneshot::Sender<()>,
}

impl VideoRecorder {
    /// Start screencasting `page` and pipe frames into an ffmpeg process writing
    /// `output_path` as WebM.
    pub async fn start(page: &Page, output_path: impl Into<std::path::PathBuf>) -> BrowserResult<Self> {
        which::which("ffmpeg").map_err(|_| BrowserError::RecordingFailed("ffmpeg not found".into()))?;
        let output_path = output_path.into();

        let mut ffmpeg = Command::new("ffmpeg")
            .args([
                "-y",
                "-v",
                "error",
                "-f",
                "mjpeg",
                "-i",
                "pipe:0",
                "-c:v",
                "libvpx",
                "-b:v",
                "1M",
            ])
            .arg(&output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = ffmpeg
            .stdin
            .take()
            .ok_or_else(|| BrowserError::RecordingFailed("failed to open ffmpeg stdin".into()))?;

        page.execute(
            StartScreencastParams::builder()
                .format(StartScreencastFormat::Jpeg)
                .quality(80)
                .build(),
        )
        .await
        .map_err(|e| BrowserError::Cdp(e.to_string()))?;

        let mut frames = page
            .event_listener::<chromiumoxide::cdp::browser_protocol::page::EventScreencastFrame>()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        let page_for_ack = page.clone();
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let frame_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    frame = frames.next() => {
                        let Some(frame) = frame else { break };
                        let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(&frame.data) else {
                            continue;
                        };
                        if stdin.write_all(&bytes).await.is_err() {
                            break;
                        }
                        let _ = page_for_ack
                            .execute(ScreencastFrameAckParams::new(frame.session_id))
                            .await;
                    }
                }
            }
            let _ = stdin.shutdown().await;
        });

        Ok(Self {
            output_path,
            ffmpeg,
            frame_task,
            stop_tx,
        })
    }

    /// Stop screencasting and wait for ffmpeg to finish writing the file.
    pub async fn stop(self, page: &Page) -> BrowserResult<std::path::PathBuf> {
        let _ = page.execute(StopScreencastParams::default()).await;
        let _ = self.stop_tx.send(());
        let _ = self.frame_task.await;

        let mut ffmpeg = self.ffmpeg;
        let status = ffmpeg.wait().await?;
        if !status.success() {
            let mut stderr = String::new();
            if let Some(mut err) = ffmpeg.stderr.take() {
                use tokio::io::AsyncReadExt;
                let _ = err.read_to_string(&mut stderr).await;
            }
            warn!(stderr, "ffmpeg recorder exited non-zero");
        }

        let metadata = tokio::fs::metadata(&self.output_path).await.ok();
        if metadata.map(|m| m.len()).unwrap_or(0) == 0 {
            return Err(BrowserError::EmptyRecording(
                self.output_path.display().to_string(),
            ));
        }

        debug!(path = %self.output_path.display(), "recording finalized");
        Ok(self.output_path)
    }
}
