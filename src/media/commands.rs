use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::error::{DubError, Result};

/// Abstract media tool invocation (ffmpeg/ffprobe).
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn subtitle_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:s").arg(codec)
    }

    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn audio_bitrate<S: Into<String>>(self, bitrate: S) -> Self {
        self.arg("-b:a").arg(bitrate)
    }

    pub fn audio_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-filter:a").arg(filter)
    }

    /// Map a stream from input `spec`, e.g. "0:v" or "3".
    pub fn map<S: Into<String>>(self, spec: S) -> Self {
        self.arg("-map").arg(spec)
    }

    /// Tag a stream with key=value metadata, e.g. spec "s:s:0".
    pub fn stream_metadata<S1: Into<String>, S2: Into<String>>(self, spec: S1, kv: S2) -> Self {
        self.arg(format!("-metadata:{}", spec.into())).arg(kv)
    }

    /// Set a stream disposition, e.g. spec "s:0", value "default".
    pub fn disposition<S1: Into<String>, S2: Into<String>>(self, spec: S1, value: S2) -> Self {
        self.arg(format!("-disposition:{}", spec.into())).arg(value)
    }

    pub fn faststart(self) -> Self {
        self.arg("-movflags").arg("+faststart")
    }

    /// Execute the command, discarding stdout.
    pub async fn execute(&self, timeout: Duration) -> Result<()> {
        self.run(timeout).await.map(|_| ())
    }

    /// Execute the command and return captured stdout (for ffprobe).
    pub async fn execute_capture(&self, timeout: Duration) -> Result<String> {
        self.run(timeout).await
    }

    async fn run(&self, timeout: Duration) -> Result<String> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args).kill_on_drop(true);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| {
                DubError::Timeout(format!(
                    "{} exceeded {}s",
                    self.description,
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| DubError::Media(format!("Failed to execute media tool: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::Media(format!(
                "{} failed: {}",
                self.description, stderr
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Builder for the pipeline's media tool invocations.
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Compressed audio extraction, suitable for upload to the
    /// transcription provider.
    pub fn extract_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        bitrate: &str,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Audio extraction")
            .input(video_path)
            .no_video()
            .audio_codec("libmp3lame")
            .audio_bitrate(bitrate)
            .overwrite()
            .output(audio_path)
    }

    /// Timed-text dialect conversion (e.g. VTT to SRT); ffmpeg infers
    /// formats from the file extensions.
    pub fn convert_subtitle<P: AsRef<Path>>(&self, input: P, output: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Subtitle conversion")
            .input(input)
            .overwrite()
            .output(output)
    }

    /// Single-pass atempo adjustment of one audio segment.
    pub fn adjust_tempo<P: AsRef<Path>>(&self, input: P, output: P, factor: f64) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, format!("Tempo adjustment x{:.3}", factor))
            .input(input)
            .audio_filter(format!("atempo={:.4}", factor))
            .audio_codec("libmp3lame")
            .overwrite()
            .output(output)
    }

    /// Encoded silence matching the synthesis output parameters, so the
    /// concat step can stream-copy across segment boundaries.
    pub fn generate_silence<P: AsRef<Path>>(&self, output: P, duration_ms: u64) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, format!("Silence {}ms", duration_ms))
            .arg("-f")
            .arg("lavfi")
            .input("anullsrc=r=24000:cl=mono")
            .arg("-t")
            .arg(format!("{:.3}", duration_ms as f64 / 1000.0))
            .audio_codec("libmp3lame")
            .overwrite()
            .output(output)
    }

    /// Lossless concatenation via the concat demuxer; segments are
    /// stream-copied, never re-encoded.
    pub fn concat_audio<P: AsRef<Path>>(&self, list_path: P, output: P) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Audio concatenation")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .input(list_path)
            .copy_audio()
            .overwrite()
            .output(output)
    }

    /// JSON stream/format probe.
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Stream probe")
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .arg("-show_format")
            .output(path)
    }

    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_command_shape() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.adjust_tempo("in.mp3", "out.mp3", 1.5);
        let args = cmd.args.join(" ");
        assert!(args.contains("-filter:a atempo=1.5000"));
        assert!(args.contains("-i in.mp3"));
        assert!(args.ends_with("out.mp3"));
    }

    #[test]
    fn test_concat_uses_stream_copy() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.concat_audio("list.txt", "track.mp3");
        let args = cmd.args.join(" ");
        assert!(args.contains("-f concat"));
        assert!(args.contains("-c:a copy"));
    }

    #[test]
    fn test_silence_duration_formatting() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.generate_silence("gap.mp3", 500);
        assert!(cmd.args.join(" ").contains("-t 0.500"));
    }
}
