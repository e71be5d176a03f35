use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command as ProcessCommand, ExitStatus, Stdio};

use tracing::{debug, info, warn};

use super::VideoInfo;
use crate::config::Subscription;
use crate::error::{Error, Result};

/// One JSON object per listed video.
const LIST_PRINT_FORMAT: &str = "%(.{id,title,webpage_url})j";
/// Field separator of the older `--print "%(id)s:|:%(title)s:|:%(webpage_url)s"` form.
const LEGACY_DELIMITER: &str = ":|:";
const MAX_FORMAT: &str = "best[height<=1080]";

/// Capabilities the pipeline needs from the external fetch tool.
pub(crate) trait VideoFetcher {
    /// Lists a subscription's videos in the order the tool reports them.
    fn list(&self, sub: &Subscription) -> Result<Vec<VideoInfo>>;

    /// Downloads one video, recording it in `archive`. Returns whether the
    /// tool exited successfully.
    fn download(&self, video: &VideoInfo, output: &Path, archive: &Path) -> bool;
}

pub(crate) struct YtDlp {
    bin: PathBuf,
}

impl YtDlp {
    pub(crate) fn new(bin: PathBuf) -> Self {
        Self { bin }
    }

    fn list_command(&self, sub: &Subscription) -> ProcessCommand {
        let mut cmd = ProcessCommand::new(&self.bin);
        cmd.arg("--print").arg(LIST_PRINT_FORMAT);
        if sub.max_videos > 0 {
            cmd.arg("--playlist-end").arg(sub.max_videos.to_string());
        }
        cmd.args(["--ignore-errors", "--no-warnings", "--quiet"])
            .arg(&sub.url)
            .stdin(Stdio::null());
        cmd
    }

    fn download_command(&self, video: &VideoInfo, output: &Path, archive: &Path) -> ProcessCommand {
        let mut cmd = ProcessCommand::new(&self.bin);
        cmd.arg("--download-archive")
            .arg(archive)
            .arg("--output")
            .arg(output)
            .arg("--format")
            .arg(MAX_FORMAT)
            .args([
                "--no-overwrites",
                "--continue",
                "--ignore-errors",
                "--embed-thumbnail",
                "--add-metadata",
            ])
            .arg(&video.url)
            .stdin(Stdio::null());
        cmd
    }
}

impl VideoFetcher for YtDlp {
    fn list(&self, sub: &Subscription) -> Result<Vec<VideoInfo>> {
        let output = self.list_command(sub).output().map_err(|err| {
            Error::listing(
                &sub.name,
                format!("failed to launch {}: {err}", self.bin.display()),
            )
        })?;
        if !output.status.success() {
            return Err(Error::listing(
                &sub.name,
                format!("{} exited with status: {}", self.bin.display(), output.status),
            ));
        }

        let raw = String::from_utf8_lossy(&output.stdout);
        if raw.trim().is_empty() {
            return Err(Error::listing(&sub.name, "no output from yt-dlp"));
        }

        let (mut videos, malformed) = parse_listing(&raw);
        if videos.is_empty() {
            return Err(Error::listing(
                &sub.name,
                format!("none of the {malformed} listed line(s) could be parsed"),
            ));
        }
        if sub.max_videos > 0 {
            videos.truncate(sub.max_videos);
        }
        Ok(videos)
    }

    fn download(&self, video: &VideoInfo, output: &Path, archive: &Path) -> bool {
        debug!(video = %video.id, "downloading {} to {}", video.url, output.display());
        let cmd = self.download_command(video, output, archive);
        let status = match run_combined(cmd, |line| info!(video = %video.id, "{line}")) {
            Ok(status) => status,
            Err(err) => {
                warn!(
                    video = %video.id,
                    "failed to run {}: {err}",
                    self.bin.display()
                );
                return false;
            }
        };

        if !status.success() {
            debug!(video = %video.id, "yt-dlp exited with status: {status}");
        }
        status.success()
    }
}

/// Runs `cmd` with stderr and stdout sharing one pipe, handing each
/// non-blank line to `on_line` in the order the child wrote it.
pub(crate) fn run_combined(
    mut cmd: ProcessCommand,
    mut on_line: impl FnMut(&str),
) -> io::Result<ExitStatus> {
    let (reader, writer) = io::pipe()?;
    cmd.stdout(writer.try_clone()?).stderr(writer);
    let mut child = cmd.spawn()?;
    // The command keeps its copies of the write end open until dropped.
    drop(cmd);

    let relayed = relay_lines(BufReader::new(reader), &mut on_line);
    let status = child.wait()?;
    relayed?;
    Ok(status)
}

fn relay_lines(mut reader: impl BufRead, on_line: &mut impl FnMut(&str)) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if !line.is_empty() {
            on_line(line);
        }
    }
}

/// Parses listing output, returning the videos and the number of malformed
/// lines that were skipped.
pub(crate) fn parse_listing(raw: &str) -> (Vec<VideoInfo>, usize) {
    let mut videos = Vec::new();
    let mut malformed = 0;
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_listing_line(line) {
            Some(video) => videos.push(video),
            None => {
                malformed += 1;
                warn!("skipping malformed listing line {}: {line}", index + 1);
            }
        }
    }
    (videos, malformed)
}

pub(crate) fn parse_listing_line(line: &str) -> Option<VideoInfo> {
    if line.starts_with('{') {
        return serde_json::from_str::<VideoInfo>(line)
            .ok()
            .filter(|video| !video.id.is_empty());
    }

    let parts: Vec<&str> = line.split(LEGACY_DELIMITER).collect();
    let [id, title, url] = parts.as_slice() else {
        return None;
    };
    if id.is_empty() {
        return None;
    }
    Some(VideoInfo {
        id: id.to_string(),
        title: title.to_string(),
        url: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &ProcessCommand) -> Vec<String> {
        cmd.get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn list_command_caps_playlist_only_when_max_is_set() {
        let fetcher = YtDlp::new(PathBuf::from("yt-dlp"));
        let mut sub = Subscription {
            url: "https://www.youtube.com/@show".to_string(),
            max_videos: 5,
            ..Subscription::default()
        };

        let capped = args(&fetcher.list_command(&sub));
        assert_eq!(
            capped,
            vec![
                "--print",
                LIST_PRINT_FORMAT,
                "--playlist-end",
                "5",
                "--ignore-errors",
                "--no-warnings",
                "--quiet",
                "https://www.youtube.com/@show",
            ]
        );

        sub.max_videos = 0;
        let uncapped = args(&fetcher.list_command(&sub));
        assert!(!uncapped.iter().any(|arg| arg == "--playlist-end"));
    }

    #[test]
    fn download_command_passes_archive_output_and_format() {
        let fetcher = YtDlp::new(PathBuf::from("yt-dlp"));
        let video = VideoInfo {
            id: "abc123".to_string(),
            title: "Title".to_string(),
            url: "https://youtu.be/abc123".to_string(),
        };
        let cmd = fetcher.download_command(
            &video,
            Path::new("/videos/show/Show E001 [%(id)s].%(ext)s"),
            Path::new("/archives/Show.txt"),
        );
        let args = args(&cmd);
        assert_eq!(&args[..6], [
            "--download-archive",
            "/archives/Show.txt",
            "--output",
            "/videos/show/Show E001 [%(id)s].%(ext)s",
            "--format",
            "best[height<=1080]",
        ]);
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc123"));
        for flag in ["--no-overwrites", "--continue", "--embed-thumbnail", "--add-metadata"] {
            assert!(args.iter().any(|arg| arg == flag), "missing {flag}");
        }
    }

    #[cfg(unix)]
    mod process {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::{Path, PathBuf};
        use std::process::Command as ProcessCommand;

        use super::super::{VideoFetcher, YtDlp, run_combined};
        use crate::app::VideoInfo;
        use crate::config::Subscription;
        use crate::error::Error;

        /// Writes an executable `sh` script standing in for yt-dlp.
        fn fake_tool(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("yt-dlp");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
            path
        }

        fn show(max_videos: usize) -> Subscription {
            Subscription {
                url: "https://www.youtube.com/@show".to_string(),
                max_videos,
                name: "Show".to_string(),
                ..Subscription::default()
            }
        }

        fn sample_video() -> VideoInfo {
            VideoInfo {
                id: "abc123".to_string(),
                title: "Title".to_string(),
                url: "https://youtu.be/abc123".to_string(),
            }
        }

        #[test]
        fn list_truncates_to_max_videos() {
            let dir = tempfile::tempdir().expect("tempdir");
            let bin = fake_tool(
                dir.path(),
                "echo 'a:|:One:|:https://youtu.be/a'\n\
                 echo '{\"id\": \"b\", \"title\": \"Two\", \"webpage_url\": \"https://youtu.be/b\"}'\n\
                 echo 'c:|:Three:|:https://youtu.be/c'",
            );

            let videos = YtDlp::new(bin).list(&show(2)).expect("listing should succeed");
            let ids: Vec<&str> = videos.iter().map(|video| video.id.as_str()).collect();
            assert_eq!(ids, vec!["a", "b"]);
        }

        #[test]
        fn list_without_cap_keeps_everything() {
            let dir = tempfile::tempdir().expect("tempdir");
            let bin = fake_tool(
                dir.path(),
                "echo 'a:|:One:|:u1'\necho 'b:|:Two:|:u2'\necho 'c:|:Three:|:u3'",
            );

            let videos = YtDlp::new(bin).list(&show(0)).expect("listing should succeed");
            assert_eq!(videos.len(), 3);
        }

        #[test]
        fn list_fails_on_nonzero_exit() {
            let dir = tempfile::tempdir().expect("tempdir");
            let bin = fake_tool(dir.path(), "echo 'a:|:One:|:u1'\nexit 1");

            let err = YtDlp::new(bin).list(&show(5)).expect_err("exit 1 must fail");
            assert!(matches!(err, Error::Listing { ref subscription, .. } if subscription == "Show"));
        }

        #[test]
        fn list_fails_on_empty_output() {
            let dir = tempfile::tempdir().expect("tempdir");
            let bin = fake_tool(dir.path(), "echo ''\nexit 0");

            let err = YtDlp::new(bin).list(&show(5)).expect_err("empty output must fail");
            assert!(matches!(err, Error::Listing { .. }));
        }

        #[test]
        fn list_fails_when_every_line_is_malformed() {
            let dir = tempfile::tempdir().expect("tempdir");
            let bin = fake_tool(dir.path(), "echo 'no delimiter'\necho 'a:|:only two'");

            let err = YtDlp::new(bin).list(&show(5)).expect_err("nothing usable must fail");
            assert!(matches!(err, Error::Listing { .. }));
        }

        #[test]
        fn list_fails_when_tool_cannot_launch() {
            let dir = tempfile::tempdir().expect("tempdir");
            let fetcher = YtDlp::new(dir.path().join("absent-tool"));

            let err = fetcher.list(&show(5)).expect_err("missing binary must fail");
            assert!(matches!(err, Error::Listing { .. }));
        }

        #[test]
        fn download_success_follows_exit_status() {
            let dir = tempfile::tempdir().expect("tempdir");
            let output = dir.path().join("Show E001 [%(id)s].%(ext)s");
            let archive = dir.path().join("Show.txt");

            let ok = fake_tool(dir.path(), "echo '[download] 100%'\nexit 0");
            assert!(YtDlp::new(ok).download(&sample_video(), &output, &archive));

            let other = tempfile::tempdir().expect("tempdir");
            let failing = fake_tool(other.path(), "echo 'ERROR: unavailable' >&2\nexit 1");
            assert!(!YtDlp::new(failing).download(&sample_video(), &output, &archive));
        }

        #[test]
        fn download_fails_when_tool_cannot_launch() {
            let dir = tempfile::tempdir().expect("tempdir");
            let fetcher = YtDlp::new(dir.path().join("absent-tool"));
            assert!(!fetcher.download(
                &sample_video(),
                &dir.path().join("out.%(ext)s"),
                &dir.path().join("Show.txt"),
            ));
        }

        #[test]
        fn run_combined_keeps_stdout_and_stderr_order() {
            let dir = tempfile::tempdir().expect("tempdir");
            let bin = fake_tool(
                dir.path(),
                "echo 'first'\necho 'second' >&2\necho ''\necho 'third'\nexit 3",
            );

            let mut lines = Vec::new();
            let status = run_combined(ProcessCommand::new(bin), |line| lines.push(line.to_string()))
                .expect("script should run");
            assert_eq!(lines, vec!["first", "second", "third"]);
            assert_eq!(status.code(), Some(3));
        }
    }
}
