use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow};

use crate::markers::HsvRange;

#[cfg(feature = "video-opencv")]
const DEFAULT_SOURCE_PATH: &str = "resources/test_video.mp4";
#[cfg(not(feature = "video-opencv"))]
const DEFAULT_SOURCE_PATH: &str = "resources/test_video";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30);
pub const HISTORY_CAPACITY: usize = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSpec {
    /// Video file, directory of frames or a single still image, played in a loop.
    Path(PathBuf),
    /// Live camera by device index.
    Camera(u32),
}

impl SourceSpec {
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = raw.parse() {
                return SourceSpec::Camera(index);
            }
        }
        SourceSpec::Path(PathBuf::from(raw))
    }
}

impl Default for SourceSpec {
    fn default() -> Self {
        SourceSpec::Path(PathBuf::from(DEFAULT_SOURCE_PATH))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerConfig {
    pub range: HsvRange,
    pub history_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            range: HsvRange::GREEN_MARKER,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub source: SourceSpec,
    pub poll_interval: Duration,
    pub tracker: TrackerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceSpec::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            tracker: TrackerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Usage: `breath-trainer [SOURCE] [--interval-ms N]`
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = AppConfig::default();
        let mut source_seen = false;
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--interval-ms" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--interval-ms needs a value"))?;
                    let millis: u64 = value
                        .parse()
                        .with_context(|| format!("invalid --interval-ms value {value:?}"))?;
                    if millis == 0 {
                        return Err(anyhow!("--interval-ms must be greater than zero"));
                    }
                    config.poll_interval = Duration::from_millis(millis);
                }
                flag if flag.starts_with("--") => {
                    return Err(anyhow!("unknown flag {flag}"));
                }
                source => {
                    if source_seen {
                        return Err(anyhow!("unexpected extra argument {source:?}"));
                    }
                    config.source = SourceSpec::parse(source);
                    source_seen = true;
                }
            }
        }

        Ok(config)
    }
}
