//! Reduction of per-frame verdicts into a single video verdict.

use crate::{
    classifier::{Assessment, FrameVerdict, Posture, PostureRules},
    config::Config,
    joints::JointSet,
    pose_detection::PoseOracle,
    Error, Result,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Overall correctness of the dominant posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Overall {
    Correct,
    Incorrect,
}

impl fmt::Display for Overall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct => f.write_str("Correct"),
            Self::Incorrect => f.write_str("Incorrect"),
        }
    }
}

/// Summary of the dominant posture in a video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostureSummary {
    pub posture: Posture,
    pub overall: Overall,
    /// Frames counted for the dominant posture
    pub frames: usize,
    /// Of those, frames judged incorrect
    pub incorrect_frames: usize,
    pub correct_ratio: f64,
}

/// Final result for one video
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoVerdict {
    /// No frame was classified as sitting or squatting
    NothingDetected,
    Assessed(PostureSummary),
}

impl VideoVerdict {
    /// Summary of the dominant posture, if any
    #[must_use]
    pub const fn summary(&self) -> Option<&PostureSummary> {
        match self {
            Self::NothingDetected => None,
            Self::Assessed(summary) => Some(summary),
        }
    }
}

impl fmt::Display for VideoVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingDetected => f.write_str("No sitting or squatting posture detected"),
            Self::Assessed(summary) => write!(f, "{} {} Posture", summary.overall, summary.posture),
        }
    }
}

/// Running per-posture counts for one video
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoTally {
    frames: BTreeMap<Posture, usize>,
    incorrect: BTreeMap<Posture, usize>,
    frames_read: usize,
    frames_without_body: usize,
    insufficient_data: usize,
}

impl VideoTally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decoded frame; `None` means no body was detected
    pub fn record(&mut self, verdict: Option<&FrameVerdict>) {
        self.frames_read += 1;

        let Some(verdict) = verdict else {
            self.frames_without_body += 1;
            return;
        };

        match (&verdict.assessment, verdict.posture.is_assessed()) {
            (Some(Assessment::Correct), true) => {
                *self.frames.entry(verdict.posture).or_default() += 1;
            }
            (Some(Assessment::Incorrect(_)), true) => {
                *self.frames.entry(verdict.posture).or_default() += 1;
                *self.incorrect.entry(verdict.posture).or_default() += 1;
            }
            (_, true) => self.insufficient_data += 1,
            (_, false) => *self.frames.entry(verdict.posture).or_default() += 1,
        }
    }

    /// Frames counted for `posture`
    #[must_use]
    pub fn frames(&self, posture: Posture) -> usize {
        self.frames.get(&posture).copied().unwrap_or(0)
    }

    /// Frames of `posture` judged incorrect
    #[must_use]
    pub fn incorrect(&self, posture: Posture) -> usize {
        self.incorrect.get(&posture).copied().unwrap_or(0)
    }

    #[must_use]
    pub const fn frames_read(&self) -> usize {
        self.frames_read
    }

    #[must_use]
    pub const fn frames_without_body(&self) -> usize {
        self.frames_without_body
    }

    #[must_use]
    pub const fn insufficient_data(&self) -> usize {
        self.insufficient_data
    }

    /// Sitting or squatting, whichever has more frames; ties go to sitting
    #[must_use]
    pub fn dominant_posture(&self) -> Option<Posture> {
        let sitting = self.frames(Posture::Sitting);
        let squatting = self.frames(Posture::Squatting);

        match (sitting, squatting) {
            (0, 0) => None,
            (sit, squat) if sit >= squat => Some(Posture::Sitting),
            _ => Some(Posture::Squatting),
        }
    }

    /// Reduce the tally; the dominant posture is correct when at least
    /// `min_correct_ratio` of its frames were correct
    #[must_use]
    pub fn verdict(&self, min_correct_ratio: f64) -> VideoVerdict {
        let Some(posture) = self.dominant_posture() else {
            return VideoVerdict::NothingDetected;
        };

        let frames = self.frames(posture);
        let incorrect_frames = self.incorrect(posture);
        let correct_ratio = (frames - incorrect_frames) as f64 / frames as f64;
        let overall = if correct_ratio >= min_correct_ratio {
            Overall::Correct
        } else {
            Overall::Incorrect
        };

        VideoVerdict::Assessed(PostureSummary {
            posture,
            overall,
            frames,
            incorrect_frames,
            correct_ratio,
        })
    }
}

/// Receives every frame together with its detection and verdict
pub trait FrameSink<F> {
    /// Consume one processed frame
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written
    fn write_frame(&mut self, frame: &F, joints: Option<&JointSet>, verdict: Option<&FrameVerdict>) -> Result<()>;
}

/// Sink that discards frames
pub struct NullSink;

impl<F> FrameSink<F> for NullSink {
    fn write_frame(&mut self, _frame: &F, _joints: Option<&JointSet>, _verdict: Option<&FrameVerdict>) -> Result<()> {
        Ok(())
    }
}

/// Drives a pose oracle over a frame sequence and reduces the result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureAnalyzer {
    rules: PostureRules,
    min_correct_ratio: f64,
}

impl Default for PostureAnalyzer {
    fn default() -> Self {
        Self::new(PostureRules::default(), crate::constants::DEFAULT_MIN_CORRECT_RATIO)
    }
}

impl PostureAnalyzer {
    #[must_use]
    pub const fn new(rules: PostureRules, min_correct_ratio: f64) -> Self {
        Self {
            rules,
            min_correct_ratio,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(PostureRules::from_config(config), config.aggregation.min_correct_ratio)
    }

    /// Process every frame and return the raw tally
    ///
    /// # Errors
    ///
    /// Returns an error if decoding a frame, running the oracle or writing
    /// to the sink fails
    pub fn tally<O, I, S>(&self, frames: I, oracle: &mut O, sink: &mut S) -> Result<VideoTally>
    where
        O: PoseOracle,
        I: IntoIterator<Item = Result<O::Frame>>,
        S: FrameSink<O::Frame>,
    {
        let mut tally = VideoTally::new();

        for frame in frames {
            let frame = frame?;
            let joints = oracle.detect(&frame)?;
            let verdict = joints.as_ref().map(|joints| self.rules.assess(joints));

            if verdict.is_none() {
                log::debug!("No body detected in frame {}", tally.frames_read());
            }

            tally.record(verdict.as_ref());
            sink.write_frame(&frame, joints.as_ref(), verdict.as_ref())?;
        }

        log::info!(
            "Processed {} frames: {} without a body, {} with insufficient data",
            tally.frames_read(),
            tally.frames_without_body(),
            tally.insufficient_data()
        );

        Ok(tally)
    }

    /// Process every frame and reduce to a video verdict
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputUnreadable`] if the sequence yields no frames,
    /// otherwise any error from [`PostureAnalyzer::tally`]
    pub fn analyze<O, I, S>(&self, frames: I, oracle: &mut O, sink: &mut S) -> Result<VideoVerdict>
    where
        O: PoseOracle,
        I: IntoIterator<Item = Result<O::Frame>>,
        S: FrameSink<O::Frame>,
    {
        let tally = self.tally(frames, oracle, sink)?;
        if tally.frames_read() == 0 {
            return Err(Error::InputUnreadable("no frames could be decoded".to_string()));
        }

        let verdict = tally.verdict(self.min_correct_ratio);
        log::info!("Video verdict: {verdict}");
        Ok(verdict)
    }
}
