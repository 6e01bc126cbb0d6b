//! Application entry points tying video I/O, the pose oracle and the
//! analyzer together.

use crate::{
    aggregator::{PostureAnalyzer, VideoVerdict},
    config::Config,
    pose_detection::{OnnxPoseDetector, PoseOracle},
    video::{VideoAnnotator, VideoReader},
    Result,
};
use log::{info, warn};
use opencv::core::Mat;
use std::path::Path;

/// Analyze one video and reduce it to a single verdict.
///
/// When `output` is given, every processed frame is re-encoded there with its
/// skeleton and feedback text. A failed analysis removes the partial output.
///
/// # Errors
///
/// Returns [`crate::Error::InputUnreadable`] if the input cannot be opened or
/// yields no frames, [`crate::Error::OutputUnwritable`] if the annotated video
/// cannot be created, and propagates oracle failures
pub fn analyze_video<O>(input: &Path, output: Option<&Path>, detector: &mut O, config: &Config) -> Result<VideoVerdict>
where
    O: PoseOracle<Frame = Mat>,
{
    let reader = VideoReader::open(input)?;
    let analyzer = PostureAnalyzer::from_config(config);

    match output {
        Some(path) => {
            let mut annotator = VideoAnnotator::create(
                path,
                &config.output.fourcc,
                reader.fps(),
                reader.frame_size(),
                config.output.font_scale,
                config.output.draw_skeleton,
            )?;
            let result = analyzer.analyze(reader, detector, &mut annotator);
            if result.is_err() {
                drop(annotator);
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove partial output {}: {e}", path.display());
                }
            }
            result
        }
        None => analyzer.analyze(reader, detector, &mut crate::aggregator::NullSink),
    }
}

/// Owns a loaded pose detector so several videos can be analyzed in turn
pub struct PostureApp {
    config: Config,
    detector: OnnxPoseDetector,
}

impl PostureApp {
    /// Validate the configuration and load the pose model
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the model cannot be
    /// loaded
    pub fn new(config: Config) -> Result<Self> {
        info!("Initializing posture analyzer");
        config.validate()?;
        config.validate_model_paths()?;

        let detector = OnnxPoseDetector::new(
            &config.models.pose_landmarks,
            config.detection.min_detection_confidence,
        )?;

        Ok(Self { config, detector })
    }

    /// Analyze a video with the loaded detector
    ///
    /// # Errors
    ///
    /// See [`analyze_video`]
    pub fn analyze(&mut self, input: &Path, output: Option<&Path>) -> Result<VideoVerdict> {
        analyze_video(input, output, &mut self.detector, &self.config)
    }
}
