//! Video decoding and annotated re-encoding through `OpenCV`.

use crate::{
    aggregator::FrameSink,
    classifier::{Assessment, FrameVerdict},
    constants::DEFAULT_FPS,
    joints::JointSet,
    utils::{normalized_to_pixel, safe_cast::f64_to_i32},
    Error, Result,
};
use log::{info, warn};
use opencv::{
    core::{Mat, Point, Scalar, Size},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};
use std::path::Path;

/// Lazy, finite sequence of frames decoded from a video file
pub struct VideoReader {
    capture: VideoCapture,
    fps: f64,
    frame_size: Size,
    frames_read: usize,
    finished: bool,
}

impl VideoReader {
    /// Open a video file for decoding
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputUnreadable`] if the file does not exist or no
    /// decoder accepts it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening video file: {}", path.display());

        if !path.is_file() {
            return Err(Error::InputUnreadable(format!("{} does not exist", path.display())));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::InputUnreadable(format!("{} is not valid UTF-8", path.display())))?;

        let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::InputUnreadable(format!(
                "Failed to open video file {}",
                path.display()
            )));
        }

        let reported_fps = capture.get(CAP_PROP_FPS)?;
        let fps = if reported_fps.is_finite() && reported_fps > 0.0 {
            reported_fps
        } else {
            warn!("Video reports no frame rate, assuming {DEFAULT_FPS}");
            DEFAULT_FPS
        };
        let frame_size = Size::new(
            f64_to_i32(capture.get(CAP_PROP_FRAME_WIDTH)?)?,
            f64_to_i32(capture.get(CAP_PROP_FRAME_HEIGHT)?)?,
        );
        info!("Video {}x{} at {:.1} fps", frame_size.width, frame_size.height, fps);

        Ok(Self {
            capture,
            fps,
            frame_size,
            frames_read: 0,
            finished: false,
        })
    }

    /// Frames per second reported by the container
    #[must_use]
    pub const fn fps(&self) -> f64 {
        self.fps
    }

    /// Frame dimensions reported by the container
    #[must_use]
    pub const fn frame_size(&self) -> Size {
        self.frame_size
    }
}

impl Iterator for VideoReader {
    type Item = Result<Mat>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut frame = Mat::default();
        match self.capture.read(&mut frame) {
            Ok(true) if !frame.empty() => {
                self.frames_read += 1;
                Some(Ok(frame))
            }
            Ok(_) => {
                info!("End of video file reached after {} frames", self.frames_read);
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e.into()))
            }
        }
    }
}

/// Colors in BGR order
const CORRECT_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);
const INCORRECT_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);
const NEUTRAL_COLOR: (f64, f64, f64) = (255.0, 255.0, 255.0);
const SKELETON_COLOR: (f64, f64, f64) = (255.0, 128.0, 0.0);

fn scalar((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

/// Writes each processed frame with its skeleton and feedback text
pub struct VideoAnnotator {
    writer: VideoWriter,
    font_scale: f64,
    draw_skeleton: bool,
}

impl VideoAnnotator {
    /// Create the output video
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputUnwritable`] if the fourcc is invalid or the
    /// writer cannot be opened
    pub fn create<P: AsRef<Path>>(
        path: P,
        fourcc: &str,
        fps: f64,
        frame_size: Size,
        font_scale: f64,
        draw_skeleton: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        info!("Writing annotated video to {} ({fourcc})", path.display());

        let codes: Vec<char> = fourcc.chars().collect();
        let &[c1, c2, c3, c4] = codes.as_slice() else {
            return Err(Error::OutputUnwritable(format!("Invalid fourcc code: {fourcc}")));
        };
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::OutputUnwritable(format!("{} is not valid UTF-8", path.display())))?;

        let code = VideoWriter::fourcc(c1, c2, c3, c4)?;
        let writer = VideoWriter::new(path_str, code, fps, frame_size, true)?;
        if !writer.is_opened()? {
            return Err(Error::OutputUnwritable(format!(
                "Failed to open video writer for {}",
                path.display()
            )));
        }

        Ok(Self {
            writer,
            font_scale,
            draw_skeleton,
        })
    }

    fn draw_joints(&self, frame: &mut Mat, joints: &JointSet) -> Result<()> {
        let (width, height) = (frame.cols(), frame.rows());

        for (from, to) in joints.bones() {
            imgproc::line(
                frame,
                normalized_to_pixel(from.x, from.y, width, height),
                normalized_to_pixel(to.x, to.y, width, height),
                scalar(SKELETON_COLOR),
                2,
                LINE_8,
                0,
            )?;
        }

        for joint in joints.joints() {
            imgproc::circle(
                frame,
                normalized_to_pixel(joint.x, joint.y, width, height),
                4,
                scalar(NEUTRAL_COLOR),
                -1,
                LINE_8,
                0,
            )?;
        }

        Ok(())
    }

    fn put_line(&self, frame: &mut Mat, text: &str, line: i32, color: (f64, f64, f64)) -> Result<()> {
        imgproc::put_text(
            frame,
            text,
            Point::new(10, 30 + line * 30),
            FONT_HERSHEY_SIMPLEX,
            self.font_scale,
            scalar(color),
            2,
            LINE_8,
            false,
        )?;
        Ok(())
    }
}

impl FrameSink<Mat> for VideoAnnotator {
    fn write_frame(&mut self, frame: &Mat, joints: Option<&JointSet>, verdict: Option<&FrameVerdict>) -> Result<()> {
        let mut annotated = frame.try_clone()?;

        if self.draw_skeleton {
            if let Some(joints) = joints {
                self.draw_joints(&mut annotated, joints)?;
            }
        }

        match verdict {
            Some(verdict) => {
                let color = match &verdict.assessment {
                    Some(Assessment::Correct) => CORRECT_COLOR,
                    Some(Assessment::Incorrect(_)) => INCORRECT_COLOR,
                    _ => NEUTRAL_COLOR,
                };
                self.put_line(&mut annotated, &verdict.feedback(), 0, color)?;
                for (line, reason) in (1..).zip(verdict.assessment.iter().flat_map(Assessment::reasons)) {
                    self.put_line(&mut annotated, &reason, line, INCORRECT_COLOR)?;
                }
            }
            None => self.put_line(&mut annotated, "No Pose Detected", 0, NEUTRAL_COLOR)?,
        }

        self.writer.write(&annotated)?;
        Ok(())
    }
}
