//! Body landmark detection behind the [`PoseOracle`] seam.

use crate::{
    constants::{DEFAULT_POSE_INPUT_SIZE, MIN_LANDMARK_STRIDE, NUM_POSE_LANDMARKS},
    joints::{Joint, JointSet},
    utils::safe_cast::{u32_to_i32, usize_to_i32},
    Error, Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Size, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Source of body joints for a frame.
///
/// Implementations either find a body and return every joint, or report that
/// no body was found.
pub trait PoseOracle {
    /// Frame type the oracle consumes
    type Frame;

    /// Detect the joints of the most prominent body in `frame`
    ///
    /// # Errors
    ///
    /// Returns an error if inference itself fails; an empty frame or a frame
    /// without a person is `Ok(None)`
    fn detect(&mut self, frame: &Self::Frame) -> Result<Option<JointSet>>;
}

/// Memory layout expected by the model input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TensorLayout {
    Nhwc,
    Nchw,
}

/// BlazePose-style full-body landmark detector using `ONNX` Runtime
pub struct OnnxPoseDetector {
    session: Session,
    input_size: (i32, i32),
    layout: TensorLayout,
    min_detection_confidence: f32,
}

impl OnnxPoseDetector {
    /// Create a new pose detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file is missing or cannot be loaded
    /// - The model has no inputs or outputs
    /// - The ONNX runtime environment cannot be created
    pub fn new<P: AsRef<Path>>(model_path: P, min_detection_confidence: f32) -> Result<Self> {
        let model_path = model_path.as_ref();
        log::info!("Initializing OnnxPoseDetector with model: {}", model_path.display());
        if !model_path.is_file() {
            return Err(Error::ModelError(format!("Model file not found: {}", model_path.display())));
        }

        let environment = Arc::new(
            Environment::builder()
                .with_name("pose_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Model has no inputs".to_string()))?;
        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Model has no outputs".to_string()));
        }

        let (layout, input_size) = input_layout(&input_meta.dimensions)?;
        log::debug!("Pose model input {}x{} ({layout:?})", input_size.0, input_size.1);

        Ok(Self {
            session,
            input_size,
            layout,
            min_detection_confidence,
        })
    }

    /// Resize, convert to RGB and scale the frame to `[0, 1]`
    #[allow(clippy::cast_sign_loss)] // model dimensions are positive
    fn preprocess(&self, frame: &Mat) -> Result<Array4<f32>> {
        let (width, height) = (self.input_size.0 as usize, self.input_size.1 as usize);
        let channels = 3;

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(self.input_size.0, self.input_size.1),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let mut data = vec![0.0f32; height * width * channels];
        for row in 0..height {
            for col in 0..width {
                let pixel = float_image.at_2d::<opencv::core::Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..channels {
                    data[(row * width + col) * channels + ch] = pixel[ch];
                }
            }
        }

        let array = Array4::from_shape_vec((1, height, width, channels), data)
            .map_err(|e| Error::ModelDataFormatError(format!("Failed to create array: {e}")))?;

        Ok(match self.layout {
            TensorLayout::Nhwc => array,
            TensorLayout::Nchw => array.permuted_axes([0, 3, 1, 2]),
        })
    }

    /// Run inference, returning flat landmarks and the optional presence score
    fn forward(&self, inputs: Array4<f32>) -> Result<(Vec<f32>, Option<f32>)> {
        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;

        let landmarks_output = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?;
        let landmarks_tensor = landmarks_output.try_extract::<f32>()?;
        let landmarks_view = landmarks_tensor.view();
        let landmarks = landmarks_view.iter().copied().collect();

        let presence = match outputs.get(1) {
            Some(output) => {
                let tensor = output.try_extract::<f32>()?;
                let view = tensor.view();
                view.iter().next().copied()
            }
            None => None,
        };

        Ok((landmarks, presence))
    }

    /// Convert raw model output to a joint set
    fn postprocess(&self, landmarks: &[f32], presence: Option<f32>) -> Result<Option<JointSet>> {
        if let Some(score) = presence {
            if score < self.min_detection_confidence {
                log::debug!("Pose presence {score:.2} below threshold");
                return Ok(None);
            }
        }

        decode_landmarks(landmarks, self.input_size).map(Some)
    }
}

/// Decode flat landmark output given in model input pixels.
///
/// Each landmark occupies `len / 33` values, starting with x, y, z and a
/// visibility logit.
///
/// # Errors
///
/// Returns an error if the output holds fewer than four values per landmark
#[allow(clippy::cast_precision_loss)] // input sizes are small
pub fn decode_landmarks(landmarks: &[f32], input_size: (i32, i32)) -> Result<JointSet> {
    let stride = landmarks.len() / NUM_POSE_LANDMARKS;
    if stride < MIN_LANDMARK_STRIDE {
        return Err(Error::ModelOutputError(format!(
            "Expected at least {} landmark values, got {}",
            NUM_POSE_LANDMARKS * MIN_LANDMARK_STRIDE,
            landmarks.len()
        )));
    }

    let (width, height) = (input_size.0 as f32, input_size.1 as f32);
    let joints: Vec<Joint> = landmarks
        .chunks_exact(stride)
        .take(NUM_POSE_LANDMARKS)
        .map(|values| Joint {
            x: f64::from(values[0] / width),
            y: f64::from(values[1] / height),
            visibility: f64::from(sigmoid(values[3])),
        })
        .collect();

    JointSet::from_landmarks(&joints)
}

/// Layout and `(width, height)` of the model input from its declared dimensions.
///
/// Dynamic dimensions fall back to the default input size.
fn input_layout(dims: &[Option<u32>]) -> Result<(TensorLayout, (i32, i32))> {
    let dim = |d: Option<u32>| d.map_or(Ok(DEFAULT_POSE_INPUT_SIZE), u32_to_i32);

    // [batch, height, width, 3] for TFLite conversions, [batch, 3, height, width] otherwise
    if dims.len() < 4 {
        log::warn!("Unexpected input rank {}, assuming 256x256 NHWC", dims.len());
        return Ok((TensorLayout::Nhwc, (DEFAULT_POSE_INPUT_SIZE, DEFAULT_POSE_INPUT_SIZE)));
    }
    if dims[1] == Some(3) {
        Ok((TensorLayout::Nchw, (dim(dims[3])?, dim(dims[2])?)))
    } else {
        Ok((TensorLayout::Nhwc, (dim(dims[2])?, dim(dims[1])?)))
    }
}

fn sigmoid(logit: f32) -> f32 {
    1.0 / (1.0 + (-logit).exp())
}

impl PoseOracle for OnnxPoseDetector {
    type Frame = Mat;

    fn detect(&mut self, frame: &Mat) -> Result<Option<JointSet>> {
        if frame.empty() {
            return Ok(None);
        }

        let input = self.preprocess(frame)?;
        let (landmarks, presence) = self.forward(input)?;
        self.postprocess(&landmarks, presence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_midpoint() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }

    fn blazepose_output(x: f32, y: f32, visibility_logit: f32) -> Vec<f32> {
        (0..NUM_POSE_LANDMARKS)
            .flat_map(|_| [x, y, 0.0, visibility_logit, 0.0])
            .collect()
    }

    #[test]
    fn test_decode_normalizes_coordinates() {
        let joints = decode_landmarks(&blazepose_output(128.0, 64.0, 0.0), (256, 256)).unwrap();
        assert!((joints.left_knee.x - 0.5).abs() < 1e-6);
        assert!((joints.left_knee.y - 0.25).abs() < 1e-6);
        assert!((joints.left_knee.visibility - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_accepts_four_value_stride() {
        let values: Vec<f32> = (0..NUM_POSE_LANDMARKS).flat_map(|_| [25.6, 25.6, 0.0, 5.0]).collect();
        let joints = decode_landmarks(&values, (256, 256)).unwrap();
        assert!((joints.nose.x - 0.1).abs() < 1e-6);
        assert!(joints.nose.visibility > 0.99);
    }

    #[test]
    fn test_decode_rejects_short_output() {
        let values = vec![0.0f32; NUM_POSE_LANDMARKS * 2];
        assert!(matches!(
            decode_landmarks(&values, (256, 256)),
            Err(Error::ModelOutputError(_))
        ));
    }

    #[test]
    fn test_input_layout() {
        let (layout, size) = input_layout(&[Some(1), Some(256), Some(192), Some(3)]).unwrap();
        assert_eq!(layout, TensorLayout::Nhwc);
        assert_eq!(size, (192, 256));

        let (layout, size) = input_layout(&[Some(1), Some(3), Some(224), None]).unwrap();
        assert_eq!(layout, TensorLayout::Nchw);
        assert_eq!(size, (DEFAULT_POSE_INPUT_SIZE, 224));

        let (_, size) = input_layout(&[Some(1), Some(3)]).unwrap();
        assert_eq!(size, (DEFAULT_POSE_INPUT_SIZE, DEFAULT_POSE_INPUT_SIZE));
    }

    #[test]
    fn test_oversized_input_dimension_is_rejected() {
        let result = input_layout(&[Some(1), Some(u32::MAX), Some(256), Some(3)]);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_default_input_size() {
        assert_eq!(DEFAULT_POSE_INPUT_SIZE, 256);
    }
}
