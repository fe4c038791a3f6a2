//! Haar-cascade face localization and crop preprocessing.
//!
//! Detection runs over a grayscale conversion of the frame with fixed
//! cascade parameters. Detection order is detector-dependent; nothing
//! downstream may rely on face ordering being stable across frames.

use ndarray::Array4;

use emotrace_models::FaceBox;

use crate::engine::InputShape;

/// One face, cropped and normalized for inference.
///
/// Ephemeral: owned by the inference call that consumes it and dropped
/// immediately after, along with any device-side copy.
#[derive(Debug, Clone)]
pub struct FaceCrop {
    /// Where the face sits in the source frame
    pub bounding_box: FaceBox,
    /// Grayscale NCHW tensor, values in [0, 1]
    pub tensor: Array4<f32>,
}

/// Cascade parameters, fixed for the deployed detector.
#[cfg(feature = "opencv")]
const SCALE_FACTOR: f64 = 1.1;
#[cfg(feature = "opencv")]
const MIN_NEIGHBORS: i32 = 5;
#[cfg(feature = "opencv")]
const MIN_FACE_SIZE: i32 = 30;

#[cfg(feature = "opencv")]
pub use imp::FaceLocalizer;

#[cfg(feature = "opencv")]
mod imp {
    use std::path::Path;

    use ndarray::Array4;
    use opencv::core::{Mat, Rect, Size, Vector};
    use opencv::imgproc;
    use opencv::objdetect::CascadeClassifier;
    use opencv::prelude::*;
    use tracing::debug;

    use emotrace_models::FaceBox;

    use super::{FaceCrop, MIN_FACE_SIZE, MIN_NEIGHBORS, SCALE_FACTOR};
    use crate::engine::InputShape;
    use crate::error::{MediaError, MediaResult};

    /// Haar-cascade face detector.
    #[derive(Debug)]
    pub struct FaceLocalizer {
        cascade: CascadeClassifier,
    }

    impl FaceLocalizer {
        /// Load the frontal-face cascade from disk.
        pub fn new(cascade_path: &Path) -> MediaResult<Self> {
            let path = cascade_path.to_str().ok_or_else(|| {
                MediaError::model_load(cascade_path, "cascade path is not valid UTF-8")
            })?;
            let cascade = CascadeClassifier::new(path)
                .map_err(|e| MediaError::model_load(cascade_path, format!("cascade load: {e}")))?;
            if cascade
                .empty()
                .map_err(|e| MediaError::model_load(cascade_path, format!("cascade check: {e}")))?
            {
                return Err(MediaError::model_load(cascade_path, "cascade is empty"));
            }
            Ok(Self { cascade })
        }

        /// Detect faces in a BGR frame.
        ///
        /// Zero faces is an empty vec, never an error.
        pub fn detect(&mut self, frame: &Mat) -> MediaResult<Vec<FaceBox>> {
            let gray = to_grayscale(frame)?;

            let mut faces = Vector::<Rect>::new();
            self.cascade
                .detect_multi_scale(
                    &gray,
                    &mut faces,
                    SCALE_FACTOR,
                    MIN_NEIGHBORS,
                    0,
                    Size::new(MIN_FACE_SIZE, MIN_FACE_SIZE),
                    Size::new(0, 0),
                )
                .map_err(|e| MediaError::detection_failed(format!("detect_multi_scale: {e}")))?;

            let boxes: Vec<FaceBox> = faces
                .iter()
                .map(|r| FaceBox::new(r.x, r.y, r.width, r.height))
                .collect();
            debug!(faces = boxes.len(), "Face detection pass");
            Ok(boxes)
        }

        /// Crop one face and normalize it to the model's input tensor.
        ///
        /// The box is clamped to the frame before cropping; the crop is
        /// grayscale, resized to the model's (height, width), scaled to
        /// [0, 1] and laid out as a single-batch single-channel tensor.
        pub fn crop_and_normalize(
            &self,
            frame: &Mat,
            face: FaceBox,
            shape: InputShape,
        ) -> MediaResult<FaceCrop> {
            let frame_size = frame
                .size()
                .map_err(|e| MediaError::detection_failed(format!("frame size: {e}")))?;
            let clamped = face
                .clamped_to(frame_size.width, frame_size.height)
                .ok_or_else(|| {
                    MediaError::invalid_input(format!("face box {face:?} lies outside the frame"))
                })?;

            let gray = to_grayscale(frame)?;
            let roi = Mat::roi(
                &gray,
                Rect::new(clamped.x, clamped.y, clamped.width, clamped.height),
            )
            .map_err(|e| MediaError::detection_failed(format!("face ROI: {e}")))?;

            // Clone so the data is continuous in memory before resize
            let face_mat = roi
                .try_clone()
                .map_err(|e| MediaError::detection_failed(format!("ROI clone: {e}")))?;

            let mut resized = Mat::default();
            imgproc::resize(
                &face_mat,
                &mut resized,
                Size::new(shape.width as i32, shape.height as i32),
                0.0,
                0.0,
                imgproc::INTER_LINEAR,
            )
            .map_err(|e| MediaError::detection_failed(format!("face resize: {e}")))?;

            let pixels = resized
                .data_bytes()
                .map_err(|e| MediaError::detection_failed(format!("face data: {e}")))?;
            let normalized: Vec<f32> = pixels.iter().map(|&p| p as f32 / 255.0).collect();

            let tensor = Array4::from_shape_vec((1, 1, shape.height, shape.width), normalized)
                .map_err(|e| MediaError::invalid_input(format!("tensor layout: {e}")))?;

            Ok(FaceCrop {
                bounding_box: clamped,
                tensor,
            })
        }
    }

    fn to_grayscale(frame: &Mat) -> MediaResult<Mat> {
        if frame.channels() == 1 {
            return frame
                .try_clone()
                .map_err(|e| MediaError::detection_failed(format!("frame clone: {e}")));
        }
        let mut gray = Mat::default();
        imgproc::cvt_color(
            frame,
            &mut gray,
            imgproc::COLOR_BGR2GRAY,
            0,
        )
        .map_err(|e| MediaError::detection_failed(format!("bgr2gray: {e}")))?;
        Ok(gray)
    }

}

/// Build a normalized crop tensor from raw grayscale pixels.
///
/// Shared by the OpenCV path and by tests that synthesize crops without
/// a decoder.
pub fn tensor_from_gray_pixels(
    pixels: &[u8],
    shape: InputShape,
    bounding_box: FaceBox,
) -> crate::error::MediaResult<FaceCrop> {
    let expected = shape.height * shape.width;
    if pixels.len() != expected {
        return Err(crate::error::MediaError::invalid_input(format!(
            "expected {expected} pixels for {}x{}, got {}",
            shape.height,
            shape.width,
            pixels.len()
        )));
    }
    let normalized: Vec<f32> = pixels.iter().map(|&p| p as f32 / 255.0).collect();
    let tensor = Array4::from_shape_vec((1, 1, shape.height, shape.width), normalized)
        .map_err(|e| crate::error::MediaError::invalid_input(format!("tensor layout: {e}")))?;
    Ok(FaceCrop {
        bounding_box,
        tensor,
    })
}
