//! ONNX Runtime wrapper for the emotion model.
//!
//! Owns the compiled model session and the execution context for the
//! lifetime of the detector instance. This is the only module touching
//! device memory explicitly: every `infer` call allocates its input and
//! output buffers, transfers, executes, and frees them again before
//! returning.
//!
//! The execution context is not reentrant. Calls are serialized through
//! a `Mutex` on the context; concurrent use of one engine from multiple
//! workers queues on that lock rather than duplicating contexts.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value, ValueType};
use tracing::{debug, info};

use crate::device::{BufferId, DeviceAllocator, DeviceBuffer};
use crate::error::{MediaError, MediaResult};

/// Engine construction parameters, passed in explicitly.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the serialized ONNX emotion model
    pub model_path: PathBuf,
}

impl EngineConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }
}

/// Input tensor shape declared by the model, NCHW.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl InputShape {
    /// Total element count of one input tensor.
    pub fn elements(&self) -> usize {
        self.batch * self.channels * self.height * self.width
    }
}

/// Device buffers bound to one execution.
#[derive(Debug, Clone, Copy)]
pub struct Bindings {
    pub input: BufferId,
    pub output: BufferId,
}

/// Synchronous model execution over bound device buffers.
///
/// Implementations read the input tensor from `bindings.input`, run the
/// model, and write per-class scores to `bindings.output`.
pub trait ExecutionContext: Send {
    fn execute(&mut self, allocator: &dyn DeviceAllocator, bindings: Bindings)
        -> MediaResult<()>;
}

/// ONNX Runtime execution context.
struct OrtContext {
    session: Session,
    input_shape: InputShape,
    output_len: usize,
}

impl OrtContext {
    fn load(model_path: &Path) -> MediaResult<Self> {
        if !model_path.exists() {
            return Err(MediaError::model_load(model_path, "model file not found"));
        }

        let session = Session::builder()
            .map_err(|e| MediaError::model_load(model_path, format!("ORT session builder: {e}")))?
            // Prefer optimized graph on CPU; CUDA feature can be enabled externally
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| MediaError::model_load(model_path, format!("ORT opt level: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| MediaError::model_load(model_path, format!("ORT load model: {e}")))?;

        let input = session
            .inputs()
            .first()
            .ok_or_else(|| MediaError::NoInputBinding(model_path.to_path_buf()))?;
        let input_dims = tensor_dims(input.dtype())
            .ok_or_else(|| MediaError::NoInputBinding(model_path.to_path_buf()))?;
        let input_shape = resolve_input_shape(model_path, &input_dims)?;

        let output = session.outputs().first().ok_or_else(|| {
            MediaError::model_load(model_path, "model declares no output binding")
        })?;
        let output_dims = tensor_dims(output.dtype()).ok_or_else(|| {
            MediaError::model_load(model_path, "output binding is not a tensor")
        })?;
        let output_len = resolve_output_len(model_path, &output_dims)?;

        info!(
            model = %model_path.display(),
            input = %input.name(),
            shape = ?input_shape,
            output_len,
            "Emotion model loaded"
        );

        Ok(Self {
            session,
            input_shape,
            output_len,
        })
    }
}

impl ExecutionContext for OrtContext {
    fn execute(
        &mut self,
        allocator: &dyn DeviceAllocator,
        bindings: Bindings,
    ) -> MediaResult<()> {
        let shape = self.input_shape;
        let mut host_input = vec![0.0f32; shape.elements()];
        allocator.download(bindings.input, &mut host_input)?;

        let tensor: Value = Tensor::from_array((
            vec![shape.batch, shape.channels, shape.height, shape.width],
            host_input.into_boxed_slice(),
        ))
        .map(Value::from)
        .map_err(|e| MediaError::inference_execution(format!("ORT tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|e| MediaError::inference_execution(format!("ORT run failed: {e}")))?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| MediaError::inference_execution("ORT returned no outputs"))?;

        let (_, scores) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::inference_execution(format!("ORT extract: {e}")))?;

        if scores.len() < self.output_len {
            return Err(MediaError::inference_execution(format!(
                "model emitted {} scores, expected {}",
                scores.len(),
                self.output_len
            )));
        }

        allocator.upload(bindings.output, &scores[..self.output_len])
    }
}

fn tensor_dims(value_type: &ValueType) -> Option<Vec<i64>> {
    match value_type {
        ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
        _ => None,
    }
}

/// Resolve the declared NCHW input shape. A dynamic batch dimension
/// resolves to 1; any other dynamic dimension is a load error.
fn resolve_input_shape(model_path: &Path, dims: &[i64]) -> MediaResult<InputShape> {
    if dims.len() != 4 {
        return Err(MediaError::model_load(
            model_path,
            format!("expected NCHW input binding, got {dims:?}"),
        ));
    }
    let batch = if dims[0] <= 0 { 1 } else { dims[0] as usize };
    let fixed = |dim: i64, name: &str| -> MediaResult<usize> {
        if dim <= 0 {
            return Err(MediaError::model_load(
                model_path,
                format!("dynamic {name} dimension in input binding: {dims:?}"),
            ));
        }
        Ok(dim as usize)
    };
    Ok(InputShape {
        batch,
        channels: fixed(dims[1], "channel")?,
        height: fixed(dims[2], "height")?,
        width: fixed(dims[3], "width")?,
    })
}

/// Resolve the per-call output element count, ignoring a dynamic batch.
fn resolve_output_len(model_path: &Path, dims: &[i64]) -> MediaResult<usize> {
    let mut len = 1usize;
    for (i, &dim) in dims.iter().enumerate() {
        if dim <= 0 {
            if i == 0 {
                continue;
            }
            return Err(MediaError::model_load(
                model_path,
                format!("dynamic dimension in output binding: {dims:?}"),
            ));
        }
        len *= dim as usize;
    }
    if len == 0 {
        return Err(MediaError::model_load(model_path, "empty output binding"));
    }
    Ok(len)
}

/// Emotion inference engine.
///
/// One compiled model, one execution context, shared across a worker's
/// jobs via `Arc`. `infer` handles exactly one face crop per call.
pub struct EmotionEngine {
    context: Mutex<Box<dyn ExecutionContext>>,
    allocator: Arc<dyn DeviceAllocator>,
    input_shape: InputShape,
    output_len: usize,
}

impl std::fmt::Debug for EmotionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmotionEngine")
            .field("input_shape", &self.input_shape)
            .field("output_len", &self.output_len)
            .finish_non_exhaustive()
    }
}

impl EmotionEngine {
    /// Deserialize the model and build its execution context.
    pub fn load(config: &EngineConfig, allocator: Arc<dyn DeviceAllocator>) -> MediaResult<Self> {
        let context = OrtContext::load(&config.model_path)?;
        let input_shape = context.input_shape;
        let output_len = context.output_len;
        Ok(Self {
            context: Mutex::new(Box::new(context)),
            allocator,
            input_shape,
            output_len,
        })
    }

    /// Build an engine around an explicit execution context.
    ///
    /// Used by tests to substitute deterministic or fault-injecting
    /// contexts for the runtime.
    pub fn with_context(
        context: Box<dyn ExecutionContext>,
        allocator: Arc<dyn DeviceAllocator>,
        input_shape: InputShape,
        output_len: usize,
    ) -> Self {
        Self {
            context: Mutex::new(context),
            allocator,
            input_shape,
            output_len,
        }
    }

    /// Input tensor shape the model expects.
    pub fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    /// Number of per-class scores the model emits.
    pub fn output_len(&self) -> usize {
        self.output_len
    }

    /// Run one face crop through the model and return its class scores.
    ///
    /// Allocates input and output device buffers, copies host to device,
    /// executes synchronously, copies device to host, and frees both
    /// buffers before returning. The RAII guards release on the failure
    /// paths too, so a failed execution leaks nothing.
    pub fn infer(&self, tensor: &Array4<f32>) -> MediaResult<Vec<f32>> {
        let shape = self.input_shape;
        let dims = tensor.dim();
        if dims != (shape.batch, shape.channels, shape.height, shape.width) {
            return Err(MediaError::invalid_input(format!(
                "tensor shape {dims:?} does not match model input {shape:?}"
            )));
        }
        let host_input = tensor.as_slice().ok_or_else(|| {
            MediaError::invalid_input("input tensor is not in standard layout")
        })?;

        let input = DeviceBuffer::new(self.allocator.as_ref(), shape.elements())?;
        self.allocator.upload(input.id(), host_input)?;
        let output = DeviceBuffer::new(self.allocator.as_ref(), self.output_len)?;

        let mut context = self
            .context
            .lock()
            .map_err(|_| MediaError::inference_execution("execution context poisoned"))?;
        context.execute(
            self.allocator.as_ref(),
            Bindings {
                input: input.id(),
                output: output.id(),
            },
        )?;
        drop(context);

        let mut scores = vec![0.0f32; self.output_len];
        self.allocator.download(output.id(), &mut scores)?;
        debug!(scores = scores.len(), "Inference complete");
        Ok(scores)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::device::StagingAllocator;

    fn unit_tensor(shape: InputShape) -> Array4<f32> {
        Array4::zeros((shape.batch, shape.channels, shape.height, shape.width))
    }

    #[test]
    fn test_infer_returns_scores_and_frees_buffers() {
        let (engine, allocator) = fixed_engine(vec![0.1, 0.2, 0.7]);
        let scores = engine.infer(&unit_tensor(test_shape())).unwrap();
        assert_eq!(scores, vec![0.1, 0.2, 0.7]);
        assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn test_failed_execution_frees_buffers() {
        let allocator = Arc::new(StagingAllocator::new());
        let engine = EmotionEngine::with_context(
            Box::new(FailingContext),
            allocator.clone(),
            test_shape(),
            7,
        );
        let err = engine.infer(&unit_tensor(test_shape())).unwrap_err();
        assert!(matches!(err, MediaError::InferenceExecution(_)));
        assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn test_shape_mismatch_is_invalid_input() {
        let (engine, allocator) = fixed_engine(vec![1.0; 7]);
        let wrong = Array4::<f32>::zeros((1, 1, 32, 32));
        let err = engine.infer(&wrong).unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
        assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn test_load_missing_model_fails() {
        let allocator: Arc<dyn DeviceAllocator> = Arc::new(StagingAllocator::new());
        let config = EngineConfig::new("/nonexistent/emotion_model.onnx");
        let err = EmotionEngine::load(&config, allocator).unwrap_err();
        assert!(matches!(err, MediaError::ModelLoad { .. }));
    }

    #[test]
    fn test_load_undeserializable_model_fails() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emotion_model.onnx");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"not an onnx model").unwrap();

        let allocator: Arc<dyn DeviceAllocator> = Arc::new(StagingAllocator::new());
        let err = EmotionEngine::load(&EngineConfig::new(&path), allocator).unwrap_err();
        assert!(matches!(err, MediaError::ModelLoad { .. }));
    }

    #[test]
    fn test_resolve_input_shape_dynamic_batch() {
        let path = Path::new("model.onnx");
        let shape = resolve_input_shape(path, &[-1, 1, 48, 48]).unwrap();
        assert_eq!(
            shape,
            InputShape {
                batch: 1,
                channels: 1,
                height: 48,
                width: 48
            }
        );
        assert!(resolve_input_shape(path, &[1, 1, -1, 48]).is_err());
        assert!(resolve_input_shape(path, &[1, 48, 48]).is_err());
    }

    #[test]
    fn test_resolve_output_len() {
        let path = Path::new("model.onnx");
        assert_eq!(resolve_output_len(path, &[1, 7]).unwrap(), 7);
        assert_eq!(resolve_output_len(path, &[-1, 7]).unwrap(), 7);
        assert!(resolve_output_len(path, &[1, -1]).is_err());
    }
}
