use std::path::Path;
use std::sync::{Arc, Mutex};

use ndarray::prelude::*;
use ndarray::CowArray;
use ort::tensor::OrtOwnedTensor;
use ort::{Environment, ExecutionProvider, GraphOptimizationLevel, Session, SessionBuilder, Value};
use tracing::info;

use crate::error::{DetectError, DetectResult};
use crate::face_detection::{Cascade, ScoreMap, ScoringStage, StageOutput};

const PROBABILITY_CHANNELS: usize = 2;
const REGRESSION_CHANNELS: usize = 4;
const LANDMARK_CHANNELS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Net {
    Proposal,
    Refine,
    Output,
}

impl Net {
    fn name(self) -> &'static str {
        match self {
            Net::Proposal => "proposal",
            Net::Refine => "refine",
            Net::Output => "output",
        }
    }
}

// one runtime session per cascade stage
struct Sessions {
    _environment: Arc<Environment>,
    proposal: Session,
    refine: Session,
    output: Session,
}

impl Sessions {
    fn get(&self, net: Net) -> &Session {
        match net {
            Net::Proposal => &self.proposal,
            Net::Refine => &self.refine,
            Net::Output => &self.output,
        }
    }
}

/// Scoring stage backed by an ONNX Runtime session.
///
/// The three stages of one cascade share a single lock: at most one inference
/// is in flight per loaded model set, whatever the number of callers.
pub struct OnnxStage {
    sessions: Arc<Mutex<Sessions>>,
    net: Net,
}

/// Loads `pnet.onnx`, `rnet.onnx` and `onet.onnx` from `model_dir` into a
/// cascade of ONNX backed stages.
pub fn load_cascade(model_dir: &Path, intra_threads: i16) -> DetectResult<Cascade> {
    let environment = Environment::builder()
        .with_name("mtcnn")
        .with_execution_providers([ExecutionProvider::CPU(Default::default())])
        .build()?
        .into_arc();

    let load = |file: &str| -> DetectResult<Session> {
        let path = model_dir.join(file);
        if !path.is_file() {
            return Err(DetectError::MissingModel(path));
        }
        info!(path = %path.display(), "loading model");
        Ok(SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .with_model_from_file(path)?)
    };

    let sessions = Arc::new(Mutex::new(Sessions {
        _environment: Arc::clone(&environment),
        proposal: load("pnet.onnx")?,
        refine: load("rnet.onnx")?,
        output: load("onet.onnx")?,
    }));

    let stage = |net| -> Box<dyn ScoringStage> {
        Box::new(OnnxStage {
            sessions: Arc::clone(&sessions),
            net,
        })
    };

    Ok(Cascade {
        proposal: stage(Net::Proposal),
        refine: stage(Net::Refine),
        output: stage(Net::Output),
    })
}

impl OnnxStage {
    // outputs come back keyed by their channel count
    fn infer(&self, input: CowArray<f32, IxDyn>) -> DetectResult<Vec<(usize, ArrayD<f32>)>> {
        let sessions = self.sessions.lock().map_err(|_| DetectError::LockPoisoned)?;
        let session = sessions.get(self.net);

        let input = CowArray::from(input.view());
        let inputs = vec![Value::from_array(session.allocator(), &input)?];
        let outputs: Vec<Value> = session.run(inputs)?;

        let mut arrays = Vec::with_capacity(outputs.len());
        for output in &outputs {
            let tensor: OrtOwnedTensor<f32, _> = output.try_extract()?;
            let array = tensor.view().as_standard_layout().into_owned();
            let channels = array.shape().get(1).copied().unwrap_or(0);
            arrays.push((channels, array));
        }
        Ok(arrays)
    }

    fn take(
        &self,
        outputs: &mut Vec<(usize, ArrayD<f32>)>,
        channels: usize,
        output: &'static str,
    ) -> DetectResult<ArrayD<f32>> {
        let position = outputs
            .iter()
            .position(|(c, _)| *c == channels)
            .ok_or(DetectError::MissingOutput {
                stage: self.net.name(),
                output,
            })?;
        Ok(outputs.remove(position).1)
    }
}

// flattens (n, c, 1, 1) heads of convolutional exports to (n, c)
fn to_rows(array: ArrayD<f32>, batch: usize, channels: usize) -> DetectResult<Array2<f32>> {
    Ok(array.into_shape((batch, channels))?)
}

impl ScoringStage for OnnxStage {
    fn score(&self, patches: ArrayView4<f32>) -> DetectResult<StageOutput> {
        let batch = patches.shape()[0];
        let input = CowArray::from(patches.into_dyn());
        let mut outputs = self.infer(input)?;

        let probabilities = to_rows(
            self.take(&mut outputs, PROBABILITY_CHANNELS, "probabilities")?,
            batch,
            PROBABILITY_CHANNELS,
        )?;
        let regression = to_rows(
            self.take(&mut outputs, REGRESSION_CHANNELS, "box regression")?,
            batch,
            REGRESSION_CHANNELS,
        )?;
        let landmarks = match self.net {
            Net::Output => Some(to_rows(
                self.take(&mut outputs, LANDMARK_CHANNELS, "landmarks")?,
                batch,
                LANDMARK_CHANNELS,
            )?),
            _ => None,
        };

        Ok(StageOutput {
            scores: probabilities.column(1).to_owned(),
            regression,
            landmarks,
        })
    }

    // the proposal net is fully convolutional: one pass per pyramid level
    fn score_map(&self, level: ArrayView3<f32>) -> DetectResult<ScoreMap> {
        let input = CowArray::from(level.insert_axis(Axis(0)).into_dyn());
        let mut outputs = self.infer(input)?;

        let probabilities = self
            .take(&mut outputs, PROBABILITY_CHANNELS, "probabilities")?
            .into_dimensionality::<Ix4>()?;
        let regression = self
            .take(&mut outputs, REGRESSION_CHANNELS, "box regression")?
            .into_dimensionality::<Ix4>()?;

        Ok(ScoreMap {
            scores: probabilities.slice(s![0, 1, .., ..]).to_owned(),
            regression: regression
                .slice(s![0, .., .., ..])
                .permuted_axes([1, 2, 0])
                .as_standard_layout()
                .into_owned(),
        })
    }
}
