use super::request::{normalize, parse_request, PredictionResponse};
use crate::artifact::{ArtifactError, ArtifactStore};
use crate::dataset::RawRecord;
use crate::model::{FittedModel, InferenceModel, ModelFamily};
use crate::preprocessing::{FeatureSchema, FittedFeaturePreprocessor, FittedTransformer};
use crossbeam::channel::{bounded, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("invalid field `{field}`: {reason}")]
    Validation { field: String, reason: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("prediction timed out after {0:?}")]
    Timeout(Duration),
}

impl ServiceError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<ArtifactError> for ServiceError {
    fn from(e: ArtifactError) -> Self {
        ServiceError::Unavailable(e.to_string())
    }
}

struct Loaded {
    preprocessor: FittedFeaturePreprocessor,
    model: FittedModel,
}

/// Serves predictions from one preprocessor and one model.
///
/// Both are loaded once and shared read-only, so clones are cheap and can be
/// used from any number of threads.
#[derive(Clone)]
pub struct InferenceService {
    inner: Arc<Loaded>,
}

impl InferenceService {
    /// Load both artifacts from `store`.
    pub fn load(store: &ArtifactStore) -> Result<Self, ServiceError> {
        let preprocessor: FittedFeaturePreprocessor = store.load()?;
        let model: FittedModel = store.load()?;
        let service = Self::from_parts(preprocessor, model)?;
        info!(
            dir = %store.dir().display(),
            family = %service.family(),
            n_features = service.inner.model.n_features_in(),
            "inference service ready"
        );
        Ok(service)
    }

    /// Like [`load`](Self::load), but also require the deployed schema to be `expected`.
    pub fn load_expecting(
        store: &ArtifactStore,
        expected: &FeatureSchema,
    ) -> Result<Self, ServiceError> {
        let service = Self::load(store)?;
        service
            .inner
            .preprocessor
            .check_schema(expected)
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;
        Ok(service)
    }

    pub fn from_parts(
        preprocessor: FittedFeaturePreprocessor,
        model: FittedModel,
    ) -> Result<Self, ServiceError> {
        let produced = preprocessor.n_features_out();
        let expected = model.n_features_in();
        if produced != expected {
            return Err(ServiceError::Unavailable(format!(
                "preprocessor produces {produced} features but the model expects {expected}"
            )));
        }
        Ok(Self {
            inner: Arc::new(Loaded {
                preprocessor,
                model,
            }),
        })
    }

    /// The fit-time schema requests are validated against.
    pub fn schema(&self) -> &FeatureSchema {
        self.inner.preprocessor.schema()
    }

    pub fn family(&self) -> ModelFamily {
        self.inner.model.family()
    }

    pub fn predict(&self, record: &RawRecord) -> Result<f64, ServiceError> {
        let normalized = normalize(self.schema(), record)?;
        self.predict_normalized(&normalized)
    }

    fn predict_normalized(&self, normalized: &RawRecord) -> Result<f64, ServiceError> {
        let row = self
            .inner
            .preprocessor
            .transform_one(normalized)
            .map_err(|e| ServiceError::Inference(e.to_string()))?;
        let prediction = self
            .inner
            .model
            .predict(row.view())
            .map_err(|e| ServiceError::Inference(e.to_string()))?;
        if !prediction.is_finite() {
            return Err(ServiceError::Inference(format!(
                "model produced a non-finite prediction ({prediction})"
            )));
        }
        Ok(prediction)
    }

    /// Predict many records; the first invalid record fails the batch.
    pub fn predict_batch(&self, records: &[RawRecord]) -> Result<Vec<f64>, ServiceError> {
        let normalized = records
            .iter()
            .map(|r| normalize(self.schema(), r))
            .collect::<Result<Vec<_>, _>>()?;
        let x = self
            .inner
            .preprocessor
            .transform(&normalized)
            .map_err(|e| ServiceError::Inference(e.to_string()))?;
        let predictions = self
            .inner
            .model
            .predict_batch(x.view())
            .map_err(|e| ServiceError::Inference(e.to_string()))?;
        if predictions.iter().any(|p| !p.is_finite()) {
            return Err(ServiceError::Inference(
                "model produced a non-finite prediction".to_string(),
            ));
        }
        Ok(predictions.to_vec())
    }

    /// Predict on a worker thread, giving up after `timeout`.
    ///
    /// A timed-out computation is abandoned, not cancelled; its result is dropped.
    pub fn predict_with_timeout(
        &self,
        record: RawRecord,
        timeout: Duration,
    ) -> Result<f64, ServiceError> {
        let (tx, rx) = bounded(1);
        let service = self.clone();
        thread::spawn(move || {
            let _ = tx.send(service.predict(&record));
        });
        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(ServiceError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ServiceError::Inference(
                "prediction worker stopped unexpectedly".to_string(),
            )),
        }
    }

    /// Serve one record, turning every failure into a generic message.
    pub fn respond(&self, record: &RawRecord) -> PredictionResponse {
        self.respond_inner(record, None)
    }

    /// [`respond`](Self::respond) bounded by `timeout`.
    pub fn respond_with_timeout(
        &self,
        record: &RawRecord,
        timeout: Duration,
    ) -> PredictionResponse {
        self.respond_inner(record, Some(timeout))
    }

    fn respond_inner(&self, record: &RawRecord, timeout: Option<Duration>) -> PredictionResponse {
        let outcome = normalize(self.schema(), record).and_then(|normalized| {
            let prediction = match timeout {
                Some(timeout) => self.predict_with_timeout(normalized.clone(), timeout)?,
                None => self.predict_normalized(&normalized)?,
            };
            Ok((prediction, normalized))
        });
        match outcome {
            Ok((prediction, normalized)) => PredictionResponse::success(prediction, normalized),
            Err(e) => {
                warn!(error = %e, "prediction request rejected");
                PredictionResponse::failure()
            }
        }
    }

    /// [`respond`](Self::respond) for a raw JSON body.
    pub fn respond_json(&self, body: &str) -> PredictionResponse {
        match parse_request(body) {
            Ok(record) => self.respond(&record),
            Err(e) => {
                warn!(error = %e, "malformed prediction request");
                PredictionResponse::failure()
            }
        }
    }

    /// End the service lifecycle. Other clones keep working until dropped.
    pub fn shutdown(self) {
        info!(
            remaining_handles = Arc::strong_count(&self.inner) - 1,
            "inference service shut down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use crate::model::{LinearRegression, ModelConfig};
    use crate::preprocessing::{FeaturePreprocessor, Transformer};
    use ndarray::Array1;
    use tempfile::tempdir;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(vec!["Duration".into()], vec!["Weather".into()])
    }

    fn training_rows() -> (Vec<RawRecord>, Array1<f64>) {
        let weathers = ["Sunny", "Rain", "Snow"];
        let rows: Vec<RawRecord> = (0..30)
            .map(|i| {
                RawRecord::new()
                    .with("Duration", i as f64)
                    .with("Weather", weathers[i % 3])
            })
            .collect();
        let y = (0..30).map(|i| 2.0 * i as f64 + (i % 3) as f64).collect();
        (rows, y)
    }

    fn service() -> InferenceService {
        let (rows, y) = training_rows();
        let preprocessor = FeaturePreprocessor::new(schema()).fit(&rows).unwrap();
        let x = preprocessor.transform(&rows).unwrap();
        let model = ModelConfig::LinearRegression(LinearRegression::default())
            .fit(x.view(), y.view())
            .unwrap();
        InferenceService::from_parts(preprocessor, model).unwrap()
    }

    fn request(duration: impl Into<Value>, weather: impl Into<Value>) -> RawRecord {
        RawRecord::new()
            .with("Duration", duration)
            .with("Weather", weather)
    }

    #[test]
    fn test_predict_matches_training_relationship() {
        let service = service();
        let prediction = service.predict(&request(10.0, "Rain")).unwrap();
        assert!((prediction - 21.0).abs() < 1e-6);
        let from_text = service.predict(&request("10", "Rain")).unwrap();
        assert_eq!(prediction, from_text);
    }

    #[test]
    fn test_missing_field_is_a_validation_error() {
        let service = service();
        let record = RawRecord::new().with("Weather", "Rain");
        let err = service.predict(&record).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "Duration"));
        // the service still works afterwards
        assert!(service.predict(&request(1.0, "Sunny")).is_ok());
    }

    #[test]
    fn test_null_is_imputed_and_unknown_category_tolerated() {
        let service = service();
        assert!(service.predict(&request(Value::Missing, "Rain")).is_ok());
        assert!(service.predict(&request(3.0, "Hail")).is_ok());
    }

    #[test]
    fn test_batch_matches_single() {
        let service = service();
        let records = vec![request(1.0, "Sunny"), request(20.0, "Snow")];
        let batch = service.predict_batch(&records).unwrap();
        for (record, expected) in records.iter().zip(&batch) {
            assert!((service.predict(record).unwrap() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_respond_never_fails() {
        let service = service();
        let ok = service.respond(&request(5.0, "Sunny").with("ProjectID", "P-1"));
        assert!(ok.is_success());
        assert!(!ok.input.as_ref().unwrap().contains("ProjectID"));

        let bad = service.respond(&RawRecord::new());
        assert!(!bad.is_success());
        assert!(bad.error.is_some());

        let malformed = service.respond_json("{\"Duration\": ");
        assert!(!malformed.is_success());
    }

    #[test]
    fn test_predict_with_timeout() {
        let service = service();
        let prediction = service
            .predict_with_timeout(request(10.0, "Rain"), Duration::from_secs(5))
            .unwrap();
        assert!((prediction - 21.0).abs() < 1e-6);

        let response = service.respond_with_timeout(&request(10.0, "Rain"), Duration::from_secs(5));
        assert_eq!(response.prediction, Some(prediction));
    }

    #[test]
    fn test_clones_share_state_across_threads() {
        let service = service();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let service = service.clone();
                thread::spawn(move || service.predict(&request(i as f64, "Snow")).unwrap())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_finite());
        }
        service.shutdown();
    }

    #[test]
    fn test_load_failures_are_unavailable() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(
            InferenceService::load(&store),
            Err(ServiceError::Unavailable(_))
        ));

        let (rows, _) = training_rows();
        let preprocessor = FeaturePreprocessor::new(schema()).fit(&rows).unwrap();
        let x = ndarray::array![[1.0], [2.0]];
        let y = ndarray::array![1.0, 2.0];
        let narrow = ModelConfig::LinearRegression(LinearRegression::default())
            .fit(x.view(), y.view())
            .unwrap();
        store.save(&preprocessor).unwrap();
        store.save(&narrow).unwrap();
        assert!(matches!(
            InferenceService::load(&store),
            Err(ServiceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_load_expecting_checks_schema() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let service = service();
        store.save(&service.inner.preprocessor).unwrap();
        store.save(&service.inner.model).unwrap();

        assert!(InferenceService::load_expecting(&store, &schema()).is_ok());
        let other = FeatureSchema::new(vec!["Cost".into()], vec!["Weather".into()]);
        assert!(matches!(
            InferenceService::load_expecting(&store, &other),
            Err(ServiceError::Unavailable(_))
        ));
    }
}
