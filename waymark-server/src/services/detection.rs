//! Landmark detection pipeline
//!
//! Orchestrates classifier → parser → geocoder into a
//! [`DetectedLocation`]. Only the classify stage can fail hard; parsing
//! always produces a candidate (possibly sentinel-named) and geocoding is
//! best-effort. The pipeline keeps no state between calls, so retries and
//! concurrent detections are safe, and an abandoned call's result can
//! simply be dropped.

use base64::Engine;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use waymark_common::models::{DetectedLocation, Difficulty, UNKNOWN_LOCATION};

use super::classifier::{Classifier, ClassifierError, PromptVariant};
use super::geocoder::Geocoder;
use super::parser;

/// Hard pipeline failure: the classify stage could not complete.
///
/// Distinct from a soft failure, where the pipeline returns normally with
/// a sentinel-named result and the caller offers a retry.
#[derive(Debug, Error)]
#[error("Landmark detection failed: {source}")]
pub struct DetectionError {
    #[from]
    source: ClassifierError,
}

/// One pipeline instance serves all requests; per-call state lives on the
/// stack of `detect`.
pub struct DetectionPipeline {
    classifier: Arc<dyn Classifier>,
    geocoder: Arc<dyn Geocoder>,
}

impl DetectionPipeline {
    pub fn new(classifier: Arc<dyn Classifier>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            classifier,
            geocoder,
        }
    }

    /// Run the full detection pipeline on one image.
    pub async fn detect(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<DetectedLocation, DetectionError> {
        tracing::debug!(bytes = image.len(), mime_type = %mime_type, "Starting landmark detection");

        let raw = self
            .classifier
            .classify(image, mime_type, PromptVariant::StructuredJson)
            .await?;

        let candidate = parser::parse_candidate(&raw);

        // no real place to resolve for a sentinel location
        let coordinates = if candidate.location == UNKNOWN_LOCATION {
            None
        } else {
            self.geocoder.resolve(&candidate.location).await
        };

        let detected = DetectedLocation {
            id: Uuid::new_v4(),
            name: candidate.name,
            description: candidate.description,
            location: candidate.location,
            coordinates,
            image_reference: data_uri(image, mime_type),
            difficulty: Difficulty::default(),
        };

        if detected.is_soft_failure() {
            tracing::info!(id = %detected.id, "Detection completed without a confident identification");
        } else {
            tracing::info!(
                id = %detected.id,
                name = %detected.name,
                geocoded = detected.coordinates.is_some(),
                "Landmark detected"
            );
        }

        Ok(detected)
    }

    /// Free-form image analysis (no parsing or geocoding).
    pub async fn analyze(&self, image: &[u8], mime_type: &str) -> Result<String, DetectionError> {
        let raw = self
            .classifier
            .classify(image, mime_type, PromptVariant::FreeForm)
            .await?;
        Ok(raw.trim().to_string())
    }
}

/// Embed the input image as a `data:` URI reference
fn data_uri(image: &[u8], mime_type: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(image)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use waymark_common::models::{Coordinates, UNKNOWN_LANDMARK};

    struct StubClassifier {
        response: Result<String, fn() -> ClassifierError>,
    }

    impl StubClassifier {
        fn returning(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(|| ClassifierError::Unavailable("connection refused".to_string())),
            }
        }
    }

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(
            &self,
            _image: &[u8],
            _mime_type: &str,
            _variant: PromptVariant,
        ) -> Result<String, ClassifierError> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    struct StubGeocoder {
        coordinates: Option<Coordinates>,
        called: std::sync::atomic::AtomicBool,
    }

    impl StubGeocoder {
        fn returning(coordinates: Option<Coordinates>) -> Self {
            Self {
                coordinates,
                called: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn resolve(&self, _query: &str) -> Option<Coordinates> {
            self.called
                .store(true, std::sync::atomic::Ordering::SeqCst);
            self.coordinates
        }
    }

    fn pipeline(
        classifier: StubClassifier,
        geocoder: Arc<StubGeocoder>,
    ) -> DetectionPipeline {
        DetectionPipeline::new(Arc::new(classifier), geocoder)
    }

    #[tokio::test]
    async fn detect_happy_path_assigns_id_and_coordinates() {
        let geocoder = Arc::new(StubGeocoder::returning(Some(Coordinates {
            lat: 48.8584,
            lon: 2.2945,
        })));
        let pipeline = pipeline(
            StubClassifier::returning(
                "```json\n{\"name\":\"X\",\"description\":\"Y\",\"location\":\"Z\"}\n```",
            ),
            geocoder.clone(),
        );

        let detected = pipeline.detect(b"jpeg-bytes", "image/jpeg").await.unwrap();
        assert_eq!(detected.name, "X");
        assert_eq!(detected.description, "Y");
        assert_eq!(detected.location, "Z");
        assert!(detected.coordinates.is_some());
        assert_eq!(detected.difficulty, Difficulty::Medium);
        assert!(!detected.is_soft_failure());
    }

    #[tokio::test]
    async fn detect_embeds_image_as_data_uri() {
        let geocoder = Arc::new(StubGeocoder::returning(None));
        let pipeline = pipeline(
            StubClassifier::returning(r#"{"name":"X","description":"Y","location":"Z"}"#),
            geocoder,
        );

        let detected = pipeline.detect(&[0xFF, 0xD8, 0xFF], "image/jpeg").await.unwrap();
        assert!(detected.image_reference.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn prose_output_is_a_soft_failure_not_an_error() {
        let geocoder = Arc::new(StubGeocoder::returning(None));
        let pipeline = pipeline(StubClassifier::returning("I see a tower."), geocoder.clone());

        let detected = pipeline.detect(b"img", "image/png").await.unwrap();
        assert_eq!(detected.name, UNKNOWN_LANDMARK);
        assert!(detected.is_soft_failure());
    }

    #[tokio::test]
    async fn unknown_location_skips_the_geocode_call() {
        let geocoder = Arc::new(StubGeocoder::returning(Some(Coordinates {
            lat: 1.0,
            lon: 2.0,
        })));
        let pipeline = pipeline(StubClassifier::returning("just prose"), geocoder.clone());

        let detected = pipeline.detect(b"img", "image/png").await.unwrap();
        assert!(detected.coordinates.is_none());
        assert!(!geocoder.called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn classifier_failure_is_a_hard_error() {
        let geocoder = Arc::new(StubGeocoder::returning(None));
        let pipeline = pipeline(StubClassifier::failing(), geocoder);

        let result = pipeline.detect(b"img", "image/jpeg").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn geocode_failure_does_not_fail_detection() {
        let geocoder = Arc::new(StubGeocoder::returning(None));
        let pipeline = pipeline(
            StubClassifier::returning(r#"{"name":"X","description":"Y","location":"Z"}"#),
            geocoder,
        );

        let detected = pipeline.detect(b"img", "image/jpeg").await.unwrap();
        assert!(detected.coordinates.is_none());
        assert!(!detected.is_soft_failure());
    }

    #[tokio::test]
    async fn analyze_returns_trimmed_free_text() {
        let geocoder = Arc::new(StubGeocoder::returning(None));
        let pipeline = pipeline(
            StubClassifier::returning("  A busy city square at dusk.\n"),
            geocoder,
        );

        let analysis = pipeline.analyze(b"img", "image/jpeg").await.unwrap();
        assert_eq!(analysis, "A busy city square at dusk.");
    }
}
