//! Detection pipeline services

pub mod classifier;
pub mod detection;
pub mod geocoder;
pub mod parser;

pub use classifier::{Classifier, ClassifierError, PromptVariant, VisionClient};
pub use detection::{DetectionError, DetectionPipeline};
pub use geocoder::{Geocoder, NominatimClient};
