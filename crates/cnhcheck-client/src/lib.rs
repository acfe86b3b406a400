//! Identity provider client: authentication, document extraction, liveness
//! sessions and face comparison.

pub mod config;
mod error;
pub mod facematch;
mod http;
pub mod image;
pub mod liveness;

pub use config::ClientConfig;
pub use error::ClientError;
pub use facematch::{FACE_MATCH_THRESHOLD, FaceComparison};
pub use http::{AccessToken, IdentityClient, ProviderStatus};
pub use image::ImageInput;
pub use liveness::{LivenessSession, LivenessStatus, LivenessUiConfig};
