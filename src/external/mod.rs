pub mod firebase;
pub mod google_credentials;
pub mod google_vision;

pub use firebase::{FirebaseVerifier, IdentityVerifier};
pub use google_credentials::{AccessTokenProvider, ServiceAccountKey, load_service_account};
pub use google_vision::{GoogleVisionClient, OcrProvider};
