pub mod auth;
pub mod ids;
pub mod response;

pub use auth::{bearer_token, CompanyAuth, CredentialAuth, ProfileAuth};
pub use ids::{decode_body_ids, DecodedJson, PathIds};
pub use response::{ApiResponse, ApiResult};
