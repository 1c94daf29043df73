use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Body of every response that carries no data, including all denials.
///
/// A denial always has `success = false`, a generic human message and a
/// stable machine code such as `RESOURCE_ACCESS_DENIED`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommonResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Response for calls that return data.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "T: Serialize + DeserializeOwned")]
pub struct ResourceResponse<T: Serialize + DeserializeOwned> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthzResponse {
    pub status: String,
    pub now: String,
}
