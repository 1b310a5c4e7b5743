//! JSON bodies of the veil HTTP surface. All binary material travels
//! base64-encoded inside string fields.

use serde::{Deserialize, Serialize};

/// Body of `POST /registerNode`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterNodeBody {
    pub node_id: u64,
    pub public_key: String,
}

/// One entry of the node registry listing.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEntry {
    pub node_id: u64,
    pub public_key: String,
}

/// Response of `GET /getNodeRegistry`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NodeRegistryBody {
    pub nodes: Vec<NodeEntry>,
}

/// Body of `POST /message`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MessageBody {
    pub message: String,
}

/// Body of `POST /sendMessage`.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    pub message: String,
    pub destination_user_id: u64,
}

/// Generic success acknowledgment.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SuccessBody {
    pub success: bool,
}

/// Generic error response.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response of the diagnostic `getLast*` endpoints.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ResultBody<T> {
    pub result: Option<T>,
}
