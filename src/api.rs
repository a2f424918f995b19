//! Auth endpoints of the primary backend.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::{FlatRequestClient, RequestDescriptor, RequestOutcome, TokenPair};

/// Signed-in user profile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub buttons: Vec<String>,
}

/// Exchanges credentials for a token pair.
pub async fn fetch_login(
    client: &FlatRequestClient,
    user_name: &str,
    password: &str,
) -> RequestOutcome<TokenPair> {
    let descriptor = RequestDescriptor::post("/user/login").json_value(json!({
        "userName": user_name,
        "password": password,
    }));
    client.request_json(descriptor).await
}

pub async fn fetch_user_info(client: &FlatRequestClient) -> RequestOutcome<UserInfo> {
    client
        .request_json(RequestDescriptor::get("/auth/getUserInfo"))
        .await
}

/// Exchanges a refresh token for a new token pair.
///
/// Use a client without a refresh coordinator, or one whose expired-token
/// codes cannot be returned by this endpoint, to avoid refreshing recursively.
pub async fn fetch_refresh_token(
    client: &FlatRequestClient,
    refresh_token: &str,
) -> RequestOutcome<TokenPair> {
    let descriptor = RequestDescriptor::post("/auth/refreshToken").json_value(json!({
        "refreshToken": refresh_token,
    }));
    client.request_json(descriptor).await
}

/// Asks the backend to answer with an arbitrary business code.
pub async fn fetch_custom_backend_error(
    client: &FlatRequestClient,
    code: &str,
    msg: &str,
) -> RequestOutcome<JsonValue> {
    let descriptor = RequestDescriptor::get("/auth/error")
        .query("code", code)
        .query("msg", msg);
    client.request_json(descriptor).await
}
