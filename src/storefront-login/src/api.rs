//! Authenticated requests to the customer GraphQL API.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::AuthClient;
use crate::error::{AuthError, Result};
use crate::session::Session;
use crate::store::TokenStore;

/// GraphQL request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Value::Object(Default::default()),
            operation_name: None,
        }
    }

    pub fn variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// POST `request` to the customer API with the customer's access token.
///
/// The token is refreshed first if it has expired. The response body is
/// returned as-is, GraphQL `errors` included.
pub async fn customer_api_request<S, T>(
    client: &AuthClient,
    session: &mut S,
    request: &GraphqlRequest,
) -> Result<T>
where
    S: Session + ?Sized,
    T: DeserializeOwned,
{
    let access_token = TokenStore::new(session)
        .valid_access_token(client)
        .await
        .ok_or(AuthError::NotAuthenticated)?;
    let endpoint = client.graphql_endpoint().await?;

    tracing::debug!(
        operation = request.operation_name.as_deref().unwrap_or("anonymous"),
        "Sending customer API request"
    );

    let response = client
        .http()
        .post(&endpoint)
        .header(reqwest::header::AUTHORIZATION, access_token)
        .json(request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "Customer API request failed");
        return Err(AuthError::ApiRequest {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.json::<T>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_body_shape() {
        let request = GraphqlRequest::new("query Customer { customer { id } }")
            .operation_name("Customer");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "query": "query Customer { customer { id } }",
                "variables": {},
                "operationName": "Customer"
            })
        );
    }

    #[test]
    fn test_operation_name_omitted_when_absent() {
        let request = GraphqlRequest::new("{ shop { name } }")
            .variables(serde_json::json!({"first": 5}));
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("operationName").is_none());
        assert_eq!(body["variables"]["first"], 5);
    }
}
