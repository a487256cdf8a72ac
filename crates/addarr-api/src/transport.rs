use std::fmt;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::traits::Transport;

/// HTTP verbs the dashboard uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported method: {other}")),
        }
    }
}

/// Method and body of a request whose address is not yet known.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub method: Method,
    pub body: Option<serde_json::Value>,
}

impl FetchOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post_json<T: Serialize>(body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Parse(e.to_string()))?;
        Ok(Self {
            method: Method::Post,
            body: Some(value),
        })
    }
}

/// A fully addressed request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: None,
        }
    }

    pub fn from_options(url: impl Into<String>, options: &FetchOptions) -> Self {
        Self {
            method: options.method,
            url: url.into(),
            body: options.body.clone(),
        }
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Parse(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// A response as the server sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`ApiError::Api`].
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            tracing::warn!(status = self.status, "Addarr API error");
            Err(ApiError::Api {
                status: self.status,
                message: self.body,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            http: Client::new(),
        }
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
            Method::Put => self.http.put(&request.url),
            Method::Delete => self.http.delete(&request.url),
        };
        builder = builder.header("Cache-Control", "no-store");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("PATCH".parse::<Method>().is_err());
        assert_eq!(Method::default().to_string(), "GET");
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse::new(204, "");
        assert!(ok.error_for_status().is_ok());

        let err = ApiResponse::new(502, "bad gateway").error_for_status().unwrap_err();
        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "bad gateway");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_with_json_body() {
        let req = ApiRequest::post("https://x.example/api/update/dismiss")
            .with_json(&serde_json::json!({"kind": "available"}))
            .unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body.unwrap()["kind"], "available");
    }
}
