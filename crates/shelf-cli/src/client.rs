use anyhow::{Context, Result};
use reqwest::multipart::Form;
use reqwest::Response;

/// Thin HTTP client for the catalog server.
pub struct ApiClient {
    base: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: impl Into<String>, token: Option<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            base,
            token,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        self.with_auth(self.http.get(self.url(path)))
            .send()
            .await
            .with_context(|| format!("Request failed: GET {}", path))
    }

    pub async fn post_multipart(&self, path: &str, form: Form) -> Result<Response> {
        self.with_auth(self.http.post(self.url(path)))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Request failed: POST {}", path))
    }

    pub async fn put_multipart(&self, path: &str, form: Form) -> Result<Response> {
        self.with_auth(self.http.put(self.url(path)))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Request failed: PUT {}", path))
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.with_auth(self.http.delete(self.url(path)))
            .send()
            .await
            .with_context(|| format!("Request failed: DELETE {}", path))
    }

    /// The server's structured failure message, falling back to the status
    /// line when the body isn't the expected shape.
    pub async fn error_message(response: Response) -> String {
        let status = response.status();
        match response.json::<serde_json::Value>().await {
            Ok(json) => json
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:3000/", None);
        assert_eq!(client.url("/catalogs/"), "http://localhost:3000/catalogs/");
    }
}
