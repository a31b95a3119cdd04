use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

/// Owner assumed when no API keys are configured (local development).
pub const DEFAULT_OWNER: &str = "local";

/// The caller's resolved owner identity, inserted by [`auth_middleware`] and
/// passed explicitly into every coordinator call.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub owner: String,
}

/// Bearer-token authentication mapping each API key to an owner id.
#[derive(Clone, Default)]
pub struct ApiKeyAuth {
    keys: Vec<(String, String)>,
}

impl ApiKeyAuth {
    /// Keys from `SHELF_SERVER__API_KEYS`, comma-separated `token:owner`
    /// pairs. Malformed entries are skipped with a warning.
    pub fn from_env() -> Self {
        let keys = std::env::var("SHELF_SERVER__API_KEYS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                match entry.split_once(':') {
                    Some((token, owner)) if !token.is_empty() && !owner.is_empty() => {
                        Some((token.to_string(), owner.to_string()))
                    },
                    _ => {
                        tracing::warn!("Ignoring malformed API key entry");
                        None
                    },
                }
            })
            .collect();

        Self { keys }
    }

    pub fn with_keys(keys: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Resolve a bearer token to an owner. Every configured key is compared
    /// in constant time regardless of where a match occurs.
    pub fn authenticate(&self, token: &str) -> Option<AuthContext> {
        let mut owner = None;
        for (key, key_owner) in &self.keys {
            if bool::from(token.as_bytes().ct_eq(key.as_bytes())) {
                owner = Some(key_owner.clone());
            }
        }
        owner.map(|owner| AuthContext { owner })
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"message": message})),
    )
        .into_response()
}

pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth = request.extensions().get::<ApiKeyAuth>().cloned();

    let Some(auth) = auth.filter(ApiKeyAuth::is_enabled) else {
        request.extensions_mut().insert(AuthContext {
            owner: DEFAULT_OWNER.to_string(),
        });
        return next.run(request).await;
    };

    let token = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) => match auth.authenticate(token) {
            Some(context) => {
                request.extensions_mut().insert(context);
                next.run(request).await
            },
            None => unauthorized("Invalid API key"),
        },
        None => unauthorized("Missing Authorization header"),
    }
}
