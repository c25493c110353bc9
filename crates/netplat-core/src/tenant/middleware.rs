use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::{ConfigError, TenantSettings};
use crate::tenant::context::{TenantContext, TenantId};
use crate::tenant::error::TenantError;

/// Default header carrying the tenant identifier
pub const DEFAULT_TENANT_HEADER: &str = "x-tenant-id";
/// Default header carrying the authenticated subject
pub const DEFAULT_SUBJECT_HEADER: &str = "x-user-id";
/// Default path prefix under which every request must name a tenant
pub const DEFAULT_ISOLATED_PREFIX: &str = "/api/";

/// Where the tenant boundary is drawn and how the identifier is carried
#[derive(Debug, Clone)]
pub struct TenantPolicy {
    header: HeaderName,
    subject_header: HeaderName,
    isolated_prefix: String,
}

impl TenantPolicy {
    /// Build a policy from the `[tenant]` configuration section
    pub fn from_settings(settings: &TenantSettings) -> Result<Self, ConfigError> {
        let parse = |key: &str, value: &str| {
            HeaderName::from_bytes(value.as_bytes()).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            header: parse("tenant.header", &settings.header)?,
            subject_header: parse("tenant.subject_header", &settings.subject_header)?,
            isolated_prefix: settings.isolated_prefix.clone(),
        })
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    /// Whether requests to `path` must carry a tenant identifier
    pub fn is_isolated(&self, path: &str) -> bool {
        path.starts_with(&self.isolated_prefix)
    }

    /// Resolve the tenant context for a request.
    ///
    /// `Ok(None)` means the path is outside the isolated space and no tenant
    /// header was sent. A header that is present is always validated, even
    /// outside the isolated space.
    pub fn resolve(&self, headers: &HeaderMap, path: &str) -> Result<Option<TenantContext>, TenantError> {
        let raw = match headers.get(&self.header) {
            Some(raw) => raw,
            None if self.is_isolated(path) => return Err(TenantError::Missing),
            None => return Ok(None),
        };

        let value = raw.to_str().map_err(|e| TenantError::Malformed {
            value: String::from_utf8_lossy(raw.as_bytes()).into_owned(),
            reason: e.to_string(),
        })?;
        let tenant_id: TenantId = value.parse()?;

        Ok(Some(TenantContext {
            tenant_id,
            subject: self.subject(headers),
        }))
    }

    /// Non-empty value of the subject header, if sent
    pub fn subject(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(&self.subject_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

impl Default for TenantPolicy {
    fn default() -> Self {
        Self {
            header: HeaderName::from_static(DEFAULT_TENANT_HEADER),
            subject_header: HeaderName::from_static(DEFAULT_SUBJECT_HEADER),
            isolated_prefix: DEFAULT_ISOLATED_PREFIX.to_string(),
        }
    }
}

/// Tenant isolation middleware.
///
/// Layered once over the whole composed router, so no plugin handler can be
/// reached without passing through it.
pub async fn tenant_isolation(
    State(policy): State<TenantPolicy>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    match policy.resolve(request.headers(), &path) {
        Ok(Some(context)) => {
            log::debug!("Request to {} bound to tenant {}", path, context.tenant_id);
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(e) => {
            log::warn!("Rejected request to {}: {}", path, e);
            e.into_response()
        }
    }
}
