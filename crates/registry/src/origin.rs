use indicator_http::ClientIdentity;
use serde::Deserialize;

/// Origin used when a request carries no client certificate.
pub const ANONYMOUS_ORIGIN: &str = "anonymous";

/// Optional refinements of a registration's origin.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct RegisterParams {
    /// Deployment the document belongs to.
    pub deployment: Option<String>,

    /// Service within the deployment.
    pub service: Option<String>,
}

/// Derives a publisher origin: the client certificate's common name followed
/// by any non-empty `deployment` and `service`, joined with `/`.
#[must_use]
pub fn origin(identity: Option<&ClientIdentity>, params: &RegisterParams) -> String {
    let common_name = identity
        .map(|identity| identity.common_name.as_str())
        .filter(|cn| !cn.is_empty())
        .unwrap_or(ANONYMOUS_ORIGIN);

    [params.deployment.as_deref(), params.service.as_deref()]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .fold(common_name.to_string(), |mut origin, part| {
            origin.push('/');
            origin.push_str(part);
            origin
        })
}
