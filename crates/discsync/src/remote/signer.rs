use crate::http::HttpMethod;
use crate::platform::Credentials;

/// Produces the `Authorization` header value for one request.
///
/// The signing scheme is opaque to the rest of the crate; OAuth 1.0a
/// signers need the method and full URL, token signers ignore them.
pub trait AuthSigner: Send + Sync {
    fn sign(&self, method: HttpMethod, url: &str, credentials: &Credentials) -> String;
}

/// Personal access token scheme (`Discogs token=<token>`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSigner;

impl AuthSigner for TokenSigner {
    fn sign(&self, _method: HttpMethod, _url: &str, credentials: &Credentials) -> String {
        format!("Discogs token={}", credentials.token)
    }
}

impl<F> AuthSigner for F
where
    F: Fn(HttpMethod, &str, &Credentials) -> String + Send + Sync,
{
    fn sign(&self, method: HttpMethod, url: &str, credentials: &Credentials) -> String {
        self(method, url, credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_signer() {
        let creds = Credentials::new("alice", "s3cret");
        assert_eq!(
            TokenSigner.sign(HttpMethod::Get, "https://api.example.com", &creds),
            "Discogs token=s3cret"
        );
    }

    #[test]
    fn test_closure_signer_sees_method_and_url() {
        let signer = |method: HttpMethod, url: &str, creds: &Credentials| {
            format!("{method} {url} {}", creds.username)
        };
        let creds = Credentials::new("alice", "t");
        assert_eq!(
            signer.sign(HttpMethod::Put, "https://x/y", &creds),
            "PUT https://x/y alice"
        );
    }
}
