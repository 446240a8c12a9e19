use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Pseudo-header listing the header names that are folded into the signature.
pub const SIGNATURE_HEADERS: &str = "Signature-Headers";
pub const SIGN_METHOD: &str = "HMAC-SHA256";
const HTTP_METHOD: &str = "GET";

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// API key and secret of a Tuya cloud project.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl ToString, api_secret: impl ToString) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Ordered header mapping. Inserting an existing name replaces its value but
/// keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl ToString, value: impl ToString) {
        let name = name.to_string();
        let value = value.to_string();
        match self.0.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: ToString, V: ToString> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Everything that goes into the signature of a single GET request.
#[derive(Debug, Clone)]
pub struct SignedRequest<'a> {
    pub uri: String,
    pub headers: Headers,
    pub body: Option<&'a [u8]>,
    /// Epoch milliseconds, sent as the `t` header.
    pub timestamp: i64,
}

impl SignedRequest<'_> {
    /// Request path with leading `/` and query string, without scheme and host.
    pub fn path_and_query(&self) -> String {
        path_and_query(&self.uri)
    }
}

pub(crate) fn path_and_query(uri: &str) -> String {
    format!("/{}", uri.trim_start_matches('/'))
}

/// Computes the request signature:
/// 1. `api_key + token + t`
/// 2. append `GET\n`, sha256 hex of the body, `\n`, the headers named in
///    `Signature-Headers` as `name:value\n`, `\n` and the path with query
/// 3. HMAC-SHA256 of that keyed with the api secret, as uppercase hex
pub fn sign(credentials: &Credentials, token: Option<&str>, request: &SignedRequest) -> String {
    let mut payload = format!(
        "{}{}{}",
        credentials.api_key,
        token.unwrap_or_default(),
        request.timestamp
    );
    payload.push_str(&string_to_sign(request));

    let mut mac = HmacSha256::new_from_slice(credentials.api_secret.as_bytes())
        .expect("HMAC can take any size");
    mac.update(payload.as_bytes());
    hex::encode_upper(mac.finalize().into_bytes())
}

fn string_to_sign(request: &SignedRequest) -> String {
    let content_hash = hex::encode(Sha256::digest(request.body.unwrap_or_default()));
    format!(
        "{}\n{}\n{}\n{}",
        HTTP_METHOD,
        content_hash,
        canonical_headers(&request.headers),
        request.path_and_query()
    )
}

/// `name:value\n` for each header listed in `Signature-Headers`, in list order.
pub fn canonical_headers(headers: &Headers) -> String {
    let names = match headers.get(SIGNATURE_HEADERS) {
        Some(names) => names,
        None => return String::new(),
    };
    names
        .split(':')
        .filter(|name| *name != SIGNATURE_HEADERS)
        .filter_map(|name| {
            headers
                .get(name)
                .map(|value| format!("{}:{}\n", name, value))
        })
        .collect()
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

#[cfg(test)]
mod tests {
    use super::*;

    const T: i64 = 1_700_000_000_000;

    fn request(uri: &str, headers: Headers, body: Option<&'static [u8]>) -> SignedRequest<'static> {
        SignedRequest {
            uri: uri.to_string(),
            headers,
            body,
            timestamp: T,
        }
    }

    fn hmac_hex(secret: &str, msg: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(msg.as_bytes());
        hex::encode_upper(mac.finalize().into_bytes())
    }

    #[test]
    fn token_request_signature() {
        let credentials = Credentials::new("K", "S");
        let headers: Headers = [("secret", "S")].into_iter().collect();
        let signature = sign(
            &credentials,
            None,
            &request("v1.0/token?grant_type=1", headers, None),
        );

        let expected_payload = format!(
            "K1700000000000GET\n{}\n\n/v1.0/token?grant_type=1",
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(signature, hmac_hex("S", &expected_payload));
        assert_eq!(
            signature,
            "5824F146D53768FEC8C3660E373B0423FC86DFD6BCA94DA756572D828B0EC42C"
        );
    }

    #[test]
    fn signature_with_token() {
        let credentials = Credentials::new("K", "S");
        let signature = sign(
            &credentials,
            Some("tok"),
            &request("v1.0/devices/abc", Headers::new(), None),
        );
        assert_eq!(
            signature,
            "B855387C62A2D6CE3645A833CAE4D84F714539A88687132649B35C401D9473B6"
        );
        // leading slash makes no difference
        let again = sign(
            &credentials,
            Some("tok"),
            &request("/v1.0/devices/abc", Headers::new(), None),
        );
        assert_eq!(signature, again);
    }

    #[test]
    fn signature_covers_body_hash() {
        let credentials = Credentials::new("K", "S");
        let signature = sign(
            &credentials,
            Some("tok"),
            &request("v1.0/devices/abc", Headers::new(), Some(br#"{"a":1}"#)),
        );
        assert_eq!(
            signature,
            "A61118D0E0C16CDAE6B9781C24D802BEF89C1381F195FE3C879EBE4F4BF547D6"
        );
    }

    #[test]
    fn signature_headers_order_is_used() {
        let credentials = Credentials::new("K", "S");
        let headers: Headers = [
            ("area_id", "29a33e"),
            ("call_id", "8afdb70ab2ed"),
            (SIGNATURE_HEADERS, "area_id:call_id"),
        ]
        .into_iter()
        .collect();
        let signature = sign(
            &credentials,
            Some("tok"),
            &request("v1.0/users/u1/devices", headers, None),
        );
        assert_eq!(
            signature,
            "484803C8E2DFABC677C5F641DE26C0D6FC8DAEF76094D08F50A19A5DEBD90912"
        );

        let reordered: Headers = [
            ("area_id", "29a33e"),
            ("call_id", "8afdb70ab2ed"),
            (SIGNATURE_HEADERS, "call_id:area_id"),
        ]
        .into_iter()
        .collect();
        let signature = sign(
            &credentials,
            Some("tok"),
            &request("v1.0/users/u1/devices", reordered, None),
        );
        assert_eq!(
            signature,
            "60A0698BBB6ABAF8BCE67502193A08B9E8963FE1F74B8E914878120EB630E731"
        );
    }

    #[test]
    fn canonical_headers_skips_unknown_names() {
        let headers: Headers = [
            ("b", "2"),
            ("a", "1"),
            (SIGNATURE_HEADERS, "a:missing:b"),
        ]
        .into_iter()
        .collect();
        assert_eq!(canonical_headers(&headers), "a:1\nb:2\n");
        assert_eq!(canonical_headers(&Headers::new()), "");
    }

    #[test]
    fn sign_is_deterministic() {
        let credentials = Credentials::new("key", "secret");
        let req = request("v1.0/devices/x", Headers::new(), None);
        assert_eq!(
            sign(&credentials, Some("t"), &req),
            sign(&credentials, Some("t"), &req)
        );
        assert_ne!(
            sign(&credentials, Some("t"), &req),
            sign(&credentials, None, &req)
        );
    }

    #[test]
    fn headers_replace_in_place() {
        let mut headers = Headers::new();
        headers.insert("a", "1");
        headers.insert("b", "2");
        headers.insert("a", "3");
        assert_eq!(headers.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(headers.get("a"), Some("3"));
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let credentials = Credentials::new("key", "very-secret");
        assert!(!format!("{:?}", credentials).contains("very-secret"));
    }
}
