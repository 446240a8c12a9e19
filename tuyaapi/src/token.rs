/// Bearer token issued by the token endpoint. Expiry is enforced remotely, a
/// rejected request is the only signal that it is stale.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl ToString) -> Self {
        Self(value.to_string())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken(***)")
    }
}

/// Holds at most one cached token.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: Option<AccessToken>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Replaces the cached token wholesale.
    pub fn replace(&mut self, token: AccessToken) -> AccessToken {
        self.token = Some(token.clone());
        token
    }

    pub fn clear(&mut self) {
        self.token = None;
    }
}
