use serde::Serialize;

const LAST_NAME: &str = "User";
const CITY: &str = "Bogotá";
const COUNTRY: &str = "Colombia";

/// Credentials of one provisioned account. Shared read-only by every worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestIdentity {
    pub email: String,
    pub password: String,
}

impl TestIdentity {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Body of `POST /api/auth/signup`.
#[derive(Debug, Clone, Serialize)]
pub struct SignupProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
    pub city: String,
    pub country: String,
}

impl SignupProfile {
    #[must_use]
    pub fn for_load_test(index: usize, identity: &TestIdentity) -> Self {
        Self {
            first_name: format!("LoadTest{}", index),
            last_name: LAST_NAME.to_owned(),
            email: identity.email.clone(),
            password1: identity.password.clone(),
            password2: identity.password.clone(),
            city: CITY.to_owned(),
            country: COUNTRY.to_owned(),
        }
    }
}
