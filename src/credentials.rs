// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Connection profiles tried against every target.

use std::time::Duration;

pub use crate::ssh::AuthMethod;

/// A login identity paired with an authentication method and a per-attempt timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user: String,
    pub auth: AuthMethod,
    pub timeout: Duration,
}

impl Credential {
    pub fn new(user: impl Into<String>, auth: AuthMethod, timeout: Duration) -> Self {
        Self {
            user: user.into(),
            auth,
            timeout,
        }
    }
}

/// Credentials in preference order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    credentials: Vec<Credential>,
}

impl CredentialSet {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }

    /// One credential per user, all sharing `auth` and `timeout`.
    pub fn for_users<S: AsRef<str>>(users: &[S], auth: AuthMethod, timeout: Duration) -> Self {
        Self {
            credentials: users
                .iter()
                .map(|user| Credential::new(user.as_ref(), auth.clone(), timeout))
                .collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Credential> {
        self.credentials.iter()
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn users(&self) -> Vec<&str> {
        self.credentials.iter().map(|c| c.user.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a CredentialSet {
    type Item = &'a Credential;
    type IntoIter = std::slice::Iter<'a, Credential>;

    fn into_iter(self) -> Self::IntoIter {
        self.credentials.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_users_keeps_order() {
        let set = CredentialSet::for_users(
            &["centos", "ec2-user"],
            AuthMethod::with_password("pw"),
            Duration::from_secs(5),
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.users(), vec!["centos", "ec2-user"]);
        assert!(set.iter().all(|c| c.timeout == Duration::from_secs(5)));
    }

    #[test]
    fn test_empty_set() {
        let set = CredentialSet::for_users::<&str>(
            &[],
            AuthMethod::with_password("pw"),
            Duration::from_secs(5),
        );
        assert!(set.is_empty());
    }
}
