use std::sync::Arc;

use async_trait::async_trait;

use crate::package::PackageLocation;

use super::{AuthenticationError, AuthenticationFailure, AuthenticationResult, PackageAuthenticator};

/// Runs several authenticators in order; all of them must pass.
///
/// On failure the result of the last authenticator that passed is reported
/// as the partial result, unless the failing one reported its own.
#[derive(Debug, Clone)]
pub struct AllAuthenticators {
    authenticators: Vec<Arc<dyn PackageAuthenticator>>,
}

impl AllAuthenticators {
    pub fn new(authenticators: Vec<Arc<dyn PackageAuthenticator>>) -> Self {
        Self { authenticators }
    }
}

#[async_trait]
impl PackageAuthenticator for AllAuthenticators {
    async fn authenticate(
        &self,
        location: &PackageLocation,
    ) -> Result<AuthenticationResult, AuthenticationFailure> {
        let mut last = None;

        for authenticator in &self.authenticators {
            match authenticator.authenticate(location).await {
                Ok(result) => last = Some(result),
                Err(failure) => {
                    return Err(AuthenticationFailure {
                        partial: failure.partial.or(last),
                        error: failure.error,
                    });
                }
            }
        }

        last.ok_or_else(|| AuthenticationError::NoAuthenticators.into())
    }
}
