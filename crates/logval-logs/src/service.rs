use tokio_util::sync::CancellationToken;
use tracing::error;

use logval_types::{ServiceRequest, ServiceResponse, ServiceResponseBody};

use crate::config::ValidatorConfig;
use crate::session::Session;

/// Request/response front of a session
///
/// Infrastructure failures are reported in the top-level `error`; records
/// that fail to match only ever show up in the Assert body.
pub struct LogValidatorService {
    session: Session,
}

impl LogValidatorService {
    pub fn new(config: ValidatorConfig) -> Self {
        Self::with_session(Session::new(config))
    }

    pub fn with_session(session: Session) -> Self {
        Self { session }
    }

    pub async fn run(&self, request: ServiceRequest, cancel: &CancellationToken) -> ServiceResponse {
        let action = request.action();
        let result = match request {
            ServiceRequest::Listen(req) => self.session.listen(&req).map(ServiceResponseBody::Listen),
            ServiceRequest::Assert(req) => self
                .session
                .assert(&req, cancel)
                .await
                .map(ServiceResponseBody::Assert),
            ServiceRequest::Reset(req) => self.session.reset(&req).map(ServiceResponseBody::Reset),
        };

        match result {
            Ok(body) => ServiceResponse::ok(body),
            Err(e) => {
                error!(action, error = %e, "request failed");
                ServiceResponse::error(e.to_string())
            }
        }
    }
}

impl Default for LogValidatorService {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}
