pub struct StatusController;

impl StatusController {
    pub fn report(&self) -> StatusResponse {
        StatusResponse::new(Status::current())
    }
}

/// Service health.
pub struct StatusResponse {
    status: Status,
}

impl JsonResponse for StatusResponse {}

impl StatusResponse {
    pub fn new(status: Status) -> Self {
        Self { status }
    }
}
