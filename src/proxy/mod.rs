mod headers;
mod outcome;
mod router;

pub use headers::{HeaderFilter, SKIPPED_HEADERS};
pub use outcome::{RouteOutcome, NO_BACKEND_BODY, ROUTING_ERROR_BODY};
pub use router::Router;
