//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 specification for the Tessera device API.

use utoipa::OpenApi;

use crate::types::{
    ChallengeResponse, FinishAuthenticationRequest, FinishAuthenticationResponse,
    FinishRegistrationRequest, FinishRegistrationResponse, HealthResponse, ReadyResponse,
    StartAuthenticationRequest,
};

/// Tessera Device API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tessera - U2F Device API",
        version = "0.1.0",
        description = r#"
## Second-Factor Device Enrollment and Authentication

Tessera manages hardware-token second factors over a challenge-response
protocol:

1. **Register** a device: `POST /devices/register/start` issues a challenge,
   the client relays it to the token, and `POST /devices/register/finish`
   submits the token's response to bind the key material.
2. **Authenticate**: `POST /devices/authenticate/start` issues a challenge
   against the stored registration, and `POST /devices/authenticate/finish`
   verifies the token's signed assertion.

Each successful authentication advances a monotonic counter; assertions
carrying a stale counter are rejected as possible cloned-device replays.
"#,
        license(
            name = "MIT OR Apache-2.0",
            url = "https://github.com/tessera-rp/tessera/blob/main/LICENSE"
        ),
        contact(
            name = "Tessera Team",
            url = "https://github.com/tessera-rp/tessera"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Registration", description = "Enroll a new second-factor device"),
        (name = "Authentication", description = "Verify a registered device's assertions"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health,
        crate::handlers::ready,
        crate::handlers::start_registration,
        crate::handlers::finish_registration,
        crate::handlers::start_authentication,
        crate::handlers::finish_authentication,
    ),
    components(
        schemas(
            ChallengeResponse,
            FinishRegistrationRequest,
            FinishRegistrationResponse,
            StartAuthenticationRequest,
            FinishAuthenticationRequest,
            FinishAuthenticationResponse,
            HealthResponse,
            ReadyResponse,
        )
    )
)]
pub struct ApiDoc;
