//! Route definitions and server setup

use axum::http::{HeaderName, Method, StatusCode, header};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    handler::Handler,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use scrolljar_core::Config;
use scrolljar_core::infrastructure::RateLimiterService;

use crate::presentation::{
    controllers::{
        AppState,
        jars::{create_jar, create_scroll, delete_jar, get_jar, list_jar_scrolls, list_user_jars},
        ping::ping,
        scrolls::{delete_scroll, get_scroll, update_scroll, upload_scroll},
        tokens::create_activation_token,
        users::{activate, authenticate, current_user, register},
    },
    extractors::{PASTE_PASSWORD_HEADER, UPLOAD_TOKEN_HEADER},
    middleware::{
        AuthenticationState, ErrorPolicy, RateLimiterState, TrustedProxies,
        authenticate_middleware, client_rate_limit_middleware, global_rate_limit_middleware, logging_middleware,
        panic_response, request_context_middleware,
    },
    models::*,
};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::presentation::controllers::ping::ping,
        crate::presentation::controllers::jars::create_jar,
        crate::presentation::controllers::jars::get_jar,
        crate::presentation::controllers::jars::delete_jar,
        crate::presentation::controllers::jars::list_jar_scrolls,
        crate::presentation::controllers::jars::create_scroll,
        crate::presentation::controllers::jars::list_user_jars,
        crate::presentation::controllers::scrolls::get_scroll,
        crate::presentation::controllers::scrolls::upload_scroll,
        crate::presentation::controllers::scrolls::update_scroll,
        crate::presentation::controllers::scrolls::delete_scroll,
        crate::presentation::controllers::users::register,
        crate::presentation::controllers::users::activate,
        crate::presentation::controllers::users::authenticate,
        crate::presentation::controllers::users::current_user,
        crate::presentation::controllers::tokens::create_activation_token
    ),
    components(
        schemas(
            ErrorResponse,
            PingResponse,
            AccessDto,
            ScrollDraftRequest,
            CreateJarRequest,
            CreateJarResponse,
            JarResponse,
            JarListResponse,
            ScrollStateDto,
            ScrollResponse,
            ScrollListResponse,
            IssuedScrollResponse,
            ScrollContentResponse,
            UploadResponse,
            UpdateScrollRequest,
            RegisterRequest,
            UserResponse,
            ActivateRequest,
            CredentialsRequest,
            TokenDto,
            AuthTokensResponse,
            ActivationTokenResponse
        )
    ),
    modifiers(&BearerTokenAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "jars", description = "Jars: named, optionally private collections of scrolls"),
        (name = "scrolls", description = "Scroll metadata and capability-gated content upload"),
        (name = "users", description = "Registration, activation and authentication"),
        (name = "tokens", description = "Activation token delivery")
    ),
    info(
        title = "ScrollJar API",
        version = "1.0.0",
        description = "Paste service. Jars hold scrolls; scroll content is uploaded with the single-use token returned when the scroll is created."
    )
)]
pub struct ApiDoc;

struct BearerTokenAddon;

impl Modify for BearerTokenAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let allow_headers = [
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::AUTHORIZATION,
        header::ORIGIN,
        HeaderName::from_static(UPLOAD_TOKEN_HEADER),
        HeaderName::from_static(PASTE_PASSWORD_HEADER),
    ];
    let allow_methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    let origins = &config.server.allowed_origins;
    let layer = CorsLayer::new()
        .allow_methods(allow_methods)
        .allow_headers(allow_headers)
        .max_age(Duration::from_secs(3600));

    if origins.len() == 1 && origins[0] == "*" {
        tracing::warn!("CORS: Using wildcard origin (*)");
        return layer.allow_origin(tower_http::cors::AllowOrigin::any());
    }

    let origins: Vec<axum::http::HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            axum::http::HeaderValue::from_str(origin)
                .map_err(|_| {
                    tracing::warn!(origin, "Invalid CORS origin in config; skipping");
                })
                .ok()
        })
        .collect();
    layer.allow_origin(origins)
}

async fn not_found() -> Response {
    crate::presentation::middleware::application_error_to_response(
        scrolljar_core::application::ApplicationError::not_found("route"),
    )
}

/// Create the application router with its middleware stack.
///
/// Requests pass, in order: tracing, CORS, request context, panic capture,
/// timeout, logging, the global limiter, the per-client limiter,
/// authentication (not for uploads) and finally the handler.
pub fn create_router(
    state: AppState,
    rate_limiter: Arc<RateLimiterService>,
    config: &Config,
) -> Router {
    let authentication_state = AuthenticationState {
        resolve_principal: state.resolve_principal_use_case.clone(),
    };
    let trusted_proxies = TrustedProxies::new(&config.server.trusted_proxies);
    let rate_limiter_state = RateLimiterState::new(rate_limiter, trusted_proxies.clone());
    let error_policy = ErrorPolicy {
        expose_details: !config.server.is_production(),
    };

    // The upload token alone authorizes content uploads, so they skip
    // bearer resolution and a stale Authorization header cannot block them
    let capability_routes = Router::new().route(
        "/scroll/{id}",
        post(upload_scroll.layer(DefaultBodyLimit::disable())),
    );

    let authenticated_routes = Router::new()
        .route("/ping", get(ping))
        .route("/jar", post(create_jar))
        .route("/jar/{id}", get(get_jar).delete(delete_jar))
        .route("/jar/{id}/scrolls", get(list_jar_scrolls).post(create_scroll))
        .route(
            "/scroll/{id}",
            get(get_scroll).patch(update_scroll).delete(delete_scroll),
        )
        .route("/user", get(current_user))
        .route("/user/register", post(register))
        .route("/user/activate", put(activate))
        .route("/user/auth", post(authenticate))
        .route("/user/jars", get(list_user_jars))
        .route("/token/activation", post(create_activation_token))
        .layer(middleware::from_fn_with_state(
            authentication_state,
            authenticate_middleware,
        ));

    let api_routes = authenticated_routes.merge(capability_routes);

    let mut router = Router::new()
        .nest("/v1", api_routes)
        .fallback(not_found)
        // Uploads opt out above; their ceiling comes from the upload token
        .layer(DefaultBodyLimit::max(config.server.max_json_body_bytes));

    if config.server.enable_docs {
        router = router.route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()).into_response() }),
        );
    }

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(config))
        .layer(middleware::from_fn_with_state(
            error_policy,
            request_context_middleware,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_seconds),
        ))
        .layer(middleware::from_fn_with_state(
            trusted_proxies,
            logging_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            rate_limiter_state.clone(),
            global_rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            rate_limiter_state,
            client_rate_limit_middleware,
        ));

    router.layer(service_builder).with_state(state)
}
