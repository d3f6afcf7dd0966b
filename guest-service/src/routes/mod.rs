use axum::{
    extract::Request,
    middleware,
    routing::{get, post, put},
    Router,
};
use log::{info, warn};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::handlers::{
    guest_handlers::{create_guest, get_all_guests, search_cards, update_card},
    health,
    notification_handlers::{get_messages, receive_webhook},
};
use crate::state::AppState;
use guestlist_shared::store::{
    dynamo::{create_client, DynamoGuestStore, DynamoNotificationLogStore},
    GuestStore, NotificationLogStore,
};

/// Creates a router backed by the DynamoDB stores named in `config`
pub async fn create_router(config: &Config) -> Router {
    info!(
        "Creating router with DynamoDB stores: guests={}, serials={}, notifications={}",
        config.guests_table, config.serials_table, config.notification_table
    );

    let client = create_client(config.dynamodb_endpoint.as_deref()).await;
    let guests = Arc::new(DynamoGuestStore::with_client_and_tables(
        client.clone(),
        config.guests_table.clone(),
        config.serials_table.clone(),
    ));
    let messages = Arc::new(DynamoNotificationLogStore::with_client_and_table(
        client,
        config.notification_table.clone(),
    ));

    let state = AppState::new(guests, messages, config.store_timeout)
        .with_raw_filters(config.allow_raw_filters);

    let prefix = config.route_prefix();
    info!("Using API route prefix: '{}'", prefix);

    create_router_with_state(state, prefix)
}

/// Creates a router over any store implementations
pub fn create_router_with_state<G, N>(state: AppState<G, N>, prefix: &str) -> Router
where
    G: GuestStore,
    N: NotificationLogStore,
{
    info!("Setting up API routes with prefix: '{}'", prefix);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    async fn logging_middleware(
        req: Request,
        next: axum::middleware::Next,
    ) -> impl axum::response::IntoResponse {
        info!(
            "Router received request: method={}, uri={}",
            req.method(),
            req.uri()
        );
        let response = next.run(req).await;
        info!("Responding with status {}", response.status());
        response
    }

    if !state.allow_raw_filters {
        info!("Raw filter endpoints are disabled");
    }

    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/getAllGuests", post(get_all_guests::<G, N>))
        .route("/api/cards", get(search_cards::<G, N>))
        .route("/update/card", put(update_card::<G, N>))
        .route("/guests", post(create_guest::<G, N>))
        .route("/webhook", post(receive_webhook::<G, N>))
        // Path kept as the existing clients spell it
        .route("/whastappMessages", get(get_messages::<G, N>))
        .with_state(Arc::new(state));

    let router = if prefix.is_empty() {
        api_routes
    } else {
        Router::new().nest(prefix, api_routes)
    };

    router
        .fallback(|req: Request| async move {
            warn!("No route matched for: {} {}", req.method(), req.uri());
            (
                axum::http::StatusCode::NOT_FOUND,
                "The requested resource was not found".to_string(),
            )
        })
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware))
}
