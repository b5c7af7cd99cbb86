use std::convert::Infallible;

use actix_web::http::header;
use actix_web::web::Bytes;
use actix_web::{HttpResponse, get, web};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::{debug, warn};

use uptime_service::events::{MONITOR_UPDATE_EVENT, MonitorUpdate};

use crate::state::AppState;

macros_utils::routes! {
    route events_route,
}

/// One Server-Sent Events frame carrying a monitor update
fn sse_frame(update: &MonitorUpdate) -> Option<Bytes> {
    match serde_json::to_string(update) {
        Ok(json) => Some(Bytes::from(format!("event: {MONITOR_UPDATE_EVENT}\ndata: {json}\n\n"))),
        Err(e) => {
            warn!(monitor = %update.monitor_id, "Failed to encode update: {}", e);
            None
        }
    }
}

/// Live `monitorUpdate` stream. A subscriber that falls behind skips the
/// messages it missed.
#[get("/events")]
pub async fn events_route(state: web::Data<AppState>) -> HttpResponse {
    let updates = BroadcastStream::new(state.registry.subscribe()).filter_map(|item| match item {
        Ok(update) => sse_frame(&update).map(Ok::<_, Infallible>),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            debug!(skipped, "Event subscriber lagged");
            None
        }
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(updates)
}
