//! Server-Sent Events for ingestion progress streaming

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::AppState;

/// GET /api/events - SSE stream of pipeline events
///
/// Streams every [`crate::events::ReviewEvent`]: AnalysisStarted,
/// ReviewAnalyzed, RowSkipped, AnalysisCompleted, AnalysisCancelled.
/// A heartbeat comment goes out every 15 seconds to keep proxies from
/// closing idle connections.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to pipeline events");

    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    debug!("SSE: sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            let event_type = event.event_type().to_string();
                            match serde_json::to_string(&event) {
                                Ok(event_json) => {
                                    yield Ok(Event::default()
                                        .event(&event_type)
                                        .data(event_json));
                                }
                                Err(e) => {
                                    warn!("SSE: failed to serialize event {event_type}: {e}");
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "SSE: subscriber lagged, events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("SSE: event bus closed, ending stream");
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
