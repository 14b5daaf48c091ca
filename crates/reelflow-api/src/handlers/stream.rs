//! Server-sent log streaming.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use reelflow_models::StreamMessage;
use reelflow_supervisor::log_stream;
use tracing::debug;

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;

/// Tail a task's log as `text/event-stream`.
///
/// Each message becomes one `data:` event. An idle task produces a single
/// "not found" event and the response ends.
pub async fn stream_task_log(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(name): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let subscription = state.supervisor.subscribe(&name).await?;
    debug!(task = %name, live = subscription.is_some(), "Log stream requested");

    let events = log_stream(subscription).map(move |message| {
        if message.is_terminal() {
            debug!(task = %name, reason = %message.text(), "Log stream ended");
        }
        Ok(to_event(&message))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(state.config.sse_keep_alive)))
}

fn to_event(message: &StreamMessage) -> Event {
    Event::default().data(sse_data(&message.text()))
}

/// SSE data may not contain carriage returns. Progress output that redraws a
/// line with `\r` keeps only its final segment.
fn sse_data(text: &str) -> &str {
    text.split('\r').filter(|s| !s.is_empty()).last().unwrap_or("")
}
