//! `GET /events`: a long-lived home view pushed over server-sent events.
//!
//! The stream holds one auth subscription for its whole life. Every sign-in
//! or sign-out refetches the album list and pushes an `albums` event; once
//! the stream's own session has ended it sends `signed_out` and closes.
//! Dropping the stream drops the subscription.

use crate::{
    errors::{AlbumError, AppError},
    handlers::session::MaybeSession,
    services::ports::{AuthService, AuthSubscription},
    state::AppState,
    views::home::{HomeRender, HomeView, SessionStatus},
};
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{
    StreamExt,
    stream::{self, Stream},
};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tracing::debug;

struct Feed {
    view: HomeView,
    subscription: AuthSubscription,
    auth: Arc<dyn AuthService>,
    done: bool,
}

fn albums_event(render: &HomeRender) -> Event {
    let json = serde_json::to_string(render).unwrap_or_default();
    Event::default().event("albums").data(json)
}

pub async fn events(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let session = session.ok_or_else(|| AlbumError::auth_required("follow album changes"))?;
    let subscription = state.auth.subscribe();
    let mut view = HomeView::new(state.reconciler(), state.upload_targets(), session);
    view.mount().await;
    let first = albums_event(&view.render());

    let feed = Feed {
        view,
        subscription,
        auth: state.auth.clone(),
        done: false,
    };
    let updates = stream::unfold(feed, |mut feed| async move {
        if feed.done {
            return None;
        }
        let notice = feed.subscription.recv().await?;
        let status = feed.view.on_auth_notice(feed.auth.as_ref(), &notice).await;
        let event = match status {
            SessionStatus::Active => albums_event(&feed.view.render()),
            SessionStatus::Ended => {
                debug!("session ended, closing event stream");
                feed.done = true;
                Event::default().event("signed_out").data("{}")
            }
        };
        Some((Ok(event), feed))
    });

    let stream = stream::once(async move { Ok::<_, Infallible>(first) }).chain(updates);
    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}
