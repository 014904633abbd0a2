//! Vote command handlers: `pulse vote` and `pulse tally` (with `--watch`).

use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::store::{self, Mode};
use crate::vote::{TallyCounts, VoteKind, VoteStage, VoteTally};
use crate::{auth, render, Config, Result};
use tracing::{debug, info};

/// Handles the `pulse vote` command. Requires a signed-in session; an
/// identity's first vote moves the shared counter by exactly one, and any
/// later vote is a no-op.
pub async fn vote(config: &Config, mode: Mode, kind: VoteKind) -> Result<Out<TallyCounts>> {
    let mut tally = viewer(config, mode).await?;
    let already = matches!(tally.stage(), VoteStage::Voted(_));
    tally.cast(kind).await.classify(ErrorType::VoteWrite)?;
    let counts = tally.counts().await.classify(ErrorType::VoteWrite)?;
    let message = if already {
        format!(
            "This identity already voted; the tally is unchanged.\n{}",
            render::tally_line(&counts, &tally.stage())
        )
    } else {
        format!(
            "Vote recorded.\n{}",
            render::tally_line(&counts, &tally.stage())
        )
    };
    Ok(Out::new(message, counts))
}

/// Handles the `pulse tally` command: a one-shot read of the shared counter,
/// annotated with the viewer's own standing.
pub async fn tally(config: &Config, mode: Mode) -> Result<Out<TallyCounts>> {
    let mut tally = viewer(config, mode).await?;
    let counts = tally.counts().await.classify(ErrorType::VoteWrite)?;
    Ok(Out::new(
        render::tally_line(&counts, &tally.stage()),
        counts,
    ))
}

/// Handles `pulse tally --watch`: subscribes to the counter and prints every
/// change until Ctrl-C. The subscription is released when the feed drops.
pub async fn tally_watch(config: &Config, mode: Mode) -> Result<Out<TallyCounts>> {
    let stage = viewer(config, mode).await?.stage();
    let mut store = store::store(config, mode).await?;
    let mut feed = store
        .subscribe_tally()
        .await
        .classify(ErrorType::VoteWrite)?;

    info!("{}", render::tally_line(&feed.latest(), &stage));
    info!("Watching for tally changes. Press Ctrl-C to stop.");
    loop {
        tokio::select! {
            changed = feed.changed() => {
                let counts = changed.classify(ErrorType::VoteWrite)?;
                info!("{}", render::tally_line(&counts, &stage));
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Ctrl-C received; releasing the tally subscription");
                break;
            }
        }
    }
    let counts = feed.latest();
    feed.cancel();
    Ok(Out::new("Stopped watching the tally.", counts))
}

/// Builds the viewer's [`VoteTally`] for `mode`, resolving the current session
/// (if any) so the stage reflects this identity's standing.
async fn viewer(config: &Config, mode: Mode) -> Result<VoteTally> {
    let store = store::store(config, mode).await?;
    let mut tally = VoteTally::new(store);
    if let Some(session) = auth::current_session(config, mode)
        .await
        .classify(ErrorType::Auth)?
    {
        debug!("Resolved session for {}", session.display_name);
        tally
            .resolve_session(session)
            .await
            .classify(ErrorType::VoteWrite)?;
    }
    Ok(tally)
}
