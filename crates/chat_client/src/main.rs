use std::io;

use agent_transcript::TurnController;
use chat_client::config::ClientConfig;
use chat_client::session::ChatSession;
use chat_client::{logging, sources};
use tokio::io::BufReader;
use tracing::info;

fn main() -> io::Result<()> {
    logging::init();

    let config = ClientConfig::from_env().map_err(io::Error::other)?;
    let source =
        sources::source_for_id(&config.source_id, &config.mastra).map_err(io::Error::other)?;
    let profile = source.profile();
    info!(
        source_id = profile.source_id.as_str(),
        agent_id = profile.agent_id.as_str(),
        "chat client starting"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        let mut session = ChatSession::new(
            TurnController::new(source),
            config.render,
            tokio::io::stdout(),
        );
        session.greet(&profile).await?;
        session
            .run(BufReader::new(tokio::io::stdin()), wait_for_ctrl_c)
            .await
    });

    // The stdin reader may still be parked in a blocking read.
    runtime.shutdown_background();
    result
}

async fn wait_for_ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
