//! Handler for the `serve` command

use super::HandlerContext;
use crate::error::Result;

/// Run the HTTP API until interrupted
pub async fn handle_serve(ctx: &HandlerContext, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut server = ctx.config.server.clone();
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }

    ctx.info(&format!(
        "Serving the service desk API on http://{}:{} (Ctrl-C to stop)",
        server.host, server.port
    ));
    crate::api::serve(ctx.engine.clone(), &server).await
}
