use std::net::SocketAddr;

use burrow::config::Config;
use burrow::files::FileHandler;
use burrow::ws::WebSocketHandler;
use burrow::{Request, Response, Server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let cfg = Config::load();
    let addr: SocketAddr = cfg.listen_addr.parse()?;

    let server = Server::new(ServerConfig::new(addr).with_timeout(cfg.timeout));
    server.append_route("GET /hello", |_req: Request| async {
        Ok(Response::ok("Hello from burrow\n"))
    });
    server.append_route("GET /ws", WebSocketHandler::new());
    server.append_route("GET /**", FileHandler::new("public"));

    let mut serving = tokio::spawn({
        let server = server.clone();
        async move { server.start().await }
    });

    tokio::select! {
        res = &mut serving => {
            res??;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            server.stop();
            serving.await??;
        }
    }

    Ok(())
}
