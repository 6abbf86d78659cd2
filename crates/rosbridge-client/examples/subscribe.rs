//! Subscribes to a rosbridge topic and prints inbound publishes.
//!
//! Run against a rosbridge server (default port 9090):
//!
//! ```bash
//! cargo run --example subscribe -- ws://127.0.0.1:9090
//! ```

use std::sync::Arc;

use rosbridge_client::{
    BoxError, Config, Message, OpHandlerMap, RosBridgeClient, connect_params,
};

#[tokio::main]
async fn main() {
    let config = Config::default();
    rosbridge_core::setup_logging(&config.global.log_level).expect("logging setup");

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:9090".to_string());

    let mut handlers = OpHandlerMap::new();
    handlers.register("publish", |msg: Message| -> Result<(), BoxError> {
        println!(
            "[{}] {}",
            msg.get("topic").and_then(|v| v.as_str()).unwrap_or("?"),
            msg.get("msg").map(|v| v.to_string()).unwrap_or_default()
        );
        Ok(())
    });
    handlers.register("status", |msg: Message| -> Result<(), BoxError> {
        log::info!(
            "rosbridge status: {}",
            msg.get("msg").and_then(|v| v.as_str()).unwrap_or("")
        );
        Ok(())
    });

    let client = RosBridgeClient::connect(
        connect_params(url.clone(), &config),
        Arc::new(handlers),
        &config,
    );

    // Fires as soon as the first handshake completes.
    client.on_ready(move |conn| {
        log::info!("Connected to {}, subscribing to /chatter", url);
        let _ = conn.send(r#"{"op":"subscribe","topic":"/chatter"}"#.to_string());
    });

    tokio::signal::ctrl_c().await.expect("install ctrl-c handler");
    log::info!("Shutting down.");
    client.shutdown().await;
}
