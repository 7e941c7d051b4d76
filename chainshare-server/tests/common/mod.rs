use chainshare_access::SimulatedContract;
use chainshare_server::config::{Config, MirrorConfig, RegistryConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const OWNER: &str = "0x1111111111111111111111111111111111111111";
pub const ALICE: &str = "0x2222222222222222222222222222222222222222";
#[allow(dead_code)]
pub const BOB: &str = "0x3333333333333333333333333333333333333333";

pub struct TestServer {
    pub url: String,
    #[allow(dead_code)]
    pub addr: SocketAddr,
    #[allow(dead_code)]
    pub contract: Arc<SimulatedContract>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with_mirror(MirrorConfig::default()).await
    }

    pub async fn start_with_mirror(mirror: MirrorConfig) -> Self {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0, // OS assigns port
            registry: RegistryConfig::default(),
            mirror,
        };

        let state = chainshare_server::state::AppState::new(&config)
            .await
            .unwrap();
        let contract = state.contract.clone();
        let app = chainshare_server::routes::router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            url: format!("http://{addr}"),
            addr,
            contract,
        }
    }
}
