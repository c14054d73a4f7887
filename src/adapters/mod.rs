// Adapters layer: concrete implementations for external systems (ledger WebSocket API, faucet HTTP API)
// plus the local transaction signer.

pub mod codec;
pub mod faucet;
pub mod keypair;
pub mod websocket;

pub use faucet::FaucetClient;
pub use websocket::{WsClientFactory, WsLedgerClient};
