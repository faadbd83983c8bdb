// nftui-api: Async Rust client for the nft-ui quota and port-forwarding service

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{BasicAuth, NftClient};
pub use error::Error;
pub use models::{
    AddForwardingRequest, AllowedPort, ApiResponse, EditForwardingRequest, ForwardingResponse,
    ForwardingRule, QuotaRule, QuotasResponse,
};
pub use transport::{TlsMode, TransportConfig};
