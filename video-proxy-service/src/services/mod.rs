pub mod metrics;
pub mod provider_response;
pub mod proxy;

pub use self::metrics::{get_metrics, init_metrics};
pub use provider_response::{ProviderResponse, ProxyResponse};
pub use proxy::GenerationProxy;
