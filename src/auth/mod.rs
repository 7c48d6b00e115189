pub mod middleware;

pub use middleware::{GatewayKeyMiddleware, DIRECT_ACCESS_MESSAGE, GATEWAY_KEY_HEADER};
