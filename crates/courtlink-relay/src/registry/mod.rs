//! Connection-level registries: devices, client channels, subscriptions.

mod clients;
mod devices;
mod subscriptions;

pub use clients::ClientHub;
pub use devices::DeviceRegistry;
pub use subscriptions::SubscriptionMap;
