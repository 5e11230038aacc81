mod broker;
mod connection;
mod message;
mod session;

pub use broker::{Broker, BrokerComponents, ConnectionSnapshot, Stats};
pub use connection::VhostRuntime;
pub use message::{DeliveredMessage, Payload, PublishOutcome, PublishOverrides, SubscribeOverrides};
pub use session::Session;
