//! Logical API names and subscription-style methods understood by the node.
//!
//! The node groups its RPC methods into named APIs. Each connection asks for
//! a numeric identifier per API during the handshake; the reserved login API
//! always answers on [`META_API_ID`].

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Numeric identifier of the implicit login/meta API.
pub const META_API_ID: u32 = 1;

/// APIs a connection may request from the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiName {
    /// Chain state queries and the subscribe-style callbacks.
    Database,
    /// Transaction broadcast.
    NetworkBroadcast,
    /// Account history queries.
    History,
    /// Account registration.
    Registration,
    /// Asset queries.
    Asset,
    /// Peer and network node administration.
    NetworkNode,
    /// The implicit meta API used for the handshake and keepalive.
    Login,
}

impl ApiName {
    /// Every API the node may grant, including the implicit login API.
    pub const ALL: [Self; 7] = [
        Self::Database,
        Self::NetworkBroadcast,
        Self::History,
        Self::Registration,
        Self::Asset,
        Self::NetworkNode,
        Self::Login,
    ];

    /// Name used on the wire for this API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::NetworkBroadcast => "network_broadcast",
            Self::History => "history",
            Self::Registration => "registration",
            Self::Asset => "asset",
            Self::NetworkNode => "network_node",
            Self::Login => "login",
        }
    }

    /// Returns `true` for the implicit meta API, which needs no handshake.
    #[must_use]
    pub const fn is_meta(self) -> bool { matches!(self, Self::Login) }
}

impl fmt::Display for ApiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Returned when a string does not name a known API.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown api `{0}`")]
pub struct UnknownApi(pub String);

impl FromStr for ApiName {
    type Err = UnknownApi;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|api| api.as_str() == s)
            .ok_or_else(|| UnknownApi(s.to_owned()))
    }
}

/// Methods that take a notice handler as their first parameter.
///
/// Calling one of these through [`crate::ApiExecutor::subscribe`] registers
/// the handler and substitutes its subscriber id into the outgoing params.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionMethod {
    /// Object change notices for every object the caller has queried.
    SetSubscribeCallback,
    /// Notices for transactions entering the pending pool.
    SetPendingTransactionCallback,
    /// Notices for each applied block.
    SetBlockAppliedCallback,
    /// Order book updates for a market pair.
    SubscribeToMarket,
    /// Contract state changes.
    SubscribeContracts,
    /// Contract log entries.
    SubscribeContractLogs,
    /// Confirmation of a broadcast transaction.
    BroadcastTransactionWithCallback,
}

impl SubscriptionMethod {
    /// Wire method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SetSubscribeCallback => "set_subscribe_callback",
            Self::SetPendingTransactionCallback => "set_pending_transaction_callback",
            Self::SetBlockAppliedCallback => "set_block_applied_callback",
            Self::SubscribeToMarket => "subscribe_to_market",
            Self::SubscribeContracts => "subscribe_contracts",
            Self::SubscribeContractLogs => "subscribe_contract_logs",
            Self::BroadcastTransactionWithCallback => "broadcast_transaction_with_callback",
        }
    }

    /// API that serves this method.
    #[must_use]
    pub const fn api(self) -> ApiName {
        match self {
            Self::BroadcastTransactionWithCallback => ApiName::NetworkBroadcast,
            _ => ApiName::Database,
        }
    }
}

impl fmt::Display for SubscriptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("database", ApiName::Database)]
    #[case("network_broadcast", ApiName::NetworkBroadcast)]
    #[case("login", ApiName::Login)]
    fn parses_wire_names(#[case] name: &str, #[case] expected: ApiName) {
        assert_eq!(name.parse::<ApiName>(), Ok(expected));
        assert_eq!(expected.as_str(), name);
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(
            "crypto".parse::<ApiName>(),
            Err(UnknownApi("crypto".to_owned()))
        );
    }

    #[test]
    fn broadcast_callback_lives_on_network_broadcast() {
        assert_eq!(
            SubscriptionMethod::BroadcastTransactionWithCallback.api(),
            ApiName::NetworkBroadcast
        );
        assert_eq!(SubscriptionMethod::SubscribeToMarket.api(), ApiName::Database);
    }
}
