//! Payload → in-app destination mapping.

use crate::push::payload::{NotificationKind, NotificationPayload};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TICKET_DETAIL_PATH: &str = "/support/[id]";
pub const QUOTE_DETAIL_PATH: &str = "/quotes/[id]";
pub const QUOTE_LIST_PATH: &str = "/quotes";

/// Where a notification should land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub path: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl RouteTarget {
    fn bare(path: &str) -> Self {
        Self {
            path: path.to_string(),
            params: BTreeMap::new(),
        }
    }

    fn with_id(path: &str, id: String) -> Self {
        let mut params = BTreeMap::new();
        params.insert("id".to_string(), id);
        Self {
            path: path.to_string(),
            params,
        }
    }

    pub fn ticket_detail(ticket_id: impl Into<String>) -> Self {
        Self::with_id(TICKET_DETAIL_PATH, ticket_id.into())
    }

    pub fn quote_detail(quote_id: impl Into<String>) -> Self {
        Self::with_id(QUOTE_DETAIL_PATH, quote_id.into())
    }

    /// The default landing surface.
    pub fn quote_list() -> Self {
        Self::bare(QUOTE_LIST_PATH)
    }
}

/// Resolves a payload to its destination. Pure and total: anything not
/// recognised lands on the quote list.
pub fn resolve_route(payload: &NotificationPayload) -> RouteTarget {
    match payload.kind() {
        NotificationKind::SupportMessage => match payload.ticket_id() {
            Some(id) => RouteTarget::ticket_detail(id),
            None => RouteTarget::quote_list(),
        },
        NotificationKind::QuoteCreated => match payload.quote_id() {
            Some(id) => RouteTarget::quote_detail(id),
            None => RouteTarget::quote_list(),
        },
        NotificationKind::Other(_) | NotificationKind::Missing => RouteTarget::quote_list(),
    }
}
