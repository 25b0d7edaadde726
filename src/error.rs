// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Postback response contract.
//!
//! Offer networks parse the literal response body to decide whether to retry
//! a delivery, so the exact strings here are part of the external interface
//! and must not change.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Terminal rejection of a postback. Nothing was applied to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostbackRejection {
    /// Required user id or external transaction id is absent.
    MissingUserOrTx,
    /// Amount missing, unparseable, negative, or below the configured minimum.
    InvalidAmount,
    /// Status/event value outside the provider's closed vocabulary.
    InvalidStatus,
    /// Shared-secret parameter did not match.
    InvalidSecret,
    /// Source address not in the provider's allowlist.
    ForbiddenIp,
    /// Recomputed hash did not match the provider-supplied one.
    InvalidHash,
    /// No ledger account exists for the reported user.
    UserNotFound,
    /// Store failure; the transaction was rolled back and the network is
    /// expected to retry.
    ServerError,
}

impl PostbackRejection {
    pub fn status(self) -> StatusCode {
        match self {
            Self::MissingUserOrTx | Self::InvalidAmount | Self::InvalidStatus => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidSecret | Self::ForbiddenIp | Self::InvalidHash => StatusCode::FORBIDDEN,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            Self::MissingUserOrTx => "MISSING_USER_OR_TX",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidSecret => "INVALID_SECRET",
            Self::ForbiddenIp => "FORBIDDEN_IP",
            Self::InvalidHash => "INVALID_HASH",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::ServerError => "SERVER_ERROR",
        }
    }
}

impl IntoResponse for PostbackRejection {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}

/// Successful acknowledgement of a postback (HTTP 200 in every case).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostbackAck {
    /// Credit applied to the user's balance.
    Applied,
    /// Reversal applied (balance debited, floored at zero).
    Reversed,
    /// Duplicate delivery of an already-processed transaction; no-op.
    AlreadyHandled,
    /// Lifecycle event the platform does not act on; acknowledged to stop
    /// the network from retrying.
    IgnoredEvent,
}

impl PostbackAck {
    pub fn body(self) -> &'static str {
        match self {
            Self::Applied => "OK",
            Self::Reversed => "REVERSED",
            Self::AlreadyHandled => "ALREADY_HANDLED",
            Self::IgnoredEvent => "IGNORED_EVENT",
        }
    }
}

impl IntoResponse for PostbackAck {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn rejection_status_codes_follow_the_contract() {
        assert_eq!(
            PostbackRejection::MissingUserOrTx.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PostbackRejection::InvalidAmount.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PostbackRejection::InvalidHash.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            PostbackRejection::UserNotFound.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            PostbackRejection::ServerError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn rejection_body_is_plain_text() {
        let response = PostbackRejection::InvalidSecret.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body_bytes[..], b"INVALID_SECRET");
    }

    #[tokio::test]
    async fn ack_is_always_200() {
        for ack in [
            PostbackAck::Applied,
            PostbackAck::Reversed,
            PostbackAck::AlreadyHandled,
            PostbackAck::IgnoredEvent,
        ] {
            let response = ack.into_response();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn ack_bodies_match_network_dashboards() {
        let response = PostbackAck::Reversed.into_response();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body_bytes[..], b"REVERSED");
    }
}
