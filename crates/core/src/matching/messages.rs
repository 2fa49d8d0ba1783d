//! Display messages for matching outcomes.
//!
//! Every operation maps to one success template and one failure template.
//! Templates carry a `{{user}}` placeholder for the counterpart's name.

use serde::Serialize;

/// Placeholder substituted with the counterpart's display name.
pub const USER_PLACEHOLDER: &str = "{{user}}";

/// Every operation exposed by the request and lock managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOperation {
    CreateRequest,
    WithdrawRequest,
    AcceptRequest,
    DeclineRequest,
    WithdrawLock,
    RequestConfirmLocked,
    ConfirmSuccess,
    DeclineSuccess,
    RequestRejectLocked,
    ConfirmReject,
    CancelReject,
}

impl MatchOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateRequest => "create_request",
            Self::WithdrawRequest => "withdraw_request",
            Self::AcceptRequest => "accept_request",
            Self::DeclineRequest => "decline_request",
            Self::WithdrawLock => "withdraw_lock",
            Self::RequestConfirmLocked => "request_confirm_locked",
            Self::ConfirmSuccess => "confirm_success",
            Self::DeclineSuccess => "decline_success",
            Self::RequestRejectLocked => "request_reject_locked",
            Self::ConfirmReject => "confirm_reject",
            Self::CancelReject => "cancel_reject",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTemplate {
    RequestSent,
    RequestAccepted,
    RequestDeclined,
    RequestWithdrawn,
    RequestFailed,
    LockWithdrawn,
    LockWithdrawFailed,
    SuccessRequestSent,
    SuccessRequestAccepted,
    SuccessRequestDeclined,
    SuccessRequestFailedToSave,
    RejectRequestSent,
    RejectConfirmed,
    RejectCancelled,
    RejectRequestFailedToSave,
}

impl MessageTemplate {
    pub fn text(self) -> &'static str {
        match self {
            Self::RequestSent => "Your request has been sent to {{user}}.",
            Self::RequestAccepted => "You accepted the request from {{user}}. You are now locked.",
            Self::RequestDeclined => "You declined the request from {{user}}.",
            Self::RequestWithdrawn => "Your request to {{user}} has been withdrawn.",
            Self::RequestFailed => "Your request involving {{user}} could not be completed.",
            Self::LockWithdrawn => "You have withdrawn from your lock with {{user}}.",
            Self::LockWithdrawFailed => "Your lock with {{user}} could not be withdrawn.",
            Self::SuccessRequestSent => {
                "{{user}} has been asked to confirm your marriage."
            }
            Self::SuccessRequestAccepted => "Congratulations! You and {{user}} are now married.",
            Self::SuccessRequestDeclined => {
                "You did not confirm the marriage claimed by {{user}}. You remain locked."
            }
            Self::SuccessRequestFailedToSave => {
                "Your marriage update with {{user}} could not be saved."
            }
            Self::RejectRequestSent => "{{user}} has been asked to confirm ending your lock.",
            Self::RejectConfirmed => "Your lock with {{user}} has ended. You are available again.",
            Self::RejectCancelled => "You cancelled your request to end your lock with {{user}}.",
            Self::RejectRequestFailedToSave => {
                "Your request to end your lock with {{user}} could not be saved."
            }
        }
    }

    /// Substitute the counterpart's name into the template.
    pub fn render(self, name: &str) -> String {
        self.text().replace(USER_PLACEHOLDER, name)
    }
}

/// Pick the template for an operation's outcome.
pub fn template_for(operation: MatchOperation, succeeded: bool) -> MessageTemplate {
    use MatchOperation as Op;
    use MessageTemplate as T;

    match (operation, succeeded) {
        (Op::CreateRequest, true) => T::RequestSent,
        (Op::WithdrawRequest, true) => T::RequestWithdrawn,
        (Op::AcceptRequest, true) => T::RequestAccepted,
        (Op::DeclineRequest, true) => T::RequestDeclined,
        (Op::CreateRequest | Op::WithdrawRequest | Op::AcceptRequest | Op::DeclineRequest, false) => {
            T::RequestFailed
        }

        (Op::WithdrawLock, true) => T::LockWithdrawn,
        (Op::WithdrawLock, false) => T::LockWithdrawFailed,

        (Op::RequestConfirmLocked, true) => T::SuccessRequestSent,
        (Op::ConfirmSuccess, true) => T::SuccessRequestAccepted,
        (Op::DeclineSuccess, true) => T::SuccessRequestDeclined,
        (Op::RequestConfirmLocked | Op::ConfirmSuccess | Op::DeclineSuccess, false) => {
            T::SuccessRequestFailedToSave
        }

        (Op::RequestRejectLocked, true) => T::RejectRequestSent,
        (Op::ConfirmReject, true) => T::RejectConfirmed,
        (Op::CancelReject, true) => T::RejectCancelled,
        (Op::RequestRejectLocked | Op::ConfirmReject | Op::CancelReject, false) => {
            T::RejectRequestFailedToSave
        }
    }
}
