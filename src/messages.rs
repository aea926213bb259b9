//! Messages exchanged between the page, the background worker and the
//! frontend, tagged by their `action` field.

use serde::{Deserialize, Serialize};

use crate::types::{Action, AutofillMode, Field, Status};

/// Body of an autofill request to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillRequest {
    pub mode: AutofillMode,
    pub user_id: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ExtensionMessage {
    /// Page asks the worker to start a backend stream
    GetAutofillData(AutofillRequest),
    /// Worker hands one parsed action to the page
    PerformAutofill { data: Action },
    /// Ask the page for the user id the frontend exposes
    CheckForEasyApplyId,
    StartAuthentication,
    AuthenticationComplete {
        #[serde(rename = "easyApplyId")]
        easy_apply_id: String,
    },
    AuthenticationFailed { error: String },
}

/// Generic acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    pub status: Status,
    pub message: String,
}

impl StatusReply {
    pub fn success(message: impl Into<String>) -> Self {
        StatusReply {
            status: Status::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StatusReply {
            status: Status::Error,
            message: message.into(),
        }
    }
}

/// Answer to a message handled in the page context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Status(StatusReply),
    EasyApplyId {
        #[serde(rename = "easyApplyId")]
        easy_apply_id: Option<String>,
    },
}
