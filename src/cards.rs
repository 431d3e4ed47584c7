//! Adaptive Card builders.
//!
//! Two static cards: the input form shown on any text command, and the
//! success notice the form is replaced with after a delivered
//! submission. The field ids (`title`, `description`) and the cancel
//! payload (`{"action":"cancel"}`) are the wire contract the submit
//! round trip depends on.

use crate::schema::Attachment;

/// Content type for Adaptive Card attachments.
pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";

const CARD_SCHEMA: &str = "http://adaptivecards.io/schemas/adaptive-card.json";
const CARD_VERSION: &str = "1.4";

/// The input form: title + description text inputs with Submit and
/// Cancel actions.
pub fn input_card() -> Attachment {
    let card = serde_json::json!({
        "type": "AdaptiveCard",
        "$schema": CARD_SCHEMA,
        "version": CARD_VERSION,
        "body": [
            {
                "type": "TextBlock",
                "text": "Create New Item",
                "weight": "Bolder",
                "size": "Medium"
            },
            {
                "type": "TextBlock",
                "text": "Title:",
                "wrap": true
            },
            {
                "type": "Input.Text",
                "id": "title",
                "placeholder": "Enter title"
            },
            {
                "type": "TextBlock",
                "text": "Description:",
                "wrap": true
            },
            {
                "type": "Input.Text",
                "id": "description",
                "placeholder": "Enter description",
                "isMultiline": true
            }
        ],
        "actions": [
            {
                "type": "Action.Submit",
                "title": "Submit"
            },
            {
                "type": "Action.Submit",
                "title": "Cancel",
                "data": {"action": "cancel"}
            }
        ]
    });

    Attachment {
        content_type: ADAPTIVE_CARD_CONTENT_TYPE.to_string(),
        content: card,
    }
}

/// The success notice the form is replaced with.
pub fn success_card() -> Attachment {
    let card = serde_json::json!({
        "type": "AdaptiveCard",
        "$schema": CARD_SCHEMA,
        "version": CARD_VERSION,
        "body": [
            {
                "type": "TextBlock",
                "text": "✅ Success",
                "weight": "Bolder",
                "color": "Good",
                "size": "Medium"
            },
            {
                "type": "TextBlock",
                "text": "Your submission was successful!",
                "wrap": true
            }
        ]
    });

    Attachment {
        content_type: ADAPTIVE_CARD_CONTENT_TYPE.to_string(),
        content: card,
    }
}
