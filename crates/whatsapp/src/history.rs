//! Message and chat-summary persistence shared by inbound and outbound paths.

use {
    tracing::{debug, warn},
    voxrelay_store::{ChatSummary, MessageRecord, Store},
};

use crate::session::MessagingSession;

/// Upsert `record` and refresh its chat summary. Failures are logged only.
///
/// `push_name` is the name the sender announced; it names a direct chat
/// when the session has no contact name for it.
pub(crate) async fn record_message(
    store: &dyn Store,
    session: &dyn MessagingSession,
    record: &MessageRecord,
    push_name: Option<&str>,
) {
    match store.upsert_message(record).await {
        Ok(()) => debug!(message_id = %record.id, kind = %record.kind, "message stored"),
        Err(e) => warn!(message_id = %record.id, error = %e, "failed to store message"),
    }

    // Groups are named by their JID.
    let name = if record.chat.is_group() {
        None
    } else {
        let announced = push_name
            .filter(|n| !record.is_from_me && !n.trim().is_empty())
            .map(|n| n.trim().to_string());
        session.contact_name(&record.chat).await.or(announced)
    };
    let summary = ChatSummary::for_message(&record.chat, name, record);
    if let Err(e) = store.upsert_chat(&summary).await {
        warn!(chat = %record.chat, error = %e, "failed to update chat summary");
    }
}
