//! Partition key derivation from a storage context

use super::models::{PartitionKind, ReadDescriptor, StorageContext};

/// Derives storage keys for the partitions a context makes eligible.
///
/// - `UserData` → `userId`, when `persist_user_data` is set
/// - `PrivateConversationData` → `userId:conversationId`, whenever both ids are present
/// - `ConversationData` → `conversationId`, when `persist_conversation_data` is set
///
/// Keys are not namespaced by partition. On a single-keyspace backend a user
/// id equal to a conversation id makes `UserData` and `ConversationData` share
/// one record, and each save overwrites the other.
pub struct ContextKeyDeriver;

impl ContextKeyDeriver {
    /// Storage key of a partition, or `None` when an id it depends on is missing
    pub fn key_for(context: &StorageContext, kind: PartitionKind) -> Option<String> {
        match kind {
            PartitionKind::UserData => context.user().map(str::to_string),
            PartitionKind::PrivateConversationData => {
                let user = context.user()?;
                let conversation = context.conversation()?;
                Some(format!("{}:{}", user, conversation))
            }
            PartitionKind::ConversationData => context.conversation().map(str::to_string),
        }
    }

    /// Whether the context asks for this partition to be persisted
    fn is_persisted(context: &StorageContext, kind: PartitionKind) -> bool {
        match kind {
            PartitionKind::UserData => context.persist_user_data,
            PartitionKind::PrivateConversationData => true,
            PartitionKind::ConversationData => context.persist_conversation_data,
        }
    }

    /// Eligible partitions paired with their keys, in stable order
    pub fn eligible(context: &StorageContext) -> Vec<(PartitionKind, String)> {
        PartitionKind::ALL
            .into_iter()
            .filter(|kind| Self::is_persisted(context, *kind))
            .filter_map(|kind| Self::key_for(context, kind).map(|key| (kind, key)))
            .collect()
    }

    /// One read per eligible partition
    pub fn derive_reads(context: &StorageContext) -> Vec<ReadDescriptor> {
        Self::eligible(context)
            .into_iter()
            .map(|(partition_kind, key)| ReadDescriptor { key, partition_kind })
            .collect()
    }

    /// Partitions a save may write, before hash comparison
    pub fn derive_writes(context: &StorageContext) -> Vec<PartitionKind> {
        Self::eligible(context)
            .into_iter()
            .map(|(kind, _)| kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_context() -> StorageContext {
        StorageContext::new()
            .with_user("default-user")
            .with_conversation("123456789")
            .persist_user_data(true)
            .persist_conversation_data(true)
    }

    #[test]
    fn test_derive_reads_all_partitions() {
        let reads = ContextKeyDeriver::derive_reads(&full_context());
        assert_eq!(
            reads,
            vec![
                ReadDescriptor {
                    key: "default-user".to_string(),
                    partition_kind: PartitionKind::UserData,
                },
                ReadDescriptor {
                    key: "default-user:123456789".to_string(),
                    partition_kind: PartitionKind::PrivateConversationData,
                },
                ReadDescriptor {
                    key: "123456789".to_string(),
                    partition_kind: PartitionKind::ConversationData,
                },
            ]
        );
    }

    #[test]
    fn test_no_flags_no_conversation_is_empty() {
        let context = StorageContext::new().with_user("default-user");
        assert!(ContextKeyDeriver::derive_reads(&context).is_empty());
        assert!(ContextKeyDeriver::derive_writes(&context).is_empty());
    }

    #[test]
    fn test_private_data_needs_both_ids() {
        let context = StorageContext::new().with_conversation("123456789");
        assert!(ContextKeyDeriver::derive_writes(&context).is_empty());

        let context = context.with_user("default-user");
        assert_eq!(
            ContextKeyDeriver::derive_writes(&context),
            vec![PartitionKind::PrivateConversationData]
        );
    }

    #[test]
    fn test_flags_gate_user_and_conversation_data() {
        let context = full_context().persist_user_data(false);
        assert_eq!(
            ContextKeyDeriver::derive_writes(&context),
            vec![
                PartitionKind::PrivateConversationData,
                PartitionKind::ConversationData
            ]
        );

        let context = StorageContext::new()
            .with_user("default-user")
            .persist_user_data(true)
            .persist_conversation_data(true);
        assert_eq!(
            ContextKeyDeriver::derive_writes(&context),
            vec![PartitionKind::UserData]
        );
    }

    #[test]
    fn test_equal_ids_share_a_key() {
        let context = StorageContext::new()
            .with_user("42")
            .with_conversation("42")
            .persist_user_data(true)
            .persist_conversation_data(true);
        assert_eq!(
            ContextKeyDeriver::key_for(&context, PartitionKind::UserData),
            ContextKeyDeriver::key_for(&context, PartitionKind::ConversationData)
        );
    }

    #[test]
    fn test_empty_user_id_is_missing() {
        let context = full_context().with_user("");
        assert_eq!(
            ContextKeyDeriver::derive_writes(&context),
            vec![PartitionKind::ConversationData]
        );
        assert_eq!(
            ContextKeyDeriver::key_for(&context, PartitionKind::UserData),
            None
        );
    }
}
