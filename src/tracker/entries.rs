use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    error::TrackerError,
    store::entities::{EntryId, TimeEntry},
};

use super::TrackerContext;

/// Entries started in `[from, to]`, most recent first.
pub async fn entries_between(
    context: &TrackerContext,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<TimeEntry>, TrackerError> {
    let user = context.require_user()?;
    Ok(context.store.entries_between(user, from, to).await?)
}

/// Deleting the running entry stops it for every session following the store.
pub async fn delete_entry(context: &TrackerContext, id: &EntryId) -> Result<(), TrackerError> {
    let user = context.require_user()?;
    context.store.delete_entry(user, id).await?;
    info!("Deleted entry {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use chrono::{Duration, TimeZone, Utc};

    use crate::{
        store::{
            entities::{NewTimeEntry, UserId},
            memory::MemoryStore,
            DocumentStore,
        },
        tracker::TrackerContext,
    };

    use super::{delete_entry, entries_between};

    #[tokio::test]
    async fn test_range_and_delete() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let user = UserId::from("u1");
        let base = Utc.with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap();
        let mut ids = vec![];
        for hours in [0, 2, 30] {
            let id = store
                .create_entry(
                    &user,
                    NewTimeEntry {
                        description: format!("task {hours}"),
                        start_time: base + Duration::hours(hours),
                        project_id: None,
                        project: None,
                        is_billable: false,
                        user_id: user.clone(),
                    },
                )
                .await?;
            ids.push(id);
        }
        let context = TrackerContext::new(Some(user), store);

        let day = entries_between(&context, base, base + Duration::hours(24)).await?;
        assert_eq!(
            day.iter().map(|e| e.id.clone()).collect::<Vec<_>>(),
            vec![ids[1].clone(), ids[0].clone()]
        );

        delete_entry(&context, &ids[1]).await?;
        let day = entries_between(&context, base, base + Duration::hours(24)).await?;
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].id, ids[0]);
        Ok(())
    }
}
