use sea_orm::{ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, QueryFilter, UpdateMany};
use uuid::Uuid;

use crate::database::{ResourceState, Versioned};

pub(crate) mod ci_test;
pub(crate) mod component;
pub(crate) mod feeder;
pub(crate) mod identity;
pub(crate) mod jobdefinition;
pub(crate) mod permission;
pub(crate) mod query;
pub(crate) mod role;
pub(crate) mod team;

/// Writes `changes` only while the row still carries `expected_etag` and is not archived.
///
/// Returns whether a row was written; `false` means the caller lost the race.
pub(crate) async fn update_if_match<E>(
    transaction: &DatabaseTransaction,
    changes: E::ActiveModel,
    id: Uuid,
    expected_etag: &str,
) -> Result<bool, DbErr>
where
    E: Versioned,
{
    let result = conditional_update::<E>(changes, id, expected_etag).exec(transaction).await?;

    Ok(result.rows_affected > 0)
}

fn conditional_update<E>(changes: E::ActiveModel, id: Uuid, expected_etag: &str) -> UpdateMany<E>
where
    E: Versioned,
{
    E::update_many()
        .set(changes)
        .filter(E::id_column().eq(id))
        .filter(E::etag_column().eq(expected_etag))
        .filter(E::state_column().ne(ResourceState::Archived))
}

pub(crate) async fn purge_archived<E>(transaction: &DatabaseTransaction) -> Result<u64, DbErr>
where
    E: Versioned,
{
    let result = E::delete_many().filter(E::state_column().eq(ResourceState::Archived)).exec(transaction).await?;

    Ok(result.rows_affected)
}

#[cfg(test)]
mod test {
    use sea_orm::{DatabaseBackend, QueryTrait, Set};
    use uuid::Uuid;

    use super::conditional_update;
    use crate::database::{feeder, role, ResourceState};

    #[test]
    fn when_building_conditional_update_then_id_etag_and_live_state_are_required() {
        let id = Uuid::new_v4();
        let changes = feeder::ActiveModel { name: Set("weekly".to_owned()), ..Default::default() };

        let sql = conditional_update::<feeder::Entity>(changes, id, "0c6b9e2a").build(DatabaseBackend::Postgres).to_string();

        let (assignments, condition) = sql.split_once(" WHERE ").expect("update should carry a where clause");
        assert!(assignments.starts_with(r#"UPDATE "feeders" SET "name" = 'weekly'"#), "{sql}");
        assert!(condition.contains(&format!(r#""feeders"."id" = '{id}'"#)), "{sql}");
        assert!(condition.contains(r#""feeders"."etag" = '0c6b9e2a'"#), "{sql}");
        assert!(condition.contains(r#""feeders"."state" <> 'archived'"#), "{sql}");
    }

    #[test]
    fn when_archiving_role_then_update_still_requires_live_state() {
        let changes = role::ActiveModel { state: Set(ResourceState::Archived), ..Default::default() };

        let sql = conditional_update::<role::Entity>(changes, Uuid::new_v4(), "9a1f").build(DatabaseBackend::Postgres).to_string();

        assert!(sql.contains(r#"SET "state" = 'archived'"#), "{sql}");
        assert!(sql.contains(r#""roles"."etag" = '9a1f'"#), "{sql}");
        assert!(sql.contains(r#""roles"."state" <> 'archived'"#), "{sql}");
    }
}
