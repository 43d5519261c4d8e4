use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tally_common::{gen_etag, label_from_name, normalize_etag, validate_label, validate_name};
use tracing::info;
use uuid::Uuid;

use crate::database::{constraint_violation, permission, ConstraintViolation, Persistable, ResourceState};

use super::{
    query::{ListQuery, Page, QueryError},
    update_if_match,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Permission {
    pub id: Uuid,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub state: ResourceState,
    pub etag: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    expected_etag: String,
    archived: bool,
    updated_name: Option<String>,
    updated_description: Option<Option<String>>,
}

impl Permission {
    pub fn guard(&mut self, if_match: &str) {
        self.expected_etag = normalize_etag(if_match).to_owned();
    }

    pub fn is_archived(&self) -> bool {
        self.state == ResourceState::Archived
    }

    pub fn archive(&mut self) {
        self.archived = true
    }

    pub fn update_name(&mut self, new_name: String) -> Result<()> {
        if !validate_name(&new_name) {
            return Err(Error::InvalidName);
        }
        if self.name != new_name {
            self.updated_name = Some(new_name);
        }
        Ok(())
    }

    pub fn update_description(&mut self, new_description: Option<String>) {
        if self.description != new_description {
            self.updated_description = Some(new_description);
        }
    }
}

#[async_trait]
impl Persistable for Permission {
    type Error = Error;

    async fn persist(self, transaction: &DatabaseTransaction) -> Result<String> {
        let now = Utc::now();
        let (changes, etag) = if self.archived {
            let changes = permission::ActiveModel {
                state: Set(ResourceState::Archived),
                updated_at: Set(now),
                ..Default::default()
            };
            (changes, self.expected_etag.clone())
        } else {
            let etag = gen_etag();
            let changes = permission::ActiveModel {
                name: self.updated_name.map(Set).unwrap_or_default(),
                description: self.updated_description.map(Set).unwrap_or_default(),
                etag: Set(etag.clone()),
                updated_at: Set(now),
                ..Default::default()
            };
            (changes, etag)
        };

        if !update_if_match::<permission::Entity>(transaction, changes, self.id, &self.expected_etag).await? {
            return Err(Error::Conflict);
        }
        if self.archived {
            info!("permission(id: {}, label: {}) archived.", self.id, self.label);
        }

        Ok(etag)
    }
}

pub(crate) struct NewPermission {
    pub name: String,
    pub label: Option<String>,
    pub description: Option<String>,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait PermissionService {
    async fn get_all(&self, transaction: &DatabaseTransaction, query: &ListQuery) -> Result<Page<Permission>>;
    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Option<Permission>>;
    async fn create(&self, transaction: &DatabaseTransaction, new_permission: NewPermission) -> Result<Permission>;
}

pub(crate) struct PostgresPermissionService;

#[async_trait]
impl PermissionService for PostgresPermissionService {
    async fn get_all(&self, transaction: &DatabaseTransaction, query: &ListQuery) -> Result<Page<Permission>> {
        use permission::{Column, Entity};

        let select = query.apply(Entity::find(), &[])?.filter(Column::State.ne(ResourceState::Archived));
        let count = select.clone().count(transaction).await?;
        let models = query.paginate(select).all(transaction).await?;

        Ok(Page { items: models.into_iter().map(Permission::from).collect(), count })
    }

    async fn get(&self, transaction: &DatabaseTransaction, id: &Uuid) -> Result<Option<Permission>> {
        Ok(permission::Entity::find_by_id(*id).one(transaction).await?.map(Permission::from))
    }

    async fn create(&self, transaction: &DatabaseTransaction, new_permission: NewPermission) -> Result<Permission> {
        if !validate_name(&new_permission.name) {
            return Err(Error::InvalidName);
        }
        let label = new_permission.label.unwrap_or_else(|| label_from_name(&new_permission.name));
        if !validate_label(&label) {
            return Err(Error::InvalidLabel);
        }

        let now = Utc::now();
        let model = permission::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_permission.name),
            label: Set(label),
            description: Set(new_permission.description),
            state: Set(ResourceState::Active),
            etag: Set(gen_etag()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(transaction)
        .await?;

        info!("permission(id: {}, label: {}) created.", model.id, model.label);

        Ok(model.into())
    }
}

impl From<permission::Model> for Permission {
    fn from(value: permission::Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            label: value.label,
            description: value.description,
            state: value.state,
            expected_etag: value.etag.clone(),
            etag: value.etag,
            created_at: value.created_at,
            updated_at: value.updated_at,
            archived: false,
            updated_name: None,
            updated_description: None,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error("invalid permission name")]
    InvalidName,
    #[error("permission label must consist of upper-case letters, digits and underscores")]
    InvalidLabel,
    #[error("permission was modified concurrently or is archived")]
    Conflict,
    #[error("permission label already exists")]
    NameConflicted,
    #[error(transparent)]
    InvalidQuery(#[from] QueryError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        match constraint_violation(&value) {
            Some(ConstraintViolation::Unique) => Self::NameConflicted,
            _ => Self::Anyhow(value.into()),
        }
    }
}

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, TransactionTrait};
    use uuid::Uuid;

    use super::{Error, Permission};
    use crate::database::{permission::Model, Persistable, ResourceState};

    fn permission_model() -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            name: "Upload Jobs".to_owned(),
            label: "UPLOAD_JOBS".to_owned(),
            description: None,
            state: ResourceState::Active,
            etag: "7be0".to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn when_archiving_with_matching_etag_then_permission_keeps_its_etag() {
        let mock_connection = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 1 }])
                .into_connection(),
        );
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");
        let mut permission = Permission::from(permission_model());
        permission.guard("7be0");
        permission.archive();

        let result = permission.persist(&transaction).await;

        assert_eq!(result.expect("archiving permission should be successful"), "7be0");
    }

    #[tokio::test]
    async fn when_permission_is_already_archived_then_persist_returns_conflict_err() {
        let mock_connection = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult { last_insert_id: 0, rows_affected: 0 }])
                .into_connection(),
        );
        let transaction = mock_connection.begin().await.expect("begining transaction should be successful");
        let mut permission = Permission::from(permission_model());
        permission.guard("7be0");
        permission.update_name("Upload Results".to_owned()).expect("updating name should be successful");

        assert!(matches!(permission.persist(&transaction).await, Err(Error::Conflict)));
    }
}
